//! Protocol domain: action catalog, typed messages, error codes and the
//! business handler port.

pub mod error;
pub mod ocpp;
pub mod ports;

pub use error::{ErrorCode, HandlerError};
pub use ocpp::{
    ActionName, CentralSystemRequest, CentralSystemResponse, ChargePointRequest,
    ChargePointResponse, OcppCall, Partition,
};
pub use ports::{ChargePointHandler, InboundCallPort};
