//! WebSocket interfaces
//!
//! - `ocpp_server`: OCPP-J WebSocket server feeding the connection registry
//! - `negotiator`: sub-protocol negotiation during the handshake

pub mod negotiator;
pub mod ocpp_server;

pub use negotiator::ProtocolNegotiator;
pub use ocpp_server::OcppServer;
