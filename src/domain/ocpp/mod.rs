//! OCPP 1.6 action catalog and typed messages
//!
//! - `catalog`: action names, partitions and payload shape descriptors
//! - `charge_point`: charge point initiated requests and their responses
//! - `central_system`: central system initiated commands and their responses

pub mod catalog;
pub mod central_system;
pub mod charge_point;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use catalog::{lookup, partition_of, ActionName, CatalogError, Partition, ShapeDescriptor};
pub use central_system::{CentralSystemRequest, CentralSystemResponse};
pub use charge_point::{ChargePointRequest, ChargePointResponse};

/// An outbound request that can be correlated with its typed response.
///
/// The response payload of a `CallResult` carries no action name, so it is
/// interpreted using the action of the request it answers.
pub trait OcppCall: Send + 'static {
    type Response: Send + 'static;

    fn action(&self) -> ActionName;

    fn to_payload(&self) -> Result<Value, CatalogError>;

    fn decode_response(action: ActionName, payload: Value)
        -> Result<Self::Response, CatalogError>;
}

impl OcppCall for CentralSystemRequest {
    type Response = CentralSystemResponse;

    fn action(&self) -> ActionName {
        CentralSystemRequest::action(self)
    }

    fn to_payload(&self) -> Result<Value, CatalogError> {
        CentralSystemRequest::to_payload(self)
    }

    fn decode_response(
        action: ActionName,
        payload: Value,
    ) -> Result<Self::Response, CatalogError> {
        CentralSystemResponse::decode(action, payload)
    }
}

impl OcppCall for ChargePointRequest {
    type Response = ChargePointResponse;

    fn action(&self) -> ActionName {
        ChargePointRequest::action(self)
    }

    fn to_payload(&self) -> Result<Value, CatalogError> {
        ChargePointRequest::to_payload(self)
    }

    fn decode_response(
        action: ActionName,
        payload: Value,
    ) -> Result<Self::Response, CatalogError> {
        ChargePointResponse::decode(action, payload)
    }
}

fn decode_payload<T: DeserializeOwned>(action: ActionName, payload: Value) -> Result<T, CatalogError> {
    serde_json::from_value(payload).map_err(|source| CatalogError::Decode { action, source })
}

fn encode_payload<T: Serialize>(action: ActionName, payload: &T) -> Result<Value, CatalogError> {
    serde_json::to_value(payload).map_err(|source| CatalogError::Encode { action, source })
}
