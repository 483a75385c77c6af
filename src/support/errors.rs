use serde_json::Value;
use thiserror::Error;

use crate::domain::ocpp::{ActionName, CatalogError};

/// Failure of an outbound request (`send_request`).
#[derive(Debug, Error)]
pub enum RequestError {
    /// No reply arrived before the request's deadline.
    #[error("{action} request timed out")]
    Timeout { action: ActionName },

    /// The charge point answered with a `CallError`.
    #[error("CallError {code}: {description}")]
    CallError {
        code: String,
        description: String,
        details: Value,
    },

    /// The connection closed before a reply arrived, or was already closed.
    #[error("Connection to {0} is closed")]
    ConnectionClosed(String),

    /// No live connection is registered for the charge point.
    #[error("Charge point {0} is not connected")]
    ConnectionUnavailable(String),

    /// The request could not be encoded.
    #[error(transparent)]
    Encode(CatalogError),

    /// The `CallResult` payload did not match the request's response shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(CatalogError),
}

/// Reasons a freshly opened transport is refused by the registry.
#[derive(Debug, Error, PartialEq)]
pub enum AcceptError {
    #[error("No charge point identity in request path '{0}'")]
    MissingIdentity(String),

    #[error("Unsupported or missing subprotocol: {0:?}")]
    UnsupportedProtocol(Option<String>),
}

/// Failure to hand a message to the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport is closed")]
    Closed,
}
