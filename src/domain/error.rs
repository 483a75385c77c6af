//! OCPP-J error codes and business handler failures

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// OCPP-J `CallError` error codes (OCPP 1.6-J §4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Requested action is not known by the receiver.
    NotImplemented,
    /// Requested action is recognised but not supported by the receiver.
    NotSupported,
    /// An internal error occurred and the receiver could not process the action.
    InternalError,
    /// Payload for the action is incomplete.
    ProtocolError,
    /// A security issue prevented the receiver from completing the action.
    SecurityError,
    /// Payload is syntactically incorrect or does not conform to the action's schema.
    FormationViolation,
    /// Payload is syntactically correct but at least one field contains an invalid value.
    PropertyConstraintViolation,
    /// Payload violates occurrence constraints (e.g. a required field is missing).
    OccurenceConstraintViolation,
    /// Payload violates data type constraints.
    TypeConstraintViolation,
    /// Any other error not covered by the previous ones.
    GenericError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::NotSupported => "NotSupported",
            Self::InternalError => "InternalError",
            Self::ProtocolError => "ProtocolError",
            Self::SecurityError => "SecurityError",
            Self::FormationViolation => "FormationViolation",
            Self::PropertyConstraintViolation => "PropertyConstraintViolation",
            // Spelling follows the OCPP-J specification.
            Self::OccurenceConstraintViolation => "OccurenceConstraintViolation",
            Self::TypeConstraintViolation => "TypeConstraintViolation",
            Self::GenericError => "GenericError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "NotImplemented" => Self::NotImplemented,
            "NotSupported" => Self::NotSupported,
            "InternalError" => Self::InternalError,
            "ProtocolError" => Self::ProtocolError,
            "SecurityError" => Self::SecurityError,
            "FormationViolation" => Self::FormationViolation,
            "PropertyConstraintViolation" => Self::PropertyConstraintViolation,
            "OccurenceConstraintViolation" => Self::OccurenceConstraintViolation,
            "TypeConstraintViolation" => Self::TypeConstraintViolation,
            "GenericError" => Self::GenericError,
            _ => return Err(()),
        })
    }
}

/// Failure reported by the business handler for an inbound call.
///
/// Translated verbatim into the outbound `CallError`:
/// `[4, id, code, description, details]`.
#[derive(Debug, Clone, Error)]
#[error("{code}: {description}")]
pub struct HandlerError {
    pub code: ErrorCode,
    pub description: String,
    pub details: Value,
}

impl HandlerError {
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            details: Value::Object(Map::new()),
        }
    }

    /// Attach `errorDetails`. Non-object values are wrapped as `{"detail": value}`.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = object_details(details);
        self
    }

    /// Code, description and details ready for a `CallError` frame.
    ///
    /// `details` is public, so it is normalised here as well.
    pub fn into_wire_parts(self) -> (ErrorCode, String, Value) {
        (self.code, self.description, object_details(self.details))
    }

    pub fn internal(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, description)
    }

    pub fn generic(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::GenericError, description)
    }

}

fn object_details(details: Value) -> Value {
    match details {
        Value::Object(_) => details,
        other => {
            let mut map = Map::new();
            map.insert("detail".to_string(), other);
            Value::Object(map)
        }
    }
}
