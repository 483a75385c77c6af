//! OCPP-J message framing
//!
//! Every OCPP-J message is a heterogeneous JSON array:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! Parsing is strict: a frame with the wrong number of elements, a non-string
//! id or action, or a non-object result payload or error details is rejected
//! as a whole. A Call payload is kept as-is once its id and action are valid,
//! so the receiver can still answer the caller with a `FormationViolation`.

use serde_json::{Map, Value};
use thiserror::Error;

// ── Message-type constants ─────────────────────────────────────

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

// ── OcppFrame ──────────────────────────────────────────────────

/// A parsed OCPP-J frame.
#[derive(Debug, Clone, PartialEq)]
pub enum OcppFrame {
    /// `[2, uniqueId, action, payload]`
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    /// `[3, uniqueId, payload]`
    CallResult { unique_id: String, payload: Value },
    /// `[4, uniqueId, errorCode, errorDescription, errorDetails]`
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

impl OcppFrame {
    // ── Parsing ────────────────────────────────────────────

    /// Parse a raw JSON text into an `OcppFrame`.
    pub fn parse(text: &str) -> Result<Self, OcppFrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| OcppFrameError::InvalidJson(e.to_string()))?;
        let arr = match value {
            Value::Array(arr) => arr,
            _ => return Err(OcppFrameError::NotAnArray),
        };

        let msg_type = arr
            .first()
            .ok_or(OcppFrameError::EmptyArray)?
            .as_u64()
            .ok_or(OcppFrameError::InvalidMessageType)?;

        match msg_type {
            MSG_TYPE_CALL => Self::parse_call(arr),
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(arr),
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(arr),
            _ => Err(OcppFrameError::UnknownMessageType(msg_type)),
        }
    }

    fn parse_call(arr: Vec<Value>) -> Result<Self, OcppFrameError> {
        let [_, unique_id, action, payload] = exact::<4>(arr)?;
        Ok(Self::Call {
            unique_id: string_field(unique_id, "uniqueId must be a string")?,
            action: string_field(action, "action must be a string")?,
            payload,
        })
    }

    fn parse_call_result(arr: Vec<Value>) -> Result<Self, OcppFrameError> {
        let [_, unique_id, payload] = exact::<3>(arr)?;
        Ok(Self::CallResult {
            unique_id: string_field(unique_id, "uniqueId must be a string")?,
            payload: object_field(payload, "payload must be an object")?,
        })
    }

    fn parse_call_error(arr: Vec<Value>) -> Result<Self, OcppFrameError> {
        let [_, unique_id, error_code, error_description, error_details] = exact::<5>(arr)?;
        Ok(Self::CallError {
            unique_id: string_field(unique_id, "uniqueId must be a string")?,
            error_code: string_field(error_code, "errorCode must be a string")?,
            error_description: string_field(
                error_description,
                "errorDescription must be a string",
            )?,
            error_details: object_field(error_details, "errorDetails must be an object")?,
        })
    }

    // ── Serialization ──────────────────────────────────────

    /// Serialize this frame to its wire text.
    pub fn serialize(&self) -> String {
        let arr = match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => vec![
                Value::from(MSG_TYPE_CALL),
                Value::String(unique_id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ],

            Self::CallResult { unique_id, payload } => vec![
                Value::from(MSG_TYPE_CALL_RESULT),
                Value::String(unique_id.clone()),
                payload.clone(),
            ],

            Self::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => vec![
                Value::from(MSG_TYPE_CALL_ERROR),
                Value::String(unique_id.clone()),
                Value::String(error_code.clone()),
                Value::String(error_description.clone()),
                error_details.clone(),
            ],
        };

        Value::Array(arr).to_string()
    }

    // ── Helpers ────────────────────────────────────────────

    /// Get the unique message ID.
    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call { unique_id, .. }
            | Self::CallResult { unique_id, .. }
            | Self::CallError { unique_id, .. } => unique_id,
        }
    }

    /// Create a `CallError` response with empty details.
    pub fn error_response(
        unique_id: impl Into<String>,
        error_code: impl Into<String>,
        error_description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            unique_id: unique_id.into(),
            error_code: error_code.into(),
            error_description: error_description.into(),
            error_details: Value::Object(Map::new()),
        }
    }
}

fn exact<const N: usize>(arr: Vec<Value>) -> Result<[Value; N], OcppFrameError> {
    let got = arr.len();
    arr.try_into()
        .map_err(|_| OcppFrameError::WrongArity { expected: N, got })
}

fn string_field(value: Value, what: &'static str) -> Result<String, OcppFrameError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(OcppFrameError::FieldTypeMismatch(what)),
    }
}

fn object_field(value: Value, what: &'static str) -> Result<Value, OcppFrameError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(OcppFrameError::FieldTypeMismatch(what))
    }
}

// ── Errors ─────────────────────────────────────────────────────

/// Errors that can occur when parsing an OCPP-J frame.
#[derive(Debug, Error, PartialEq)]
pub enum OcppFrameError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("OCPP message is not a JSON array")]
    NotAnArray,
    #[error("Empty OCPP message array")]
    EmptyArray,
    #[error("Message type is not a number")]
    InvalidMessageType,
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),
    #[error("Expected {expected} fields, got {got}")]
    WrongArity { expected: usize, got: usize },
    #[error("Field type mismatch: {0}")]
    FieldTypeMismatch(&'static str),
}
