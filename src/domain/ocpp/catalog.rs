//! OCPP 1.6 action catalog
//!
//! Immutable registry of every action name, partitioned by the side that
//! initiates it. Each action maps to a [`ShapeDescriptor`] listing the
//! required top-level fields of its request and response payloads.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::domain::error::ErrorCode;

// ── Partition ──────────────────────────────────────────────────

/// The side of the link that initiates an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Charge point → central system.
    ChargePointInitiated,
    /// Central system → charge point.
    CentralSystemInitiated,
}

// ── ActionName ─────────────────────────────────────────────────

/// Closed set of OCPP 1.6 action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionName {
    // Charge point initiated
    Authorize,
    BootNotification,
    DataTransfer,
    DiagnosticsStatusNotification,
    FirmwareStatusNotification,
    Heartbeat,
    MeterValues,
    StartTransaction,
    StatusNotification,
    StopTransaction,

    // Central system initiated
    CancelReservation,
    ChangeAvailability,
    ChangeConfiguration,
    ClearCache,
    ClearChargingProfile,
    GetCompositeSchedule,
    GetConfiguration,
    GetDiagnostics,
    GetLocalListVersion,
    RemoteStartTransaction,
    RemoteStopTransaction,
    ReserveNow,
    Reset,
    SendLocalList,
    SetChargingProfile,
    TriggerMessage,
    UnlockConnector,
    UpdateFirmware,
}

impl ActionName {
    /// Every action, charge-point partition first.
    pub const ALL: &'static [ActionName] = &[
        Self::Authorize,
        Self::BootNotification,
        Self::DataTransfer,
        Self::DiagnosticsStatusNotification,
        Self::FirmwareStatusNotification,
        Self::Heartbeat,
        Self::MeterValues,
        Self::StartTransaction,
        Self::StatusNotification,
        Self::StopTransaction,
        Self::CancelReservation,
        Self::ChangeAvailability,
        Self::ChangeConfiguration,
        Self::ClearCache,
        Self::ClearChargingProfile,
        Self::GetCompositeSchedule,
        Self::GetConfiguration,
        Self::GetDiagnostics,
        Self::GetLocalListVersion,
        Self::RemoteStartTransaction,
        Self::RemoteStopTransaction,
        Self::ReserveNow,
        Self::Reset,
        Self::SendLocalList,
        Self::SetChargingProfile,
        Self::TriggerMessage,
        Self::UnlockConnector,
        Self::UpdateFirmware,
    ];

    /// Wire name as it appears in a Call frame.
    pub fn as_str(&self) -> &'static str {
        self.shape().name
    }

    /// Shape descriptor of this action.
    pub fn shape(&self) -> &'static ShapeDescriptor {
        // SHAPES is laid out in the same order as the enum.
        &SHAPES[*self as usize]
    }

    pub fn partition(&self) -> Partition {
        self.shape().partition
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s)
            .map(|shape| shape.action)
            .ok_or_else(|| CatalogError::UnknownAction(s.to_string()))
    }
}

// ── ShapeDescriptor ────────────────────────────────────────────

/// Structural description of one action's request and response payloads.
#[derive(Debug)]
pub struct ShapeDescriptor {
    pub action: ActionName,
    pub name: &'static str,
    pub partition: Partition,
    /// Required top-level request fields.
    pub request_fields: &'static [&'static str],
    /// Required top-level response fields.
    pub response_fields: &'static [&'static str],
}

impl ShapeDescriptor {
    /// Check that a request payload is an object carrying every required field.
    pub fn check_request(&self, payload: &Value) -> Result<(), CatalogError> {
        self.check(payload, self.request_fields)
    }

    /// Check that a response payload is an object carrying every required field.
    pub fn check_response(&self, payload: &Value) -> Result<(), CatalogError> {
        self.check(payload, self.response_fields)
    }

    fn check(&self, payload: &Value, required: &[&'static str]) -> Result<(), CatalogError> {
        let obj = payload
            .as_object()
            .ok_or(CatalogError::NotAnObject(self.action))?;
        match required.iter().copied().find(|field| !obj.contains_key(*field)) {
            Some(field) => Err(CatalogError::MissingField {
                action: self.action,
                field,
            }),
            None => Ok(()),
        }
    }
}

const fn shape(
    action: ActionName,
    name: &'static str,
    partition: Partition,
    request_fields: &'static [&'static str],
    response_fields: &'static [&'static str],
) -> ShapeDescriptor {
    ShapeDescriptor {
        action,
        name,
        partition,
        request_fields,
        response_fields,
    }
}

use ActionName as A;
use Partition::{CentralSystemInitiated as CS, ChargePointInitiated as CP};

static SHAPES: [ShapeDescriptor; 28] = [
    shape(A::Authorize, "Authorize", CP, &["idTag"], &["idTagInfo"]),
    shape(
        A::BootNotification,
        "BootNotification",
        CP,
        &["chargePointVendor", "chargePointModel"],
        &["status", "currentTime", "interval"],
    ),
    shape(A::DataTransfer, "DataTransfer", CP, &["vendorId"], &["status"]),
    shape(
        A::DiagnosticsStatusNotification,
        "DiagnosticsStatusNotification",
        CP,
        &["status"],
        &[],
    ),
    shape(
        A::FirmwareStatusNotification,
        "FirmwareStatusNotification",
        CP,
        &["status"],
        &[],
    ),
    shape(A::Heartbeat, "Heartbeat", CP, &[], &["currentTime"]),
    shape(
        A::MeterValues,
        "MeterValues",
        CP,
        &["connectorId", "meterValue"],
        &[],
    ),
    shape(
        A::StartTransaction,
        "StartTransaction",
        CP,
        &["connectorId", "idTag", "meterStart", "timestamp"],
        &["idTagInfo", "transactionId"],
    ),
    shape(
        A::StatusNotification,
        "StatusNotification",
        CP,
        &["connectorId", "errorCode", "status"],
        &[],
    ),
    shape(
        A::StopTransaction,
        "StopTransaction",
        CP,
        &["meterStop", "timestamp", "transactionId"],
        &[],
    ),
    shape(
        A::CancelReservation,
        "CancelReservation",
        CS,
        &["reservationId"],
        &["status"],
    ),
    shape(
        A::ChangeAvailability,
        "ChangeAvailability",
        CS,
        &["connectorId", "type"],
        &["status"],
    ),
    shape(
        A::ChangeConfiguration,
        "ChangeConfiguration",
        CS,
        &["key", "value"],
        &["status"],
    ),
    shape(A::ClearCache, "ClearCache", CS, &[], &["status"]),
    shape(
        A::ClearChargingProfile,
        "ClearChargingProfile",
        CS,
        &[],
        &["status"],
    ),
    shape(
        A::GetCompositeSchedule,
        "GetCompositeSchedule",
        CS,
        &["connectorId", "duration"],
        &["status"],
    ),
    shape(A::GetConfiguration, "GetConfiguration", CS, &[], &[]),
    shape(A::GetDiagnostics, "GetDiagnostics", CS, &["location"], &[]),
    shape(
        A::GetLocalListVersion,
        "GetLocalListVersion",
        CS,
        &[],
        &["listVersion"],
    ),
    shape(
        A::RemoteStartTransaction,
        "RemoteStartTransaction",
        CS,
        &["idTag"],
        &["status"],
    ),
    shape(
        A::RemoteStopTransaction,
        "RemoteStopTransaction",
        CS,
        &["transactionId"],
        &["status"],
    ),
    shape(
        A::ReserveNow,
        "ReserveNow",
        CS,
        &["connectorId", "expiryDate", "idTag", "reservationId"],
        &["status"],
    ),
    shape(A::Reset, "Reset", CS, &["type"], &["status"]),
    shape(
        A::SendLocalList,
        "SendLocalList",
        CS,
        &["listVersion", "updateType"],
        &["status"],
    ),
    shape(
        A::SetChargingProfile,
        "SetChargingProfile",
        CS,
        &["connectorId", "csChargingProfiles"],
        &["status"],
    ),
    shape(
        A::TriggerMessage,
        "TriggerMessage",
        CS,
        &["requestedMessage"],
        &["status"],
    ),
    shape(
        A::UnlockConnector,
        "UnlockConnector",
        CS,
        &["connectorId"],
        &["status"],
    ),
    shape(
        A::UpdateFirmware,
        "UpdateFirmware",
        CS,
        &["location", "retrieveDate"],
        &[],
    ),
];

// ── Lookup ─────────────────────────────────────────────────────

/// Look up an action by its wire name. Names are case-sensitive.
pub fn lookup(name: &str) -> Option<&'static ShapeDescriptor> {
    SHAPES.iter().find(|shape| shape.name == name)
}

/// The side that initiates `action`.
pub fn partition_of(action: ActionName) -> Partition {
    action.partition()
}

// ── Errors ─────────────────────────────────────────────────────

/// Payload did not conform to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("{0} is not initiated by this side")]
    WrongPartition(ActionName),

    #[error("{0} payload must be a JSON object")]
    NotAnObject(ActionName),

    #[error("{action} payload is missing required field '{field}'")]
    MissingField {
        action: ActionName,
        field: &'static str,
    },

    #[error("{action} payload does not match its schema: {source}")]
    Decode {
        action: ActionName,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {action} payload: {source}")]
    Encode {
        action: ActionName,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    /// OCPP-J error code reported to the peer when an inbound call fails
    /// catalog validation.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownAction(_) => ErrorCode::NotImplemented,
            Self::WrongPartition(_) => ErrorCode::NotSupported,
            Self::NotAnObject(_) | Self::Decode { .. } => ErrorCode::FormationViolation,
            Self::MissingField { .. } => ErrorCode::OccurenceConstraintViolation,
            Self::Encode { .. } => ErrorCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shapes_follow_enum_order() {
        for (index, action) in ActionName::ALL.iter().enumerate() {
            assert_eq!(*action as usize, index);
            assert_eq!(SHAPES[index].action, *action);
        }
        assert_eq!(ActionName::ALL.len(), SHAPES.len());
    }

    #[test]
    fn lookup_by_wire_name() {
        let shape = lookup("BootNotification").unwrap();
        assert_eq!(shape.action, ActionName::BootNotification);
        assert_eq!(shape.partition, Partition::ChargePointInitiated);
        assert!(lookup("FooBar").is_none());
        assert!(lookup("heartbeat").is_none());
    }

    #[test]
    fn every_action_round_trips_through_its_name() {
        for action in ActionName::ALL {
            assert_eq!(action.as_str().parse::<ActionName>().unwrap(), *action);
        }
    }

    #[test]
    fn partitions_are_split_ten_and_eighteen() {
        let cp = ActionName::ALL
            .iter()
            .filter(|a| partition_of(**a) == Partition::ChargePointInitiated)
            .count();
        let cs = ActionName::ALL
            .iter()
            .filter(|a| partition_of(**a) == Partition::CentralSystemInitiated)
            .count();
        assert_eq!((cp, cs), (10, 18));
        assert_eq!(
            partition_of(ActionName::Reset),
            Partition::CentralSystemInitiated
        );
    }

    #[test]
    fn check_request_reports_missing_field() {
        let shape = ActionName::Authorize.shape();
        assert!(shape.check_request(&json!({"idTag": "ABC"})).is_ok());
        let err = shape.check_request(&json!({})).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MissingField {
                field: "idTag",
                ..
            }
        ));
        assert_eq!(err.error_code(), ErrorCode::OccurenceConstraintViolation);
    }

    #[test]
    fn check_response_rejects_non_object() {
        let err = ActionName::Heartbeat
            .shape()
            .check_response(&json!("now"))
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::FormationViolation);
    }

    #[test]
    fn unknown_name_parses_to_error() {
        let err = "FooBar".parse::<ActionName>().unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::NotImplemented);
    }
}
