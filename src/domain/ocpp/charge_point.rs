//! Charge point initiated messages
//!
//! Closed sum types over the ten OCPP 1.6 actions a charge point may send.
//! Payloads are the `rust_ocpp::v1_6` types.

use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::messages::diagnostics_status_notification::{
    DiagnosticsStatusNotificationRequest, DiagnosticsStatusNotificationResponse,
};
use rust_ocpp::v1_6::messages::firmware_status_notification::{
    FirmwareStatusNotificationRequest, FirmwareStatusNotificationResponse,
};
use rust_ocpp::v1_6::messages::heart_beat::{HeartbeatRequest, HeartbeatResponse};
use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use serde_json::Value;

use super::catalog::{ActionName, CatalogError, Partition};
use super::{decode_payload, encode_payload};

/// A request sent by a charge point.
#[derive(Debug, Clone)]
pub enum ChargePointRequest {
    Authorize(AuthorizeRequest),
    BootNotification(BootNotificationRequest),
    DataTransfer(DataTransferRequest),
    DiagnosticsStatusNotification(DiagnosticsStatusNotificationRequest),
    FirmwareStatusNotification(FirmwareStatusNotificationRequest),
    Heartbeat(HeartbeatRequest),
    MeterValues(MeterValuesRequest),
    StartTransaction(StartTransactionRequest),
    StatusNotification(StatusNotificationRequest),
    StopTransaction(StopTransactionRequest),
}

/// The central system's answer to a [`ChargePointRequest`].
#[derive(Debug, Clone)]
pub enum ChargePointResponse {
    Authorize(AuthorizeResponse),
    BootNotification(BootNotificationResponse),
    DataTransfer(DataTransferResponse),
    DiagnosticsStatusNotification(DiagnosticsStatusNotificationResponse),
    FirmwareStatusNotification(FirmwareStatusNotificationResponse),
    Heartbeat(HeartbeatResponse),
    MeterValues(MeterValuesResponse),
    StartTransaction(StartTransactionResponse),
    StatusNotification(StatusNotificationResponse),
    StopTransaction(StopTransactionResponse),
}

fn ensure_partition(action: ActionName) -> Result<(), CatalogError> {
    if action.partition() == Partition::ChargePointInitiated {
        Ok(())
    } else {
        Err(CatalogError::WrongPartition(action))
    }
}

impl ChargePointRequest {
    pub fn action(&self) -> ActionName {
        match self {
            Self::Authorize(_) => ActionName::Authorize,
            Self::BootNotification(_) => ActionName::BootNotification,
            Self::DataTransfer(_) => ActionName::DataTransfer,
            Self::DiagnosticsStatusNotification(_) => ActionName::DiagnosticsStatusNotification,
            Self::FirmwareStatusNotification(_) => ActionName::FirmwareStatusNotification,
            Self::Heartbeat(_) => ActionName::Heartbeat,
            Self::MeterValues(_) => ActionName::MeterValues,
            Self::StartTransaction(_) => ActionName::StartTransaction,
            Self::StatusNotification(_) => ActionName::StatusNotification,
            Self::StopTransaction(_) => ActionName::StopTransaction,
        }
    }

    /// Decode a Call payload for `action` after checking it against the catalog.
    pub fn decode(action: ActionName, payload: Value) -> Result<Self, CatalogError> {
        ensure_partition(action)?;
        action.shape().check_request(&payload)?;

        Ok(match action {
            ActionName::Authorize => Self::Authorize(decode_payload(action, payload)?),
            ActionName::BootNotification => {
                Self::BootNotification(decode_payload(action, payload)?)
            }
            ActionName::DataTransfer => Self::DataTransfer(decode_payload(action, payload)?),
            ActionName::DiagnosticsStatusNotification => {
                Self::DiagnosticsStatusNotification(decode_payload(action, payload)?)
            }
            ActionName::FirmwareStatusNotification => {
                Self::FirmwareStatusNotification(decode_payload(action, payload)?)
            }
            ActionName::Heartbeat => Self::Heartbeat(decode_payload(action, payload)?),
            ActionName::MeterValues => Self::MeterValues(decode_payload(action, payload)?),
            ActionName::StartTransaction => {
                Self::StartTransaction(decode_payload(action, payload)?)
            }
            ActionName::StatusNotification => {
                Self::StatusNotification(decode_payload(action, payload)?)
            }
            ActionName::StopTransaction => {
                Self::StopTransaction(decode_payload(action, payload)?)
            }
            other => return Err(CatalogError::WrongPartition(other)),
        })
    }

    pub fn to_payload(&self) -> Result<Value, CatalogError> {
        let action = self.action();
        match self {
            Self::Authorize(req) => encode_payload(action, req),
            Self::BootNotification(req) => encode_payload(action, req),
            Self::DataTransfer(req) => encode_payload(action, req),
            Self::DiagnosticsStatusNotification(req) => encode_payload(action, req),
            Self::FirmwareStatusNotification(req) => encode_payload(action, req),
            Self::Heartbeat(req) => encode_payload(action, req),
            Self::MeterValues(req) => encode_payload(action, req),
            Self::StartTransaction(req) => encode_payload(action, req),
            Self::StatusNotification(req) => encode_payload(action, req),
            Self::StopTransaction(req) => encode_payload(action, req),
        }
    }
}

impl ChargePointResponse {
    pub fn action(&self) -> ActionName {
        match self {
            Self::Authorize(_) => ActionName::Authorize,
            Self::BootNotification(_) => ActionName::BootNotification,
            Self::DataTransfer(_) => ActionName::DataTransfer,
            Self::DiagnosticsStatusNotification(_) => ActionName::DiagnosticsStatusNotification,
            Self::FirmwareStatusNotification(_) => ActionName::FirmwareStatusNotification,
            Self::Heartbeat(_) => ActionName::Heartbeat,
            Self::MeterValues(_) => ActionName::MeterValues,
            Self::StartTransaction(_) => ActionName::StartTransaction,
            Self::StatusNotification(_) => ActionName::StatusNotification,
            Self::StopTransaction(_) => ActionName::StopTransaction,
        }
    }

    /// Decode a CallResult payload answering a request for `action`.
    pub fn decode(action: ActionName, payload: Value) -> Result<Self, CatalogError> {
        ensure_partition(action)?;
        action.shape().check_response(&payload)?;

        Ok(match action {
            ActionName::Authorize => Self::Authorize(decode_payload(action, payload)?),
            ActionName::BootNotification => {
                Self::BootNotification(decode_payload(action, payload)?)
            }
            ActionName::DataTransfer => Self::DataTransfer(decode_payload(action, payload)?),
            ActionName::DiagnosticsStatusNotification => {
                Self::DiagnosticsStatusNotification(decode_payload(action, payload)?)
            }
            ActionName::FirmwareStatusNotification => {
                Self::FirmwareStatusNotification(decode_payload(action, payload)?)
            }
            ActionName::Heartbeat => Self::Heartbeat(decode_payload(action, payload)?),
            ActionName::MeterValues => Self::MeterValues(decode_payload(action, payload)?),
            ActionName::StartTransaction => {
                Self::StartTransaction(decode_payload(action, payload)?)
            }
            ActionName::StatusNotification => {
                Self::StatusNotification(decode_payload(action, payload)?)
            }
            ActionName::StopTransaction => {
                Self::StopTransaction(decode_payload(action, payload)?)
            }
            other => return Err(CatalogError::WrongPartition(other)),
        })
    }

    pub fn to_payload(&self) -> Result<Value, CatalogError> {
        let action = self.action();
        match self {
            Self::Authorize(res) => encode_payload(action, res),
            Self::BootNotification(res) => encode_payload(action, res),
            Self::DataTransfer(res) => encode_payload(action, res),
            Self::DiagnosticsStatusNotification(res) => encode_payload(action, res),
            Self::FirmwareStatusNotification(res) => encode_payload(action, res),
            Self::Heartbeat(res) => encode_payload(action, res),
            Self::MeterValues(res) => encode_payload(action, res),
            Self::StartTransaction(res) => encode_payload(action, res),
            Self::StatusNotification(res) => encode_payload(action, res),
            Self::StopTransaction(res) => encode_payload(action, res),
        }
    }
}
