//! Central system initiated messages
//!
//! Closed sum types over the eighteen OCPP 1.6 commands the central system
//! may send to a charge point.

use rust_ocpp::v1_6::messages::cancel_reservation::{
    CancelReservationRequest, CancelReservationResponse,
};
use rust_ocpp::v1_6::messages::change_availability::{
    ChangeAvailabilityRequest, ChangeAvailabilityResponse,
};
use rust_ocpp::v1_6::messages::change_configuration::{
    ChangeConfigurationRequest, ChangeConfigurationResponse,
};
use rust_ocpp::v1_6::messages::clear_cache::{ClearCacheRequest, ClearCacheResponse};
use rust_ocpp::v1_6::messages::clear_charging_profile::{
    ClearChargingProfileRequest, ClearChargingProfileResponse,
};
use rust_ocpp::v1_6::messages::get_composite_schedule::{
    GetCompositeScheduleRequest, GetCompositeScheduleResponse,
};
use rust_ocpp::v1_6::messages::get_configuration::{
    GetConfigurationRequest, GetConfigurationResponse,
};
use rust_ocpp::v1_6::messages::get_diagnostics::{GetDiagnosticsRequest, GetDiagnosticsResponse};
use rust_ocpp::v1_6::messages::get_local_list_version::{
    GetLocalListVersionRequest, GetLocalListVersionResponse,
};
use rust_ocpp::v1_6::messages::remote_start_transaction::{
    RemoteStartTransactionRequest, RemoteStartTransactionResponse,
};
use rust_ocpp::v1_6::messages::remote_stop_transaction::{
    RemoteStopTransactionRequest, RemoteStopTransactionResponse,
};
use rust_ocpp::v1_6::messages::reserve_now::{ReserveNowRequest, ReserveNowResponse};
use rust_ocpp::v1_6::messages::reset::{ResetRequest, ResetResponse};
use rust_ocpp::v1_6::messages::send_local_list::{SendLocalListRequest, SendLocalListResponse};
use rust_ocpp::v1_6::messages::set_charging_profile::{
    SetChargingProfileRequest, SetChargingProfileResponse,
};
use rust_ocpp::v1_6::messages::trigger_message::{TriggerMessageRequest, TriggerMessageResponse};
use rust_ocpp::v1_6::messages::unlock_connector::{
    UnlockConnectorRequest, UnlockConnectorResponse,
};
use rust_ocpp::v1_6::messages::update_firmware::{UpdateFirmwareRequest, UpdateFirmwareResponse};
use serde_json::Value;

use super::catalog::{ActionName, CatalogError, Partition};
use super::{decode_payload, encode_payload};

/// A command sent by the central system to a charge point.
#[derive(Debug, Clone)]
pub enum CentralSystemRequest {
    CancelReservation(CancelReservationRequest),
    ChangeAvailability(ChangeAvailabilityRequest),
    ChangeConfiguration(ChangeConfigurationRequest),
    ClearCache(ClearCacheRequest),
    ClearChargingProfile(ClearChargingProfileRequest),
    GetCompositeSchedule(GetCompositeScheduleRequest),
    GetConfiguration(GetConfigurationRequest),
    GetDiagnostics(GetDiagnosticsRequest),
    GetLocalListVersion(GetLocalListVersionRequest),
    RemoteStartTransaction(RemoteStartTransactionRequest),
    RemoteStopTransaction(RemoteStopTransactionRequest),
    ReserveNow(ReserveNowRequest),
    Reset(ResetRequest),
    SendLocalList(SendLocalListRequest),
    SetChargingProfile(SetChargingProfileRequest),
    TriggerMessage(TriggerMessageRequest),
    UnlockConnector(UnlockConnectorRequest),
    UpdateFirmware(UpdateFirmwareRequest),
}

/// A charge point's answer to a [`CentralSystemRequest`].
#[derive(Debug, Clone)]
pub enum CentralSystemResponse {
    CancelReservation(CancelReservationResponse),
    ChangeAvailability(ChangeAvailabilityResponse),
    ChangeConfiguration(ChangeConfigurationResponse),
    ClearCache(ClearCacheResponse),
    ClearChargingProfile(ClearChargingProfileResponse),
    GetCompositeSchedule(GetCompositeScheduleResponse),
    GetConfiguration(GetConfigurationResponse),
    GetDiagnostics(GetDiagnosticsResponse),
    GetLocalListVersion(GetLocalListVersionResponse),
    RemoteStartTransaction(RemoteStartTransactionResponse),
    RemoteStopTransaction(RemoteStopTransactionResponse),
    ReserveNow(ReserveNowResponse),
    Reset(ResetResponse),
    SendLocalList(SendLocalListResponse),
    SetChargingProfile(SetChargingProfileResponse),
    TriggerMessage(TriggerMessageResponse),
    UnlockConnector(UnlockConnectorResponse),
    UpdateFirmware(UpdateFirmwareResponse),
}

fn ensure_partition(action: ActionName) -> Result<(), CatalogError> {
    if action.partition() == Partition::CentralSystemInitiated {
        Ok(())
    } else {
        Err(CatalogError::WrongPartition(action))
    }
}

impl CentralSystemRequest {
    pub fn action(&self) -> ActionName {
        match self {
            Self::CancelReservation(_) => ActionName::CancelReservation,
            Self::ChangeAvailability(_) => ActionName::ChangeAvailability,
            Self::ChangeConfiguration(_) => ActionName::ChangeConfiguration,
            Self::ClearCache(_) => ActionName::ClearCache,
            Self::ClearChargingProfile(_) => ActionName::ClearChargingProfile,
            Self::GetCompositeSchedule(_) => ActionName::GetCompositeSchedule,
            Self::GetConfiguration(_) => ActionName::GetConfiguration,
            Self::GetDiagnostics(_) => ActionName::GetDiagnostics,
            Self::GetLocalListVersion(_) => ActionName::GetLocalListVersion,
            Self::RemoteStartTransaction(_) => ActionName::RemoteStartTransaction,
            Self::RemoteStopTransaction(_) => ActionName::RemoteStopTransaction,
            Self::ReserveNow(_) => ActionName::ReserveNow,
            Self::Reset(_) => ActionName::Reset,
            Self::SendLocalList(_) => ActionName::SendLocalList,
            Self::SetChargingProfile(_) => ActionName::SetChargingProfile,
            Self::TriggerMessage(_) => ActionName::TriggerMessage,
            Self::UnlockConnector(_) => ActionName::UnlockConnector,
            Self::UpdateFirmware(_) => ActionName::UpdateFirmware,
        }
    }

    /// Decode a command payload for `action`. Used mainly to build requests
    /// from raw JSON (e.g. commands forwarded from an operator API).
    pub fn decode(action: ActionName, payload: Value) -> Result<Self, CatalogError> {
        ensure_partition(action)?;
        action.shape().check_request(&payload)?;

        Ok(match action {
            ActionName::CancelReservation => {
                Self::CancelReservation(decode_payload(action, payload)?)
            }
            ActionName::ChangeAvailability => {
                Self::ChangeAvailability(decode_payload(action, payload)?)
            }
            ActionName::ChangeConfiguration => {
                Self::ChangeConfiguration(decode_payload(action, payload)?)
            }
            ActionName::ClearCache => Self::ClearCache(decode_payload(action, payload)?),
            ActionName::ClearChargingProfile => {
                Self::ClearChargingProfile(decode_payload(action, payload)?)
            }
            ActionName::GetCompositeSchedule => {
                Self::GetCompositeSchedule(decode_payload(action, payload)?)
            }
            ActionName::GetConfiguration => {
                Self::GetConfiguration(decode_payload(action, payload)?)
            }
            ActionName::GetDiagnostics => Self::GetDiagnostics(decode_payload(action, payload)?),
            ActionName::GetLocalListVersion => {
                Self::GetLocalListVersion(decode_payload(action, payload)?)
            }
            ActionName::RemoteStartTransaction => {
                Self::RemoteStartTransaction(decode_payload(action, payload)?)
            }
            ActionName::RemoteStopTransaction => {
                Self::RemoteStopTransaction(decode_payload(action, payload)?)
            }
            ActionName::ReserveNow => Self::ReserveNow(decode_payload(action, payload)?),
            ActionName::Reset => Self::Reset(decode_payload(action, payload)?),
            ActionName::SendLocalList => Self::SendLocalList(decode_payload(action, payload)?),
            ActionName::SetChargingProfile => {
                Self::SetChargingProfile(decode_payload(action, payload)?)
            }
            ActionName::TriggerMessage => Self::TriggerMessage(decode_payload(action, payload)?),
            ActionName::UnlockConnector => {
                Self::UnlockConnector(decode_payload(action, payload)?)
            }
            ActionName::UpdateFirmware => Self::UpdateFirmware(decode_payload(action, payload)?),
            other => return Err(CatalogError::WrongPartition(other)),
        })
    }

    pub fn to_payload(&self) -> Result<Value, CatalogError> {
        let action = self.action();
        match self {
            Self::CancelReservation(req) => encode_payload(action, req),
            Self::ChangeAvailability(req) => encode_payload(action, req),
            Self::ChangeConfiguration(req) => encode_payload(action, req),
            Self::ClearCache(req) => encode_payload(action, req),
            Self::ClearChargingProfile(req) => encode_payload(action, req),
            Self::GetCompositeSchedule(req) => encode_payload(action, req),
            Self::GetConfiguration(req) => encode_payload(action, req),
            Self::GetDiagnostics(req) => encode_payload(action, req),
            Self::GetLocalListVersion(req) => encode_payload(action, req),
            Self::RemoteStartTransaction(req) => encode_payload(action, req),
            Self::RemoteStopTransaction(req) => encode_payload(action, req),
            Self::ReserveNow(req) => encode_payload(action, req),
            Self::Reset(req) => encode_payload(action, req),
            Self::SendLocalList(req) => encode_payload(action, req),
            Self::SetChargingProfile(req) => encode_payload(action, req),
            Self::TriggerMessage(req) => encode_payload(action, req),
            Self::UnlockConnector(req) => encode_payload(action, req),
            Self::UpdateFirmware(req) => encode_payload(action, req),
        }
    }
}

impl CentralSystemResponse {
    pub fn action(&self) -> ActionName {
        match self {
            Self::CancelReservation(_) => ActionName::CancelReservation,
            Self::ChangeAvailability(_) => ActionName::ChangeAvailability,
            Self::ChangeConfiguration(_) => ActionName::ChangeConfiguration,
            Self::ClearCache(_) => ActionName::ClearCache,
            Self::ClearChargingProfile(_) => ActionName::ClearChargingProfile,
            Self::GetCompositeSchedule(_) => ActionName::GetCompositeSchedule,
            Self::GetConfiguration(_) => ActionName::GetConfiguration,
            Self::GetDiagnostics(_) => ActionName::GetDiagnostics,
            Self::GetLocalListVersion(_) => ActionName::GetLocalListVersion,
            Self::RemoteStartTransaction(_) => ActionName::RemoteStartTransaction,
            Self::RemoteStopTransaction(_) => ActionName::RemoteStopTransaction,
            Self::ReserveNow(_) => ActionName::ReserveNow,
            Self::Reset(_) => ActionName::Reset,
            Self::SendLocalList(_) => ActionName::SendLocalList,
            Self::SetChargingProfile(_) => ActionName::SetChargingProfile,
            Self::TriggerMessage(_) => ActionName::TriggerMessage,
            Self::UnlockConnector(_) => ActionName::UnlockConnector,
            Self::UpdateFirmware(_) => ActionName::UpdateFirmware,
        }
    }

    /// Decode a CallResult payload answering a command for `action`.
    pub fn decode(action: ActionName, payload: Value) -> Result<Self, CatalogError> {
        ensure_partition(action)?;
        action.shape().check_response(&payload)?;

        Ok(match action {
            ActionName::CancelReservation => {
                Self::CancelReservation(decode_payload(action, payload)?)
            }
            ActionName::ChangeAvailability => {
                Self::ChangeAvailability(decode_payload(action, payload)?)
            }
            ActionName::ChangeConfiguration => {
                Self::ChangeConfiguration(decode_payload(action, payload)?)
            }
            ActionName::ClearCache => Self::ClearCache(decode_payload(action, payload)?),
            ActionName::ClearChargingProfile => {
                Self::ClearChargingProfile(decode_payload(action, payload)?)
            }
            ActionName::GetCompositeSchedule => {
                Self::GetCompositeSchedule(decode_payload(action, payload)?)
            }
            ActionName::GetConfiguration => {
                Self::GetConfiguration(decode_payload(action, payload)?)
            }
            ActionName::GetDiagnostics => Self::GetDiagnostics(decode_payload(action, payload)?),
            ActionName::GetLocalListVersion => {
                Self::GetLocalListVersion(decode_payload(action, payload)?)
            }
            ActionName::RemoteStartTransaction => {
                Self::RemoteStartTransaction(decode_payload(action, payload)?)
            }
            ActionName::RemoteStopTransaction => {
                Self::RemoteStopTransaction(decode_payload(action, payload)?)
            }
            ActionName::ReserveNow => Self::ReserveNow(decode_payload(action, payload)?),
            ActionName::Reset => Self::Reset(decode_payload(action, payload)?),
            ActionName::SendLocalList => Self::SendLocalList(decode_payload(action, payload)?),
            ActionName::SetChargingProfile => {
                Self::SetChargingProfile(decode_payload(action, payload)?)
            }
            ActionName::TriggerMessage => Self::TriggerMessage(decode_payload(action, payload)?),
            ActionName::UnlockConnector => {
                Self::UnlockConnector(decode_payload(action, payload)?)
            }
            ActionName::UpdateFirmware => Self::UpdateFirmware(decode_payload(action, payload)?),
            other => return Err(CatalogError::WrongPartition(other)),
        })
    }

    pub fn to_payload(&self) -> Result<Value, CatalogError> {
        let action = self.action();
        match self {
            Self::CancelReservation(res) => encode_payload(action, res),
            Self::ChangeAvailability(res) => encode_payload(action, res),
            Self::ChangeConfiguration(res) => encode_payload(action, res),
            Self::ClearCache(res) => encode_payload(action, res),
            Self::ClearChargingProfile(res) => encode_payload(action, res),
            Self::GetCompositeSchedule(res) => encode_payload(action, res),
            Self::GetConfiguration(res) => encode_payload(action, res),
            Self::GetDiagnostics(res) => encode_payload(action, res),
            Self::GetLocalListVersion(res) => encode_payload(action, res),
            Self::RemoteStartTransaction(res) => encode_payload(action, res),
            Self::RemoteStopTransaction(res) => encode_payload(action, res),
            Self::ReserveNow(res) => encode_payload(action, res),
            Self::Reset(res) => encode_payload(action, res),
            Self::SendLocalList(res) => encode_payload(action, res),
            Self::SetChargingProfile(res) => encode_payload(action, res),
            Self::TriggerMessage(res) => encode_payload(action, res),
            Self::UnlockConnector(res) => encode_payload(action, res),
            Self::UpdateFirmware(res) => encode_payload(action, res),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reset_request_encodes_type_field() {
        let req = CentralSystemRequest::decode(ActionName::Reset, json!({"type": "Hard"})).unwrap();
        assert_eq!(req.action(), ActionName::Reset);
        assert_eq!(req.to_payload().unwrap()["type"], "Hard");
    }

    #[test]
    fn remote_start_response_decodes_status() {
        let res = CentralSystemResponse::decode(
            ActionName::RemoteStartTransaction,
            json!({"status": "Accepted"}),
        )
        .unwrap();
        assert_eq!(res.action(), ActionName::RemoteStartTransaction);
        assert_eq!(res.to_payload().unwrap(), json!({"status": "Accepted"}));
    }

    #[test]
    fn response_missing_status_is_rejected() {
        let err = CentralSystemResponse::decode(ActionName::ClearCache, json!({})).unwrap_err();
        assert!(matches!(err, CatalogError::MissingField { field: "status", .. }));
    }

    #[test]
    fn charge_point_action_is_rejected() {
        let err = CentralSystemRequest::decode(ActionName::Heartbeat, json!({})).unwrap_err();
        assert!(matches!(err, CatalogError::WrongPartition(ActionName::Heartbeat)));
    }
}
