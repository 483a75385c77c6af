//! Permissive charge point handler
//!
//! Accepts every boot, authorization and transaction, hands out increasing
//! transaction IDs and acknowledges all notifications. Useful for bench
//! testing charge points against a bare central system.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_ocpp::v1_6::messages::authorize::AuthorizeResponse;
use rust_ocpp::v1_6::messages::boot_notification::BootNotificationResponse;
use rust_ocpp::v1_6::messages::data_transfer::DataTransferResponse;
use rust_ocpp::v1_6::messages::diagnostics_status_notification::DiagnosticsStatusNotificationResponse;
use rust_ocpp::v1_6::messages::firmware_status_notification::FirmwareStatusNotificationResponse;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use rust_ocpp::v1_6::messages::meter_values::MeterValuesResponse;
use rust_ocpp::v1_6::messages::start_transaction::StartTransactionResponse;
use rust_ocpp::v1_6::messages::status_notification::StatusNotificationResponse;
use rust_ocpp::v1_6::messages::stop_transaction::StopTransactionResponse;
use rust_ocpp::v1_6::types::{AuthorizationStatus, DataTransferStatus, IdTagInfo, RegistrationStatus};
use tracing::info;

use crate::application::ports::ChargePointHandler;
use crate::domain::error::HandlerError;
use crate::domain::ocpp::{ChargePointRequest, ChargePointResponse};

/// Heartbeat interval (seconds) returned in `BootNotification.conf`
const DEFAULT_HEARTBEAT_INTERVAL: u32 = 300;

pub struct AcceptAllHandler {
    heartbeat_interval: u32,
    next_transaction_id: AtomicI32,
}

impl AcceptAllHandler {
    pub fn new() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            next_transaction_id: AtomicI32::new(1),
        }
    }

    pub fn with_heartbeat_interval(mut self, seconds: u32) -> Self {
        self.heartbeat_interval = seconds;
        self
    }

    fn accepted() -> IdTagInfo {
        IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        }
    }
}

impl Default for AcceptAllHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChargePointHandler for AcceptAllHandler {
    async fn handle(
        &self,
        request: ChargePointRequest,
        charge_point_id: &str,
    ) -> Result<ChargePointResponse, HandlerError> {
        let response = match request {
            ChargePointRequest::BootNotification(req) => {
                info!(
                    charge_point_id,
                    vendor = req.charge_point_vendor.as_str(),
                    model = req.charge_point_model.as_str(),
                    "BootNotification"
                );
                ChargePointResponse::BootNotification(BootNotificationResponse {
                    current_time: Utc::now(),
                    interval: self.heartbeat_interval,
                    status: RegistrationStatus::Accepted,
                })
            }
            ChargePointRequest::Authorize(req) => {
                info!(charge_point_id, id_tag = req.id_tag.as_str(), "Authorize");
                ChargePointResponse::Authorize(AuthorizeResponse {
                    id_tag_info: Self::accepted(),
                })
            }
            ChargePointRequest::Heartbeat(_) => {
                ChargePointResponse::Heartbeat(HeartbeatResponse {
                    current_time: Utc::now(),
                })
            }
            ChargePointRequest::StartTransaction(req) => {
                let transaction_id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);
                info!(
                    charge_point_id,
                    connector_id = req.connector_id,
                    id_tag = req.id_tag.as_str(),
                    meter_start = req.meter_start,
                    transaction_id,
                    "StartTransaction"
                );
                ChargePointResponse::StartTransaction(StartTransactionResponse {
                    transaction_id,
                    id_tag_info: Self::accepted(),
                })
            }
            ChargePointRequest::StopTransaction(req) => {
                info!(
                    charge_point_id,
                    transaction_id = req.transaction_id,
                    meter_stop = req.meter_stop,
                    "StopTransaction"
                );
                ChargePointResponse::StopTransaction(StopTransactionResponse {
                    id_tag_info: req.id_tag.as_ref().map(|_| Self::accepted()),
                })
            }
            ChargePointRequest::StatusNotification(req) => {
                info!(
                    charge_point_id,
                    connector_id = req.connector_id,
                    status = ?req.status,
                    "StatusNotification"
                );
                ChargePointResponse::StatusNotification(StatusNotificationResponse {})
            }
            ChargePointRequest::MeterValues(req) => {
                info!(
                    charge_point_id,
                    connector_id = req.connector_id,
                    samples = req.meter_value.len(),
                    "MeterValues"
                );
                ChargePointResponse::MeterValues(MeterValuesResponse {})
            }
            ChargePointRequest::DataTransfer(req) => {
                info!(charge_point_id, vendor_string = req.vendor_string.as_str(), "DataTransfer");
                ChargePointResponse::DataTransfer(DataTransferResponse {
                    status: DataTransferStatus::Accepted,
                    data: None,
                })
            }
            ChargePointRequest::DiagnosticsStatusNotification(req) => {
                info!(charge_point_id, status = ?req.status, "DiagnosticsStatusNotification");
                ChargePointResponse::DiagnosticsStatusNotification(
                    DiagnosticsStatusNotificationResponse {},
                )
            }
            ChargePointRequest::FirmwareStatusNotification(req) => {
                info!(charge_point_id, status = ?req.status, "FirmwareStatusNotification");
                ChargePointResponse::FirmwareStatusNotification(
                    FirmwareStatusNotificationResponse {},
                )
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::ocpp::ActionName;

    async fn answer(action: ActionName, payload: serde_json::Value) -> serde_json::Value {
        let handler = AcceptAllHandler::new().with_heartbeat_interval(60);
        let request = ChargePointRequest::decode(action, payload).unwrap();
        let response = handler.handle(request, "CP1").await.unwrap();
        assert_eq!(response.action(), action);
        response.to_payload().unwrap()
    }

    #[tokio::test]
    async fn boot_is_accepted_with_configured_interval() {
        let payload = answer(
            ActionName::BootNotification,
            json!({"chargePointVendor": "Acme", "chargePointModel": "X1"}),
        )
        .await;
        assert_eq!(payload["status"], "Accepted");
        assert_eq!(payload["interval"], 60);
        assert!(payload["currentTime"].is_string());
    }

    #[tokio::test]
    async fn authorize_accepts_any_tag() {
        let payload = answer(ActionName::Authorize, json!({"idTag": "ABC123"})).await;
        assert_eq!(payload["idTagInfo"]["status"], "Accepted");
    }

    #[tokio::test]
    async fn data_transfer_is_accepted() {
        let payload = answer(
            ActionName::DataTransfer,
            json!({"vendorId": "acme", "messageId": "ping", "data": "1"}),
        )
        .await;
        assert_eq!(payload["status"], "Accepted");
    }

    #[tokio::test]
    async fn transactions_get_increasing_ids() {
        let handler = AcceptAllHandler::new();
        let start = || {
            ChargePointRequest::decode(
                ActionName::StartTransaction,
                json!({
                    "connectorId": 1,
                    "idTag": "ABC123",
                    "meterStart": 0,
                    "timestamp": "2024-01-01T00:00:00Z"
                }),
            )
            .unwrap()
        };

        let mut ids = Vec::new();
        for _ in 0..2 {
            match handler.handle(start(), "CP1").await.unwrap() {
                ChargePointResponse::StartTransaction(res) => ids.push(res.transaction_id),
                other => panic!("Expected StartTransaction response, got {:?}", other),
            }
        }
        assert_eq!(ids, vec![1, 2]);
    }
}
