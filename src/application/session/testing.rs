//! In-memory fixtures shared by the session tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

use crate::application::ports::{ChargePointHandler, Transport};
use crate::domain::error::{ErrorCode, HandlerError};
use crate::domain::ocpp::{ActionName, ChargePointRequest, ChargePointResponse};
use crate::support::errors::TransportError;
use crate::support::ocpp_frame::OcppFrame;

/// Transport that hands every written message to a channel.
pub(crate) struct MemoryTransport {
    sender: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
    subprotocol: Option<String>,
}

impl MemoryTransport {
    pub(crate) fn new(subprotocol: Option<&str>) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (sender, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            sender,
            closed: AtomicBool::new(false),
            subprotocol: subprotocol.map(str::to_string),
        });
        (transport, rx)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, text: String) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.sender.send(text).map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }
}

/// Handler that records every call and answers a few actions.
///
/// `Authorize` is always rejected, `MeterValues` fails with scalar details and
/// `DataTransfer` is answered with a `Heartbeat` response to exercise the
/// mismatch path.
#[derive(Default)]
pub(crate) struct RecordingHandler {
    calls: Mutex<Vec<(ActionName, String)>>,
}

impl RecordingHandler {
    pub(crate) fn calls(&self) -> Vec<(ActionName, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ChargePointHandler for RecordingHandler {
    async fn handle(
        &self,
        request: ChargePointRequest,
        charge_point_id: &str,
    ) -> Result<ChargePointResponse, HandlerError> {
        let action = request.action();
        self.calls.lock().push((action, charge_point_id.to_string()));

        let heartbeat = || {
            ChargePointResponse::decode(
                ActionName::Heartbeat,
                json!({"currentTime": "2024-01-01T00:00:00Z"}),
            )
            .map_err(|e| HandlerError::internal(e.to_string()))
        };

        match action {
            ActionName::Heartbeat | ActionName::DataTransfer => heartbeat(),
            ActionName::StatusNotification => {
                ChargePointResponse::decode(ActionName::StatusNotification, json!({}))
                    .map_err(|e| HandlerError::internal(e.to_string()))
            }
            // Bypasses `with_details` on purpose.
            ActionName::MeterValues => Err(HandlerError {
                code: ErrorCode::GenericError,
                description: "x".to_string(),
                details: json!("oops"),
            }),
            _ => Err(HandlerError::new(
                ErrorCode::SecurityError,
                "rejected by test handler",
            )),
        }
    }
}

pub(crate) fn heartbeat() -> ChargePointRequest {
    ChargePointRequest::decode(ActionName::Heartbeat, json!({})).unwrap()
}

/// Next message written to the transport, parsed.
pub(crate) async fn recv_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> OcppFrame {
    let text = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no frame written in time")
        .expect("transport channel closed");
    OcppFrame::parse(&text).unwrap()
}
