//! OCPP-J connection state machine
//!
//! A [`Connection`] owns one transport to one charge point. It frames and
//! writes outbound calls, correlates `CallResult`/`CallError` replies with the
//! pending request table, and dispatches inbound calls to the business handler.
//!
//! ```text
//!   transport text ──► handle_incoming_data ──► Call       ──► InboundCallPort ──► CallResult/CallError
//!                                         ├──► CallResult ──► pending[id] resolved
//!                                         └──► CallError  ──► pending[id] failed
//!   send_request ──► pending[id] + deadline ──► Call ──► transport
//! ```
//!
//! The connection is `Open` until the transport closes or [`Connection::close`]
//! is called, and never reopens. Closing fails every pending request with
//! [`RequestError::ConnectionClosed`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::ports::{InboundCallPort, Transport};
use crate::domain::error::ErrorCode;
use crate::domain::ocpp::{ActionName, ChargePointRequest, OcppCall};
use crate::support::errors::RequestError;
use crate::support::ocpp_frame::OcppFrame;

/// Default time a charge point has to answer a call.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest accepted response timeout; larger values are capped.
pub const MAX_RESPONSE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

type Outcome = Result<Value, RequestError>;

fn response_deadline(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.min(MAX_RESPONSE_TIMEOUT))
        .unwrap_or_else(|| now + DEFAULT_RESPONSE_TIMEOUT)
}

/// Request waiting for its `CallResult` or `CallError`.
struct PendingRequest {
    action: ActionName,
    responder: oneshot::Sender<Outcome>,
    deadline: Instant,
}

/// Removes a pending entry if the caller's future is dropped before resolution.
struct PendingGuard<'a> {
    pending: &'a DashMap<String, PendingRequest>,
    unique_id: Option<String>,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.unique_id = None;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(unique_id) = self.unique_id.take() {
            self.pending.remove(&unique_id);
        }
    }
}

/// A live OCPP-J session with one charge point.
pub struct Connection {
    /// Unique identifier for this connection instance
    connection_id: u64,
    charge_point_id: String,
    transport: Arc<dyn Transport>,
    inbound: Arc<dyn InboundCallPort>,
    pending: DashMap<String, PendingRequest>,
    closed: AtomicBool,
    response_timeout: Duration,
    connected_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(
        connection_id: u64,
        charge_point_id: impl Into<String>,
        transport: Arc<dyn Transport>,
        inbound: Arc<dyn InboundCallPort>,
        response_timeout: Duration,
    ) -> Self {
        Self {
            connection_id,
            charge_point_id: charge_point_id.into(),
            transport,
            inbound,
            pending: DashMap::new(),
            closed: AtomicBool::new(false),
            response_timeout,
            connected_at: Utc::now(),
        }
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    pub fn charge_point_id(&self) -> &str {
        &self.charge_point_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn subprotocol(&self) -> Option<&str> {
        self.transport.subprotocol()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of requests currently awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ── Outbound ───────────────────────────────────────────

    /// Send a call and wait for its typed reply.
    ///
    /// Resolves with the response decoded according to the request's action,
    /// or fails with `Timeout`, `CallError` (peer error), `ConnectionClosed`
    /// or `InvalidResponse`.
    pub async fn send_request<R: OcppCall>(&self, request: R) -> Result<R::Response, RequestError> {
        let action = request.action();
        if self.is_closed() {
            return Err(self.closed_error());
        }
        let payload = request.to_payload().map_err(RequestError::Encode)?;

        let (tx, mut rx) = oneshot::channel();
        let deadline = response_deadline(self.response_timeout);
        let unique_id = self.register_pending(action, tx, deadline);
        let guard = PendingGuard {
            pending: &self.pending,
            unique_id: Some(unique_id.clone()),
        };

        // close() may have drained the table just before our insert landed.
        if self.is_closed() {
            return Err(self.closed_error());
        }

        let frame = OcppFrame::Call {
            unique_id: unique_id.clone(),
            action: action.as_str().to_string(),
            payload,
        };

        info!(
            charge_point_id = self.charge_point_id.as_str(),
            %action,
            message_id = unique_id.as_str(),
            "Sending call"
        );

        if let Err(e) = self.transport.send(frame.serialize()) {
            warn!(
                charge_point_id = self.charge_point_id.as_str(),
                %action,
                message_id = unique_id.as_str(),
                error = %e,
                "Failed to write call"
            );
            return Err(self.closed_error());
        }
        metrics::counter!("ocpp_calls_sent_total", "action" => action.as_str()).increment(1);

        let waited = tokio::time::timeout_at(deadline, &mut rx).await;
        let outcome = match waited {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(self.closed_error()),
            Err(_) => {
                if self.pending.remove(&unique_id).is_some() {
                    warn!(
                        charge_point_id = self.charge_point_id.as_str(),
                        %action,
                        message_id = unique_id.as_str(),
                        "Call timed out"
                    );
                    metrics::counter!("ocpp_call_timeouts_total", "action" => action.as_str())
                        .increment(1);
                    Err(RequestError::Timeout { action })
                } else {
                    // A reply won the race against the deadline.
                    rx.await.unwrap_or_else(|_| Err(self.closed_error()))
                }
            }
        };
        guard.disarm();

        let payload = outcome?;
        R::decode_response(action, payload).map_err(RequestError::InvalidResponse)
    }

    /// Insert a pending entry under a fresh ID not currently in use.
    fn register_pending(
        &self,
        action: ActionName,
        responder: oneshot::Sender<Outcome>,
        deadline: Instant,
    ) -> String {
        let pending = PendingRequest {
            action,
            responder,
            deadline,
        };
        loop {
            let unique_id = Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = self.pending.entry(unique_id.clone()) {
                slot.insert(pending);
                return unique_id;
            }
        }
    }

    fn closed_error(&self) -> RequestError {
        RequestError::ConnectionClosed(self.charge_point_id.clone())
    }

    // ── Inbound ────────────────────────────────────────────

    /// Process one message received from the transport.
    ///
    /// Malformed frames and replies without a matching pending request are
    /// dropped; neither closes the connection. Inbound calls are answered on a
    /// spawned task so a slow handler never stalls the read loop.
    pub fn handle_incoming_data(self: &Arc<Self>, text: &str) {
        if self.is_closed() {
            debug!(
                charge_point_id = self.charge_point_id.as_str(),
                "Dropping message received after close"
            );
            return;
        }

        let frame = match OcppFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    charge_point_id = self.charge_point_id.as_str(),
                    error = %e,
                    raw = text,
                    "Dropping malformed frame"
                );
                return;
            }
        };

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => self.dispatch_call(unique_id, &action, payload),

            OcppFrame::CallResult { unique_id, payload } => self.resolve(&unique_id, Ok(payload)),

            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => self.resolve(
                &unique_id,
                Err(RequestError::CallError {
                    code: error_code,
                    description: error_description,
                    details: error_details,
                }),
            ),
        }
    }

    fn resolve(&self, unique_id: &str, outcome: Outcome) {
        let Some((_, pending)) = self.pending.remove(unique_id) else {
            warn!(
                charge_point_id = self.charge_point_id.as_str(),
                message_id = unique_id,
                "Reply for unknown request dropped"
            );
            return;
        };

        let remaining = pending.deadline.saturating_duration_since(Instant::now());
        info!(
            charge_point_id = self.charge_point_id.as_str(),
            action = %pending.action,
            message_id = unique_id,
            success = outcome.is_ok(),
            remaining_ms = remaining.as_millis() as u64,
            "Received reply"
        );
        // The caller may have given up already; nothing to do then.
        let _ = pending.responder.send(outcome);
    }

    fn dispatch_call(self: &Arc<Self>, unique_id: String, action: &str, payload: Value) {
        metrics::counter!("ocpp_inbound_calls_total").increment(1);

        let request = match action
            .parse::<ActionName>()
            .and_then(|action| ChargePointRequest::decode(action, payload))
        {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    charge_point_id = self.charge_point_id.as_str(),
                    action,
                    message_id = unique_id.as_str(),
                    error = %e,
                    "Rejecting inbound call"
                );
                self.reply(OcppFrame::error_response(
                    unique_id,
                    e.error_code().as_str(),
                    e.to_string(),
                ));
                return;
            }
        };

        info!(
            charge_point_id = self.charge_point_id.as_str(),
            action,
            message_id = unique_id.as_str(),
            "Received call"
        );

        let connection = Arc::clone(self);
        tokio::spawn(async move {
            connection.answer_call(unique_id, request).await;
        });
    }

    async fn answer_call(&self, unique_id: String, request: ChargePointRequest) {
        let action = request.action();

        let frame = match self.inbound.handle_call(request).await {
            Ok(response) if response.action() == action => match response.to_payload() {
                Ok(payload) => OcppFrame::CallResult { unique_id, payload },
                Err(e) => OcppFrame::error_response(
                    unique_id,
                    ErrorCode::InternalError.as_str(),
                    e.to_string(),
                ),
            },
            Ok(response) => {
                error!(
                    charge_point_id = self.charge_point_id.as_str(),
                    %action,
                    answered = %response.action(),
                    "Handler answered with a response of another action"
                );
                OcppFrame::error_response(
                    unique_id,
                    ErrorCode::InternalError.as_str(),
                    format!("No valid {} response available", action),
                )
            }
            Err(e) => {
                warn!(
                    charge_point_id = self.charge_point_id.as_str(),
                    %action,
                    error = %e,
                    "Handler rejected call"
                );
                let (code, description, details) = e.into_wire_parts();
                OcppFrame::CallError {
                    unique_id,
                    error_code: code.as_str().to_string(),
                    error_description: description,
                    error_details: details,
                }
            }
        };

        self.reply(frame);
    }

    fn reply(&self, frame: OcppFrame) {
        if self.is_closed() {
            debug!(
                charge_point_id = self.charge_point_id.as_str(),
                message_id = frame.unique_id(),
                "Connection closed, reply discarded"
            );
            return;
        }
        if let Err(e) = self.transport.send(frame.serialize()) {
            warn!(
                charge_point_id = self.charge_point_id.as_str(),
                message_id = frame.unique_id(),
                error = %e,
                "Failed to write reply"
            );
        }
    }

    // ── Lifecycle ──────────────────────────────────────────

    /// Transition to `Closed`: fail every pending request, release the transport.
    /// Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let ids: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        let mut failed = 0usize;
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                let _ = pending.responder.send(Err(self.closed_error()));
                failed += 1;
            }
        }

        self.transport.close();
        info!(
            charge_point_id = self.charge_point_id.as_str(),
            connection_id = self.connection_id,
            failed_requests = failed,
            "Connection closed"
        );
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connection_id", &self.connection_id)
            .field("charge_point_id", &self.charge_point_id)
            .field("pending", &self.pending.len())
            .field("closed", &self.is_closed())
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

// ── Tests ──────────────────────────────────────────────────────
