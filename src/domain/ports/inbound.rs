//! Inbound ports — interfaces for handling incoming OCPP calls
//!
//! The embedding application supplies one [`ChargePointHandler`] at startup.
//! Each connection wraps it in a per-connection [`InboundCallPort`] bound to
//! that connection's charge point identity.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::HandlerError;
use crate::domain::ocpp::{ChargePointRequest, ChargePointResponse};

// ── ChargePointHandler ─────────────────────────────────────────

/// Business logic for calls initiated by charge points.
///
/// Invoked exactly once per valid inbound Call. The returned response must be
/// of the same action as the request; a mismatch is reported to the peer as
/// `InternalError`.
#[async_trait]
pub trait ChargePointHandler: Send + Sync {
    async fn handle(
        &self,
        request: ChargePointRequest,
        charge_point_id: &str,
    ) -> Result<ChargePointResponse, HandlerError>;
}

// ── InboundCallPort ────────────────────────────────────────────

/// Per-connection entry point for decoded inbound calls.
#[async_trait]
pub trait InboundCallPort: Send + Sync {
    async fn handle_call(
        &self,
        request: ChargePointRequest,
    ) -> Result<ChargePointResponse, HandlerError>;
}

// ── BoundHandler ───────────────────────────────────────────────

/// Binds the shared business handler to one charge point identity.
pub struct BoundHandler {
    charge_point_id: String,
    handler: Arc<dyn ChargePointHandler>,
}

impl BoundHandler {
    pub fn new(charge_point_id: impl Into<String>, handler: Arc<dyn ChargePointHandler>) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            handler,
        }
    }
}

#[async_trait]
impl InboundCallPort for BoundHandler {
    async fn handle_call(
        &self,
        request: ChargePointRequest,
    ) -> Result<ChargePointResponse, HandlerError> {
        self.handler.handle(request, &self.charge_point_id).await
    }
}
