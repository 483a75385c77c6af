//! Application ports (hexagonal architecture boundaries)
//!
//! Inbound ports (domain contracts) are defined in `domain::ports`.
//! Outbound ports that depend on application-layer types live here.

pub mod outbound;

pub use crate::domain::ports::inbound::{ChargePointHandler, InboundCallPort};
pub use outbound::Transport;
