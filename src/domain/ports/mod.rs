//! Domain ports (hexagonal architecture boundaries)
//!
//! Ports define the interfaces between the protocol core and the embedding
//! application. These are trait contracts that external adapters implement.

pub mod inbound;

pub use inbound::{BoundHandler, ChargePointHandler, InboundCallPort};
