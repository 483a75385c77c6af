//! Ready-made charge point handlers
//!
//! - `accept_all`: permissive handler used by the `ocpp-central` binary

pub mod accept_all;

pub use accept_all::AcceptAllHandler;
