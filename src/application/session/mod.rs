//! Live charge point sessions: the per-connection protocol state machine and
//! the registry that routes requests by charge point identity.

pub mod connection;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{Connection, DEFAULT_RESPONSE_TIMEOUT};
pub use registry::{
    charge_point_identity, ConnectionListener, ConnectionRegistry, ConnectionStatus,
    RegistryOptions, SharedConnectionRegistry,
};
