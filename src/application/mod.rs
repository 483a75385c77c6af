pub mod handlers;
pub mod ports;
pub mod session;

// Re-export key types for convenience
pub use handlers::AcceptAllHandler;
pub use ports::{ChargePointHandler, InboundCallPort, Transport};
pub use session::{
    Connection, ConnectionRegistry, ConnectionStatus, RegistryOptions, SharedConnectionRegistry,
};
