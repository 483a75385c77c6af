//! # OCPP Central System
//!
//! OCPP 1.6-J Central System core: accepts charge point WebSocket
//! connections, answers their calls through a pluggable business handler and
//! lets the application send typed requests to any connected charge point.
//!
//! ## Architecture
//!
//! - **domain**: action catalog, typed OCPP 1.6 messages, error codes, handler port
//! - **application**: connection state machine and connection registry
//! - **interfaces**: tokio-tungstenite WebSocket server
//! - **support**: OCPP-J frame codec, error types, shutdown signal
//! - **config**: TOML configuration

pub mod application;
pub mod config;
pub mod domain;
pub mod interfaces;
pub mod support;

pub use config::{default_config_path, AppConfig};

pub use application::session::{
    ConnectionRegistry, ConnectionStatus, RegistryOptions, SharedConnectionRegistry,
};
pub use domain::{
    ActionName, CentralSystemRequest, CentralSystemResponse, ChargePointHandler,
    ChargePointRequest, ChargePointResponse, ErrorCode, HandlerError,
};
pub use interfaces::ws::OcppServer;
pub use support::errors::RequestError;
pub use support::shutdown::ShutdownSignal;
