//! Outbound ports — the transport a connection writes to
//!
//! [`Transport`] decouples the protocol state machine from the concrete
//! socket. The production implementation is the tokio-tungstenite session in
//! [`interfaces::ws`](crate::interfaces::ws); tests use an in-memory channel.

use crate::support::errors::TransportError;

/// A single, already-established message transport to one charge point.
///
/// Inbound messages and the close event are pushed into the owning
/// [`Connection`](crate::application::session::Connection) by whoever drives
/// the socket; this trait only covers the outbound direction.
pub trait Transport: Send + Sync {
    /// Queue one text message for delivery. No internal rate limiting.
    fn send(&self, text: String) -> Result<(), TransportError>;

    /// Close the transport. Idempotent.
    fn close(&self);

    /// Sub-protocol negotiated during the handshake, if any.
    fn subprotocol(&self) -> Option<&str>;
}
