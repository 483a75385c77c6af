//! OCPP sub-protocol negotiation
//!
//! During the WebSocket handshake the charge point advertises which OCPP
//! sub-protocols it supports via the `Sec-WebSocket-Protocol` header.
//! The negotiator picks the first configured protocol the client offered.

// ── ProtocolNegotiator ─────────────────────────────────────────

/// Negotiates the sub-protocol during the WebSocket handshake.
///
/// Protocols are tried in configuration order, so the first entry of
/// `[server] subprotocols` wins when a client offers several.
#[derive(Debug, Clone)]
pub struct ProtocolNegotiator {
    supported: Vec<String>,
}

impl ProtocolNegotiator {
    pub fn new(supported: Vec<String>) -> Self {
        Self { supported }
    }

    /// Negotiate from the raw `Sec-WebSocket-Protocol` header value.
    ///
    /// Returns the selected protocol, or `None` if nothing matches.
    pub fn negotiate(&self, requested_protocols: &str) -> Option<&str> {
        let requested: Vec<&str> = requested_protocols.split(',').map(|s| s.trim()).collect();

        self.supported
            .iter()
            .find(|protocol| requested.iter().any(|p| p == protocol))
            .map(String::as_str)
    }

    /// Sub-protocols to advertise (useful for server info / logging).
    pub fn supported_subprotocols(&self) -> &[String] {
        &self.supported
    }
}
