//! Connection registry — routes requests to live charge point connections
//!
//! The registry holds at most one live [`Connection`] per charge point
//! identity. Every accepted connection carries a registry-assigned
//! `connection_id`; teardown only evicts the slot if it still holds that
//! same connection, so a late close of a superseded socket never removes
//! (or reports as disconnected) the charge point's newer connection.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::application::ports::{ChargePointHandler, Transport};
use crate::domain::ocpp::OcppCall;
use crate::domain::ports::BoundHandler;
use crate::support::errors::{AcceptError, RequestError};

use super::connection::{Connection, DEFAULT_RESPONSE_TIMEOUT};

/// Connectivity change reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked on every connectivity change, in registration order.
pub type ConnectionListener = Arc<dyn Fn(&str, ConnectionStatus) + Send + Sync>;

/// Registry settings derived from the `[server]` and `[ocpp]` config sections.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Sub-protocols a connecting charge point may select.
    pub supported_protocols: Vec<String>,
    /// Deadline applied to every outbound request.
    pub response_timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            supported_protocols: vec!["ocpp1.6".to_string()],
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Thread-safe registry of live charge point connections
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<Connection>>,
    listeners: RwLock<Vec<ConnectionListener>>,
    handler: Arc<dyn ChargePointHandler>,
    options: RegistryOptions,
    next_connection_id: AtomicU64,
}

/// Shared, reference-counted connection registry
pub type SharedConnectionRegistry = Arc<ConnectionRegistry>;

/// Charge point identity carried in a request path: the last path segment,
/// ignoring any query string or fragment.
pub fn charge_point_identity(path: &str) -> Option<&str> {
    let path = path
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    path.rsplit('/').next().filter(|segment| !segment.is_empty())
}

impl ConnectionRegistry {
    pub fn new(handler: Arc<dyn ChargePointHandler>, options: RegistryOptions) -> Self {
        Self {
            connections: DashMap::new(),
            listeners: RwLock::new(Vec::new()),
            handler,
            options,
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Wrap in `Arc` for shared ownership
    pub fn shared(
        handler: Arc<dyn ChargePointHandler>,
        options: RegistryOptions,
    ) -> SharedConnectionRegistry {
        Arc::new(Self::new(handler, options))
    }

    pub fn supported_protocols(&self) -> &[String] {
        &self.options.supported_protocols
    }

    /// Register a listener for connectivity changes.
    ///
    /// Listeners may register further listeners; those take effect from the
    /// next change on.
    pub fn add_connection_listener<F>(&self, listener: F)
    where
        F: Fn(&str, ConnectionStatus) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Admit a freshly opened transport.
    ///
    /// Refuses (and closes) the transport when the path carries no identity or
    /// the negotiated sub-protocol is not supported. A previous connection for
    /// the same identity is closed and replaced.
    pub fn accept_connection(
        &self,
        transport: Arc<dyn Transport>,
        path: &str,
    ) -> Result<Arc<Connection>, AcceptError> {
        let Some(charge_point_id) = charge_point_identity(path) else {
            warn!(path, "Rejecting connection without charge point identity");
            transport.close();
            return Err(AcceptError::MissingIdentity(path.to_string()));
        };

        let protocol = transport.subprotocol();
        let supported = protocol.is_some_and(|p| {
            self.options
                .supported_protocols
                .iter()
                .any(|supported| supported == p)
        });
        if !supported {
            warn!(charge_point_id, ?protocol, "Rejecting connection with unsupported subprotocol");
            let protocol = protocol.map(str::to_string);
            transport.close();
            return Err(AcceptError::UnsupportedProtocol(protocol));
        }

        let connection_id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        let inbound = Arc::new(BoundHandler::new(charge_point_id, self.handler.clone()));
        let connection = Arc::new(Connection::new(
            connection_id,
            charge_point_id,
            transport,
            inbound,
            self.options.response_timeout,
        ));

        if let Some(previous) = self
            .connections
            .insert(charge_point_id.to_string(), connection.clone())
        {
            info!(
                charge_point_id,
                previous_connection_id = previous.connection_id(),
                previous_connected_at = %previous.connected_at(),
                connection_id,
                "Charge point reconnected, closing previous connection"
            );
            previous.close();
        }

        info!(
            charge_point_id,
            connection_id,
            subprotocol = connection.subprotocol().unwrap_or_default(),
            "Charge point connected"
        );
        self.update_gauge();
        self.notify(charge_point_id, ConnectionStatus::Connected);

        Ok(connection)
    }

    /// Tear down a connection after its transport closed.
    ///
    /// Returns `true` if the connection was still the registered one for its
    /// identity (and `Disconnected` was reported).
    pub fn on_disconnect(&self, connection: &Connection) -> bool {
        connection.close();

        let charge_point_id = connection.charge_point_id();
        let evicted = self
            .connections
            .remove_if(charge_point_id, |_, current| {
                current.connection_id() == connection.connection_id()
            })
            .is_some();

        if evicted {
            info!(
                charge_point_id,
                connection_id = connection.connection_id(),
                "Charge point disconnected"
            );
            self.update_gauge();
            self.notify(charge_point_id, ConnectionStatus::Disconnected);
        } else {
            debug!(
                charge_point_id,
                connection_id = connection.connection_id(),
                "Superseded connection closed"
            );
        }
        evicted
    }

    /// Send a request to a connected charge point and await its typed reply.
    pub async fn send_request<R: OcppCall>(
        &self,
        charge_point_id: &str,
        request: R,
    ) -> Result<R::Response, RequestError> {
        // Clone out of the map so no shard lock is held across the await.
        let connection = self
            .get(charge_point_id)
            .ok_or_else(|| RequestError::ConnectionUnavailable(charge_point_id.to_string()))?;
        connection.send_request(request).await
    }

    /// Live connection for a charge point, if any.
    pub fn get(&self, charge_point_id: &str) -> Option<Arc<Connection>> {
        self.connections
            .get(charge_point_id)
            .map(|entry| entry.value().clone())
    }

    /// Check if a charge point is currently connected
    pub fn is_connected(&self, charge_point_id: &str) -> bool {
        self.connections.contains_key(charge_point_id)
    }

    /// Get all connected charge point IDs
    pub fn connected_ids(&self) -> Vec<String> {
        self.connections.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of live connections
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Close every live connection, reporting each as disconnected.
    pub fn close_all(&self) {
        let connections: Vec<Arc<Connection>> =
            self.connections.iter().map(|r| r.value().clone()).collect();
        info!(count = connections.len(), "Closing all charge point connections");
        for connection in connections {
            self.on_disconnect(&connection);
        }
    }

    fn notify(&self, charge_point_id: &str, status: ConnectionStatus) {
        // Snapshot so no lock is held while listeners run.
        let listeners: Vec<ConnectionListener> = self.listeners.read().clone();
        for listener in listeners {
            listener(charge_point_id, status);
        }
    }

    fn update_gauge(&self) {
        metrics::gauge!("ocpp_connections_active").set(self.connections.len() as f64);
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::application::session::testing::{
        heartbeat, recv_frame, MemoryTransport, RecordingHandler,
    };
    use crate::domain::ocpp::{ActionName, ChargePointResponse};
    use crate::support::ocpp_frame::OcppFrame;

    type Events = Arc<Mutex<Vec<(String, ConnectionStatus)>>>;

    fn make_registry() -> (SharedConnectionRegistry, Arc<RecordingHandler>, Events) {
        let handler = Arc::new(RecordingHandler::default());
        let registry = ConnectionRegistry::shared(handler.clone(), RegistryOptions::default());
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        registry.add_connection_listener(move |id, status| {
            sink.lock().push((id.to_string(), status));
        });
        (registry, handler, events)
    }

    fn event(id: &str, status: ConnectionStatus) -> (String, ConnectionStatus) {
        (id.to_string(), status)
    }

    #[test]
    fn identity_is_last_path_segment() {
        assert_eq!(charge_point_identity("/ocpp/CP1"), Some("CP1"));
        assert_eq!(charge_point_identity("/CP-42"), Some("CP-42"));
        assert_eq!(charge_point_identity("/ocpp/CP1?token=abc"), Some("CP1"));
        assert_eq!(charge_point_identity("CP1"), Some("CP1"));
        assert_eq!(charge_point_identity("/ocpp/"), None);
        assert_eq!(charge_point_identity("/"), None);
        assert_eq!(charge_point_identity(""), None);
    }

    #[test]
    fn status_display() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "disconnected");
    }

    #[tokio::test]
    async fn accept_then_disconnect_notifies_in_order() {
        let (registry, _, events) = make_registry();
        let (transport, _rx) = MemoryTransport::new(Some("ocpp1.6"));

        let conn = registry.accept_connection(transport.clone(), "/ocpp/CP1").unwrap();
        assert!(registry.is_connected("CP1"));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.connected_ids(), vec!["CP1".to_string()]);

        assert!(registry.on_disconnect(&conn));
        assert!(!registry.is_connected("CP1"));
        assert!(transport.is_closed());
        assert_eq!(
            *events.lock(),
            vec![
                event("CP1", ConnectionStatus::Connected),
                event("CP1", ConnectionStatus::Disconnected),
            ]
        );
    }

    #[tokio::test]
    async fn listeners_run_in_registration_order() {
        let (registry, _, _) = make_registry();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = order.clone();
            registry.add_connection_listener(move |_, _| order.lock().push(tag));
        }
        let (transport, _rx) = MemoryTransport::new(Some("ocpp1.6"));
        registry.accept_connection(transport, "/CP1").unwrap();

        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn listener_may_register_another_listener() {
        let (registry, _, events) = make_registry();
        let weak = Arc::downgrade(&registry);
        let sink = events.clone();
        registry.add_connection_listener(move |id, status| {
            if status != ConnectionStatus::Connected || id != "CP1" {
                return;
            }
            if let Some(registry) = weak.upgrade() {
                let sink = sink.clone();
                registry.add_connection_listener(move |id, status| {
                    sink.lock().push((format!("late:{}", id), status));
                });
            }
        });

        let (t1, _rx1) = MemoryTransport::new(Some("ocpp1.6"));
        registry.accept_connection(t1, "/CP1").unwrap();
        let (t2, _rx2) = MemoryTransport::new(Some("ocpp1.6"));
        registry.accept_connection(t2, "/CP2").unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                event("CP1", ConnectionStatus::Connected),
                event("CP2", ConnectionStatus::Connected),
                event("late:CP2", ConnectionStatus::Connected),
            ]
        );
    }

    #[tokio::test]
    async fn connection_without_identity_is_refused() {
        let (registry, _, events) = make_registry();
        let (transport, _rx) = MemoryTransport::new(Some("ocpp1.6"));

        let result = registry.accept_connection(transport.clone(), "/ocpp/");

        assert_eq!(
            result.unwrap_err(),
            AcceptError::MissingIdentity("/ocpp/".into())
        );
        assert!(transport.is_closed());
        assert_eq!(registry.count(), 0);
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn unsupported_subprotocol_is_refused() {
        let (registry, _, events) = make_registry();

        let (transport, _rx) = MemoryTransport::new(Some("ocpp2.0.1"));
        assert_eq!(
            registry
                .accept_connection(transport.clone(), "/CP1")
                .unwrap_err(),
            AcceptError::UnsupportedProtocol(Some("ocpp2.0.1".into()))
        );
        assert!(transport.is_closed());

        let (transport, _rx) = MemoryTransport::new(None);
        assert_eq!(
            registry.accept_connection(transport, "/CP1").unwrap_err(),
            AcceptError::UnsupportedProtocol(None)
        );

        assert!(!registry.is_connected("CP1"));
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn send_to_unknown_charge_point_is_unavailable() {
        let (registry, _, _) = make_registry();
        let (transport, mut rx) = MemoryTransport::new(Some("ocpp1.6"));
        registry.accept_connection(transport, "/CP1").unwrap();

        let result = registry.send_request("CP2", heartbeat()).await;

        assert!(matches!(
            result,
            Err(RequestError::ConnectionUnavailable(ref id)) if id == "CP2"
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_request_is_routed_to_the_connection() {
        let (registry, _, _) = make_registry();
        let (transport, mut rx) = MemoryTransport::new(Some("ocpp1.6"));
        let conn = registry.accept_connection(transport, "/CP1").unwrap();

        let task = tokio::spawn({
            let registry = registry.clone();
            async move { registry.send_request("CP1", heartbeat()).await }
        });

        let id = match recv_frame(&mut rx).await {
            OcppFrame::Call {
                unique_id, action, ..
            } => {
                assert_eq!(action, "Heartbeat");
                unique_id
            }
            other => panic!("Expected Call frame, got {:?}", other),
        };
        conn.handle_incoming_data(&format!(
            r#"[3,"{}",{{"currentTime":"2024-01-01T00:00:00Z"}}]"#,
            id
        ));

        assert!(matches!(
            task.await.unwrap(),
            Ok(ChargePointResponse::Heartbeat(_))
        ));
    }

    #[tokio::test]
    async fn inbound_calls_carry_the_connection_identity() {
        let (registry, handler, _) = make_registry();
        let (transport, mut rx) = MemoryTransport::new(Some("ocpp1.6"));
        let conn = registry.accept_connection(transport, "/ocpp/CP7").unwrap();

        conn.handle_incoming_data(
            &json!([2, "1", "StatusNotification", {
                "connectorId": 1,
                "errorCode": "NoError",
                "status": "Available"
            }])
            .to_string(),
        );

        assert_eq!(
            recv_frame(&mut rx).await,
            OcppFrame::CallResult {
                unique_id: "1".into(),
                payload: json!({}),
            }
        );
        assert_eq!(
            handler.calls(),
            vec![(ActionName::StatusNotification, "CP7".to_string())]
        );
    }

    #[tokio::test]
    async fn reconnect_supersedes_previous_connection() {
        let (registry, _, events) = make_registry();

        let (old_transport, mut old_rx) = MemoryTransport::new(Some("ocpp1.6"));
        let old = registry.accept_connection(old_transport.clone(), "/CP1").unwrap();
        let outstanding = tokio::spawn({
            let old = old.clone();
            async move { old.send_request(heartbeat()).await }
        });
        recv_frame(&mut old_rx).await;

        let (new_transport, _new_rx) = MemoryTransport::new(Some("ocpp1.6"));
        let new = registry.accept_connection(new_transport.clone(), "/CP1").unwrap();

        assert!(old.is_closed());
        assert!(old_transport.is_closed());
        assert!(matches!(
            outstanding.await.unwrap(),
            Err(RequestError::ConnectionClosed(_))
        ));

        // The stale socket's close arrives late and must not evict the new one.
        assert!(!registry.on_disconnect(&old));
        assert!(registry.is_connected("CP1"));
        assert_eq!(
            registry.get("CP1").map(|c| c.connection_id()),
            Some(new.connection_id())
        );
        assert!(!new_transport.is_closed());

        assert!(registry.on_disconnect(&new));
        assert_eq!(
            *events.lock(),
            vec![
                event("CP1", ConnectionStatus::Connected),
                event("CP1", ConnectionStatus::Connected),
                event("CP1", ConnectionStatus::Disconnected),
            ]
        );
    }

    #[tokio::test]
    async fn close_all_disconnects_everyone() {
        let (registry, _, events) = make_registry();
        let (t1, _rx1) = MemoryTransport::new(Some("ocpp1.6"));
        let (t2, _rx2) = MemoryTransport::new(Some("ocpp1.6"));
        let c1 = registry.accept_connection(t1.clone(), "/CP1").unwrap();
        registry.accept_connection(t2.clone(), "/CP2").unwrap();

        registry.close_all();

        assert_eq!(registry.count(), 0);
        assert!(t1.is_closed() && t2.is_closed());
        assert_eq!(
            events
                .lock()
                .iter()
                .filter(|(_, s)| *s == ConnectionStatus::Disconnected)
                .count(),
            2
        );

        // The socket driver reporting the close afterwards is a no-op.
        assert!(!registry.on_disconnect(&c1));
    }
}
