//! OCPP-J WebSocket server
//!
//! Accepts charge point connections at `ws://<host>:<port>/<any prefix>/{charge_point_id}`
//! and hands each upgraded socket to the [`ConnectionRegistry`](crate::application::session::ConnectionRegistry).

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::application::ports::Transport;
use crate::application::session::SharedConnectionRegistry;
use crate::support::errors::TransportError;
use crate::support::shutdown::ShutdownSignal;

use super::negotiator::ProtocolNegotiator;

/// Outbound half of an upgraded WebSocket, fed through the writer task.
struct WsTransport {
    sender: mpsc::UnboundedSender<Message>,
    subprotocol: Option<String>,
    closed: AtomicBool,
}

impl Transport for WsTransport {
    fn send(&self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sender
            .send(Message::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.sender.send(Message::Close(None));
        }
    }

    fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }
}

/// OCPP WebSocket Server
pub struct OcppServer {
    listener: TcpListener,
    registry: SharedConnectionRegistry,
    negotiator: Arc<ProtocolNegotiator>,
    shutdown_signal: Option<ShutdownSignal>,
}

impl OcppServer {
    /// Bind the listening socket. Port `0` picks an ephemeral port.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        registry: SharedConnectionRegistry,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let negotiator = Arc::new(ProtocolNegotiator::new(
            registry.supported_protocols().to_vec(),
        ));

        Ok(Self {
            listener,
            registry,
            negotiator,
            shutdown_signal: None,
        })
    }

    /// Set the shutdown signal for graceful shutdown
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown_signal = Some(signal);
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the shutdown signal fires.
    pub async fn run(self) -> io::Result<()> {
        let addr = self.listener.local_addr()?;
        info!(
            subprotocols = ?self.negotiator.supported_subprotocols(),
            "OCPP Central System listening on ws://{}",
            addr
        );
        info!(
            "   Charge points should connect to: ws://{}/ocpp/{{charge_point_id}}",
            addr
        );

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr),
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                }
                _ = shutdown_requested(&self.shutdown_signal) => {
                    info!("WebSocket server received shutdown signal");
                    self.registry.close_all();
                    info!("WebSocket server shutdown complete");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let registry = self.registry.clone();
        let negotiator = self.negotiator.clone();
        let shutdown = self.shutdown_signal.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, registry, negotiator, shutdown).await {
                warn!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

async fn shutdown_requested(signal: &Option<ShutdownSignal>) {
    match signal {
        Some(signal) => signal.wait().await,
        None => std::future::pending().await,
    }
}

/// Handle a single WebSocket connection from handshake to teardown.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: SharedConnectionRegistry,
    negotiator: Arc<ProtocolNegotiator>,
    shutdown: Option<ShutdownSignal>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    debug!("New TCP connection from: {}", addr);

    let mut path = String::new();
    let mut subprotocol: Option<String> = None;

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            path = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default();

            let requested = req
                .headers()
                .get(SEC_WEBSOCKET_PROTOCOL)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            match negotiator.negotiate(requested) {
                Some(protocol) => {
                    if let Ok(value) = protocol.parse() {
                        response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                        subprotocol = Some(protocol.to_string());
                    }
                }
                None => warn!(%addr, requested, "No supported subprotocol offered"),
            }

            info!(%addr, path = path.as_str(), ?subprotocol, "WebSocket handshake");
            Ok(response)
        },
    )
    .await?;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Outgoing message writer task
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let is_close = matches!(msg, Message::Close(_));
            if let Err(e) = ws_sender.send(msg).await {
                debug!("Send error: {}", e);
                break;
            }
            if is_close {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let transport = Arc::new(WsTransport {
        sender: tx,
        subprotocol,
        closed: AtomicBool::new(false),
    });

    let connection = match registry.accept_connection(transport, &path) {
        Ok(connection) => connection,
        Err(e) => {
            warn!(%addr, error = %e, "Connection refused");
            let _ = writer.await;
            return Ok(());
        }
    };
    let charge_point_id = connection.charge_point_id().to_string();

    let mut writer_done = false;
    loop {
        tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    debug!("[{}] <- {}", charge_point_id, text);
                    connection.handle_incoming_data(&text);
                }
                Some(Ok(Message::Binary(data))) => {
                    warn!(
                        "[{}] Binary message received ({} bytes), ignoring",
                        charge_point_id,
                        data.len()
                    );
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("[{}] Close frame received: {:?}", charge_point_id, frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("[{}] WebSocket error: {}", charge_point_id, e);
                    break;
                }
                None => break,
            },
            _ = &mut writer => {
                writer_done = true;
                break;
            }
            _ = shutdown_requested(&shutdown) => {
                info!("[{}] Connection closing due to server shutdown", charge_point_id);
                break;
            }
        }
    }

    // Cleanup
    registry.on_disconnect(&connection);
    if !writer_done {
        let _ = writer.await;
    }

    info!("[{}] Socket from {} finished", charge_point_id, addr);
    Ok(())
}
