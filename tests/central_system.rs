//! End-to-end: a tokio-tungstenite client talking to a live `OcppServer`.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use ocpp_central::application::handlers::AcceptAllHandler;
use ocpp_central::{
    ActionName, CentralSystemRequest, ConnectionRegistry, ConnectionStatus, OcppServer,
    RegistryOptions, RequestError, SharedConnectionRegistry, ShutdownSignal,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Events = Arc<Mutex<Vec<(String, ConnectionStatus)>>>;

struct Harness {
    addr: std::net::SocketAddr,
    registry: SharedConnectionRegistry,
    events: Events,
    shutdown: ShutdownSignal,
}

async fn start_server() -> Harness {
    let registry = ConnectionRegistry::shared(
        Arc::new(AcceptAllHandler::new()),
        RegistryOptions {
            supported_protocols: vec!["ocpp1.6".to_string()],
            response_timeout: Duration::from_secs(5),
        },
    );
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    registry.add_connection_listener(move |id, status| sink.lock().push((id.to_string(), status)));

    let shutdown = ShutdownSignal::new();
    let server = OcppServer::bind("127.0.0.1:0", registry.clone())
        .await
        .unwrap()
        .with_shutdown(shutdown.clone());
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());

    Harness {
        addr,
        registry,
        events,
        shutdown,
    }
}

async fn connect(addr: std::net::SocketAddr, path: &str) -> Client {
    let mut request = format!("ws://{}{}", addr, path).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("ocpp1.6"));
    let (ws, response) = tokio_tungstenite::connect_async(request).await.unwrap();
    assert_eq!(
        response.headers().get("Sec-WebSocket-Protocol").unwrap(),
        "ocpp1.6"
    );
    ws
}

async fn next_json(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no message in time")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Reads until the server closes the socket.
async fn expect_closed(ws: &mut Client) {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("socket not closed in time")
        {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => {}
        }
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn charge_point_session_round_trip() {
    let harness = start_server().await;
    let mut ws = connect(harness.addr, "/ocpp/CP1").await;
    wait_until(|| harness.registry.is_connected("CP1")).await;

    // Inbound call answered by the handler.
    ws.send(Message::Text(r#"[2,"1","Heartbeat",{}]"#.into()))
        .await
        .unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply[0], 3);
    assert_eq!(reply[1], "1");
    assert!(reply[2]["currentTime"].is_string());

    // Unknown action is refused without closing the session.
    ws.send(Message::Text(r#"[2,"2","FooBar",{}]"#.into()))
        .await
        .unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply, json!([4, "2", "NotImplemented", reply[3].clone(), {}]));

    // Outbound call correlated with the charge point's reply.
    let request =
        CentralSystemRequest::decode(ActionName::Reset, json!({"type": "Soft"})).unwrap();
    let outbound = tokio::spawn({
        let registry = harness.registry.clone();
        async move { registry.send_request("CP1", request).await }
    });
    let call = next_json(&mut ws).await;
    assert_eq!(call[0], 2);
    assert_eq!(call[2], "Reset");
    assert_eq!(call[3], json!({"type": "Soft"}));
    let id = call[1].as_str().unwrap().to_string();
    ws.send(Message::Text(json!([3, id, {"status": "Accepted"}]).to_string()))
        .await
        .unwrap();

    let response = outbound.await.unwrap().unwrap();
    assert_eq!(response.action(), ActionName::Reset);
    assert_eq!(response.to_payload().unwrap(), json!({"status": "Accepted"}));

    // Charge point hangs up.
    ws.close(None).await.unwrap();
    wait_until(|| !harness.registry.is_connected("CP1")).await;
    assert_eq!(
        *harness.events.lock(),
        vec![
            ("CP1".to_string(), ConnectionStatus::Connected),
            ("CP1".to_string(), ConnectionStatus::Disconnected),
        ]
    );
}

#[tokio::test]
async fn request_to_absent_charge_point_is_unavailable() {
    let harness = start_server().await;
    let request =
        CentralSystemRequest::decode(ActionName::ClearCache, json!({})).unwrap();

    let result = harness.registry.send_request("CP9", request).await;

    assert!(matches!(result, Err(RequestError::ConnectionUnavailable(_))));
}

#[tokio::test]
async fn path_without_identity_is_closed() {
    let harness = start_server().await;
    let mut ws = connect(harness.addr, "/ocpp/").await;

    expect_closed(&mut ws).await;
    assert_eq!(harness.registry.count(), 0);
    assert!(harness.events.lock().is_empty());
}

#[tokio::test]
async fn reconnect_replaces_the_old_socket() {
    let harness = start_server().await;
    let mut first = connect(harness.addr, "/ocpp/CP1").await;
    wait_until(|| harness.registry.count() == 1).await;

    let mut second = connect(harness.addr, "/ocpp/CP1").await;
    expect_closed(&mut first).await;

    // Give the first socket's teardown time to run; it must not evict CP1.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(harness.registry.is_connected("CP1"));

    second
        .send(Message::Text(r#"[2,"1","Heartbeat",{}]"#.into()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut second).await[1], "1");

    let statuses: Vec<ConnectionStatus> =
        harness.events.lock().iter().map(|(_, s)| *s).collect();
    assert_eq!(
        statuses,
        vec![ConnectionStatus::Connected, ConnectionStatus::Connected]
    );
}

#[tokio::test]
async fn shutdown_closes_every_session() {
    let harness = start_server().await;
    let mut ws = connect(harness.addr, "/ocpp/CP1").await;
    wait_until(|| harness.registry.is_connected("CP1")).await;

    harness.shutdown.trigger();

    expect_closed(&mut ws).await;
    wait_until(|| harness.registry.count() == 0).await;
    assert_eq!(
        harness.events.lock().last().cloned(),
        Some(("CP1".to_string(), ConnectionStatus::Disconnected))
    );
}
