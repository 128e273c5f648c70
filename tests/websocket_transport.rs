//! WebSocket connector against a loopback tungstenite server

use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::time::Duration;
use tavo_sdk::config::ConnectionConfig;
use tavo_sdk::transport::TransportError;
use tavo_sdk::{ConnectionError, ConnectionManager};
use tavo_shared::{codec, Channel, Credentials};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug)]
enum ServerEvent {
    Handshake {
        path: String,
        authorization: Option<String>,
        api_key: Option<String>,
        session_token: Option<String>,
    },
    Text(String),
    Close(Option<u16>),
}

fn header(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Accepts connections, echoes text frames, and reports what it saw
async fn spawn_server(reject_with: Option<u16>) -> (String, mpsc::UnboundedReceiver<ServerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let handshake_tx = tx.clone();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    let _ = handshake_tx.send(ServerEvent::Handshake {
                        path: req.uri().path().to_string(),
                        authorization: header(req, "authorization"),
                        api_key: header(req, "x-api-key"),
                        session_token: header(req, "x-session-token"),
                    });
                    match reject_with {
                        Some(status) => Err(http::Response::builder()
                            .status(status)
                            .body(Some("denied".to_string()))
                            .expect("response")),
                        None => Ok(resp),
                    }
                };

                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    return;
                };

                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(text) => {
                            let text = text.as_str().to_string();
                            let _ = tx.send(ServerEvent::Text(text.clone()));
                            if ws.send(Message::text(text)).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(frame) => {
                            let _ = tx.send(ServerEvent::Close(frame.map(|f| u16::from(f.code))));
                            break;
                        }
                        _ => {}
                    }
                }
            });
        }
    });

    (format!("http://{}", addr), rx)
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("server event in time")
        .expect("server running")
}

fn scan_channel() -> Channel {
    Channel::ScanProgress {
        scan_id: "abc-123".into(),
    }
}

#[tokio::test]
async fn test_handshake_sends_one_auth_header_on_scan_path() {
    let (base, mut events) = spawn_server(None).await;
    let manager = ConnectionManager::websocket(
        base,
        scan_channel(),
        Credentials::api_key("K1").with_bearer_token("T1"),
        ConnectionConfig::default(),
    );

    manager.connect().await.expect("connect");

    match next_event(&mut events).await {
        ServerEvent::Handshake {
            path,
            authorization,
            api_key,
            session_token,
        } => {
            assert_eq!(path, "/api/v1/code/scans/abc-123/progress");
            assert_eq!(authorization.as_deref(), Some("Bearer T1"));
            assert_eq!(api_key, None);
            assert_eq!(session_token, None);
        }
        other => panic!("unexpected event {:?}", other),
    }
    manager.disconnect().await;
}

#[tokio::test]
async fn test_send_and_read_round_trip_through_server() {
    let (base, mut events) = spawn_server(None).await;
    let manager = ConnectionManager::websocket(
        base,
        scan_channel(),
        Credentials::session("S1"),
        ConnectionConfig::default(),
    );
    manager.connect().await.expect("connect");
    let _handshake = next_event(&mut events).await;

    manager
        .send_message("subscribe", json!({ "scan_id": "abc-123" }))
        .await
        .expect("send");

    match next_event(&mut events).await {
        ServerEvent::Text(text) => {
            let msg = codec::decode(text.as_bytes()).expect("envelope");
            assert_eq!(msg.kind, "subscribe");
            assert_eq!(msg.data["scan_id"], "abc-123");
        }
        other => panic!("unexpected event {:?}", other),
    }

    let echoed = timeout(Duration::from_secs(5), manager.read_message())
        .await
        .expect("echo in time")
        .expect("read");
    let msg = codec::decode(&echoed).expect("envelope");
    assert_eq!(msg.kind, "subscribe");

    manager.disconnect().await;
}

#[tokio::test]
async fn test_rejected_handshake_surfaces_status() {
    let (base, _events) = spawn_server(Some(401)).await;
    let manager = ConnectionManager::websocket(
        base,
        Channel::GeneralUpdates,
        Credentials::api_key("bad"),
        ConnectionConfig::default(),
    );

    let err = manager.connect().await.unwrap_err();

    match err {
        ConnectionError::Connect {
            source: TransportError::Rejected { status, .. },
            ..
        } => assert_eq!(status, 401),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_disconnect_sends_normal_close() {
    let (base, mut events) = spawn_server(None).await;
    let manager = ConnectionManager::websocket(
        base,
        Channel::GeneralUpdates,
        Credentials::default(),
        ConnectionConfig::default(),
    );
    manager.connect().await.expect("connect");

    match next_event(&mut events).await {
        ServerEvent::Handshake {
            path,
            authorization,
            api_key,
            session_token,
        } => {
            assert_eq!(path, "/");
            assert!(authorization.is_none() && api_key.is_none() && session_token.is_none());
        }
        other => panic!("unexpected event {:?}", other),
    }

    manager.disconnect().await;

    match next_event(&mut events).await {
        ServerEvent::Close(code) => assert_eq!(code, Some(1000)),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_server_fails_connect() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let manager = ConnectionManager::websocket(
        format!("http://{}", addr),
        Channel::GeneralUpdates,
        Credentials::default(),
        ConnectionConfig::default().with_handshake_timeout(Duration::from_secs(2)),
    );

    let err = manager.connect().await.unwrap_err();
    assert!(matches!(err, ConnectionError::Connect { .. }));
    assert!(!manager.is_connected());
}
