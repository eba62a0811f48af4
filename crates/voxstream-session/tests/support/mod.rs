//! Scripted in-process Live server for end-to-end session tests

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use voxstream_transport::TransportConfig;

pub type ServerWs = WebSocketStream<TcpStream>;

pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

pub async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

pub fn transport_config(url: &str) -> TransportConfig {
    TransportConfig::new(url, "test-key")
}

/// Read the setup envelope, acknowledge it, and hand back its raw bytes
/// so tests can assert replay equality.
pub async fn ack_setup(ws: &mut ServerWs) -> String {
    let setup = next_text(ws).await;
    assert!(setup.starts_with(r#"{"setup":"#), "unexpected first frame: {setup}");
    send_json(ws, &serde_json::json!({"setupComplete": {}})).await;
    setup
}

/// Next text frame from the client, skipping control frames.
pub async fn next_text(ws: &mut ServerWs) -> String {
    loop {
        let message = ws
            .next()
            .await
            .expect("client disconnected")
            .expect("client stream error");
        match message {
            Message::Text(text) => return text.to_string(),
            Message::Close(_) => panic!("client closed before expected frame"),
            _ => continue,
        }
    }
}

pub async fn next_json(ws: &mut ServerWs) -> serde_json::Value {
    serde_json::from_str(&next_text(ws).await).unwrap()
}

pub async fn send_json(ws: &mut ServerWs, value: &serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Drain the client until it closes, keeping the socket alive meanwhile.
pub async fn drain(mut ws: ServerWs) {
    while let Some(Ok(_)) = ws.next().await {}
}
