use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub async fn connect(url: &str) -> WsStream {
    let (stream, _response) = tokio_tungstenite::connect_async(url)
        .await
        .expect("failed to open signaling websocket");
    stream
}

pub async fn send_json(stream: &mut WsStream, value: Value) {
    stream
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("failed to send frame");
}

/// Waits up to `timeout` for the next text frame and parses it as JSON.
pub async fn recv_json(stream: &mut WsStream, timeout: Duration) -> Option<Value> {
    let frame = tokio::time::timeout(timeout, stream.next()).await.ok()??;
    match frame.ok()? {
        Message::Text(text) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

/// Waits up to `timeout` for the socket to report a clean close (or EOF),
/// returning the close code if one was sent.
pub async fn recv_close(stream: &mut WsStream, timeout: Duration) -> Option<u16> {
    loop {
        let frame = tokio::time::timeout(timeout, stream.next()).await.ok()??;
        match frame.ok()? {
            Message::Close(Some(frame)) => return Some(frame.code.into()),
            Message::Close(None) => return None,
            _ => continue,
        }
    }
}
