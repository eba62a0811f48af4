//! Managed WebSocket connection
//!
//! One duplex text-frame connection with serialized sends, a per-message
//! read deadline, and an idempotent close. The handle is shared between the
//! caller's send path and the session's receive loop.

use crate::error::TransportError;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use http::HeaderValue;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

/// Credentials travel in this handshake header, never in the URL.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Long enough to survive normal conversational silences, short enough to
/// detect a half-open connection.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket endpoint URL.
    pub url: String,

    /// Opaque API key, sent via [`API_KEY_HEADER`].
    pub api_key: String,

    /// Dial timeout covering TCP connect, TLS, and the HTTP upgrade.
    pub connect_timeout: Duration,

    /// Per-message read deadline.
    pub read_timeout: Duration,
}

impl TransportConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// An opened duplex connection.
pub struct Transport {
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
    read_timeout: Duration,
    closed: AtomicBool,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("read_timeout", &self.read_timeout)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Transport {
    /// Dial the endpoint and complete the WebSocket handshake.
    #[instrument(skip(config), fields(url = %config.url))]
    pub async fn connect(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut request = config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Dial(e.to_string()))?;
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| TransportError::Dial("API key is not a valid header value".to_string()))?;
        request.headers_mut().insert(API_KEY_HEADER, api_key);

        let (stream, response) =
            match tokio::time::timeout(config.connect_timeout, connect_async(request)).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(err)) => return Err(classify_handshake(err)),
                Err(_) => return Err(TransportError::DialTimeout(config.connect_timeout)),
            };

        debug!(status = %response.status(), "websocket connected");
        let (writer, reader) = stream.split();
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            read_timeout: config.read_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Serialize `message` to JSON and write it as one text frame.
    ///
    /// Sends are serialized: at most one in-flight write at a time.
    pub async fn send<T: Serialize>(&self, message: &T) -> Result<(), TransportError> {
        let frame = serde_json::to_string(message)?;
        self.send_raw(frame).await
    }

    /// Write an already-serialized frame verbatim. The setup replay path
    /// uses this so reconnects put byte-identical setup bytes on the wire.
    pub async fn send_raw(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::AlreadyClosed);
        }
        let frame = frame.into();
        trace!(bytes = frame.len(), "sending text frame");

        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Text(frame.into()))
            .await
            .map_err(map_ws_error)
    }

    /// Read the next JSON text frame, honoring the read deadline and the
    /// caller's cancellation signal. Pings are answered transparently;
    /// binary frames are ignored.
    pub async fn receive(
        &self,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, TransportError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Canceled),
            result = self.next_json() => result,
        }
    }

    async fn next_json(&self) -> Result<serde_json::Value, TransportError> {
        let deadline = tokio::time::Instant::now() + self.read_timeout;
        let mut reader = self.reader.lock().await;

        loop {
            let frame = match tokio::time::timeout_at(deadline, reader.next()).await {
                Ok(frame) => frame,
                Err(_) => return Err(TransportError::ReadTimeout(self.read_timeout)),
            };

            match frame {
                None => {
                    return Err(TransportError::Closed {
                        code: None,
                        reason: "end of stream".to_string(),
                    });
                }
                Some(Ok(Message::Text(text))) => {
                    trace!(bytes = text.len(), "received text frame");
                    return serde_json::from_str(text.as_str()).map_err(TransportError::Frame);
                }
                Some(Ok(Message::Ping(payload))) => {
                    trace!("answering ping");
                    let mut writer = self.writer.lock().await;
                    let _ = writer.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => (None, String::new()),
                    };
                    debug!(?code, %reason, "peer closed connection");
                    return Err(TransportError::Closed { code, reason });
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(map_ws_error(err)),
            }
        }
    }

    /// Idempotent close: a best-effort close frame, then the connection is
    /// considered gone. Safe to call from any task.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("closing transport");
        let mut writer = self.writer.lock().await;
        let _ = writer.send(Message::Close(None)).await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn classify_handshake(err: WsError) -> TransportError {
    match err {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if status == 401 || status == 403 {
                TransportError::Unauthorized { status }
            } else if status == 429 {
                let retry_after_secs = response
                    .headers()
                    .get(http::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse().ok());
                TransportError::RateLimited { retry_after_secs }
            } else {
                TransportError::Handshake { status }
            }
        }
        WsError::Io(err) => TransportError::Io(err),
        other => TransportError::Dial(other.to_string()),
    }
}

fn map_ws_error(err: WsError) -> TransportError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed {
            code: None,
            reason: "connection already closed".to_string(),
        },
        WsError::Io(err) => TransportError::Io(err),
        other => TransportError::WebSocket(other.to_string()),
    }
}
