//! CDP client - the connection-level layer.
//!
//! One WebSocket per browser. Commands are matched to responses by ID
//! through a lock-free pending map; events are fanned out on a broadcast
//! channel so waiters can subscribe before triggering the action that
//! produces them. No retries, no queueing - callers decide.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::protocol::*;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Commands that take longer than this against a local browser indicate a
/// wedged target, not a slow one.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum CdpError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CDP protocol error: {code} - {message}")]
    Protocol { code: i32, message: String },

    #[error("no response to {method} within {timeout:?}")]
    CommandTimeout { method: String, timeout: Duration },

    #[error("connection closed")]
    Closed,
}

/// Result type for CDP operations.
pub type Result<T> = std::result::Result<T, CdpError>;

/// Connection to one browser's debug WebSocket.
pub struct CdpClient {
    /// Monotonic request ID counter.
    next_id: AtomicU64,

    /// Requests awaiting a response, keyed by request ID.
    pending: Arc<DashMap<RequestId, oneshot::Sender<CdpResponse>>>,

    /// Event fan-out. Senders with no receivers are fine.
    events: broadcast::Sender<CdpEvent>,

    /// Write half of the WebSocket.
    sink: Mutex<WsSink>,
}

impl CdpClient {
    /// Connect to a browser debug WebSocket and start the reader task.
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (sink, mut stream) = ws_stream.split();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let client = Arc::new(Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
            events,
            sink: Mutex::new(sink),
        });

        let reader = Arc::clone(&client);
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => reader.route(&text),
                    Ok(Message::Close(_)) => {
                        tracing::info!("browser closed the debug WebSocket");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("debug WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            // Dropping the senders wakes every in-flight call with Closed.
            reader.pending.clear();
        });

        Ok(client)
    }

    /// Send a command and wait for its response.
    ///
    /// `session_id` scopes the command to an attached target; `None` goes to
    /// the browser endpoint itself.
    pub async fn send(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        session_id: Option<SessionId>,
    ) -> Result<Value> {
        let method = method.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.clone(),
            params,
            session_id,
        };

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let json = serde_json::to_string(&request)?;
        {
            let mut sink = self.sink.lock().await;
            sink.send(Message::Text(json)).await?;
        }

        let response = match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(CdpError::Closed),
            Err(_) => {
                self.pending.remove(&id);
                return Err(CdpError::CommandTimeout {
                    method,
                    timeout: COMMAND_TIMEOUT,
                });
            }
        };

        if let Some(error) = response.error {
            return Err(CdpError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Subscribe to the event stream.
    ///
    /// Subscribe *before* sending the command whose event you wait for, or
    /// the event can slip past.
    pub fn events(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }

    fn route(&self, text: &str) {
        let msg: CdpMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("unparseable CDP frame: {}", e);
                return;
            }
        };

        match msg {
            CdpMessage::Response(response) => {
                if let Some((_, tx)) = self.pending.remove(&response.id) {
                    let _ = tx.send(response); // Receiver may have timed out.
                } else {
                    tracing::warn!("response for unknown request {}", response.id);
                }
            }
            CdpMessage::Event(event) => {
                let _ = self.events.send(event); // No subscribers is normal.
            }
        }
    }

    /// Close the connection. The browser keeps running; only our debug
    /// attachment goes away.
    pub async fn close(&self) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The full request/response path needs a live browser.

    #[tokio::test]
    #[ignore]
    async fn connect_and_get_version() {
        let client = CdpClient::connect("ws://localhost:9222/devtools/browser")
            .await
            .unwrap();

        let version = client.send("Browser.getVersion", None, None).await.unwrap();
        assert!(version.get("product").is_some());

        client.close().await.unwrap();
    }
}
