//! Debug endpoint resolver.
//!
//! A freshly launched browser takes a moment before `/json/version` starts
//! answering with a `webSocketDebuggerUrl`, so we poll at a fixed short
//! interval until it does or the deadline passes. Expiry is fatal for the
//! run - there is nothing to drive without an endpoint.

use std::time::Duration;

use crate::cdp::protocol::VersionInfo;
use crate::error::{BrowserError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A resolved, connectable debug endpoint. Valid only while the browser
/// process that advertised it is alive; never persisted.
#[derive(Debug, Clone)]
pub struct DebugEndpoint {
    pub host: String,
    pub port: u16,
    pub ws_url: String,
}

/// Poll `http://{host}:{port}/json/version` until it advertises a WebSocket
/// debugger URL or `timeout` elapses.
pub async fn resolve(host: &str, port: u16, timeout: Duration) -> Result<DebugEndpoint> {
    // Localhost introspection must not go through a configured proxy.
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| BrowserError::EndpointUnavailable {
            waited: Duration::ZERO,
            last_error: e.to_string(),
        })?;

    let url = format!("http://{host}:{port}/json/version");
    let deadline = tokio::time::Instant::now() + timeout;
    let mut last_error = String::from("no probe attempted");

    loop {
        match probe(&client, &url).await {
            Ok(ws_url) => {
                tracing::debug!(%ws_url, "debug endpoint ready");
                return Ok(DebugEndpoint {
                    host: host.to_string(),
                    port,
                    ws_url,
                });
            }
            Err(e) => last_error = e,
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(BrowserError::EndpointUnavailable {
                waited: timeout,
                last_error,
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn probe(client: &reqwest::Client, url: &str) -> std::result::Result<String, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    let info: VersionInfo = response.json().await.map_err(|e| e.to_string())?;
    match info.web_socket_debugger_url {
        Some(ws) if !ws.is_empty() => Ok(ws),
        _ => Err("no webSocketDebuggerUrl advertised yet".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_version(listener: TcpListener, body: &'static str) {
        // Answer every probe with the same canned document.
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        }
    }

    #[tokio::test]
    async fn resolves_advertised_ws_url() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let body = r#"{"Browser":"Edg/120.0","webSocketDebuggerUrl":"ws://127.0.0.1:9222/devtools/browser/abc"}"#;
        tokio::spawn(serve_version(listener, body));

        let endpoint = resolve("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(endpoint.ws_url, "ws://127.0.0.1:9222/devtools/browser/abc");
        assert_eq!(endpoint.port, port);
    }

    #[tokio::test]
    async fn dead_port_times_out_with_last_error() {
        // Bind then drop so the port is known-closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = resolve("127.0.0.1", port, Duration::from_millis(300))
            .await
            .unwrap_err();
        match err {
            BrowserError::EndpointUnavailable { last_error, .. } => {
                assert!(!last_error.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_ws_url_keeps_polling_until_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let body = r#"{"Browser":"Edg/120.0"}"#;
        tokio::spawn(serve_version(listener, body));

        let err = resolve("127.0.0.1", port, Duration::from_millis(300))
            .await
            .unwrap_err();
        match err {
            BrowserError::EndpointUnavailable { last_error, .. } => {
                assert!(last_error.contains("webSocketDebuggerUrl"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
