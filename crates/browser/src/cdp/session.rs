//! CDP session - command channel to one attached target.
//!
//! Thin wrapper over [`CdpClient`] carrying the `sessionId` of a flattened
//! target attachment. All sessions share the one WebSocket.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::broadcast;

use super::client::{CdpClient, CdpError, Result};
use super::protocol::{AttachToTargetResult, CdpEvent, SessionId, TargetId, TargetInfo};

/// Domains enabled on every page attachment.
const PAGE_DOMAINS: [&str; 3] = ["Page", "Runtime", "DOM"];

/// Session bound to a specific target.
#[derive(Clone)]
pub struct CdpSession {
    client: Arc<CdpClient>,
    pub target_id: TargetId,
    pub session_id: SessionId,
}

impl CdpSession {
    /// Attach to a target in flatten mode and enable the page domains.
    pub async fn attach(client: Arc<CdpClient>, target_id: TargetId) -> Result<Self> {
        let result = client
            .send(
                "Target.attachToTarget",
                Some(json!({ "targetId": target_id, "flatten": true })),
                None,
            )
            .await?;

        let attached: AttachToTargetResult = serde_json::from_value(result)?;
        let session = Self {
            client,
            target_id,
            session_id: attached.session_id,
        };

        // Enable domains in parallel; a partial failure degrades rather than
        // aborts (some embedders reject DOM.enable on special pages).
        let enables = PAGE_DOMAINS.iter().map(|domain| {
            let session = session.clone();
            async move { session.send(format!("{domain}.enable"), None).await }
        });
        let results = futures_util::future::join_all(enables).await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!("{}/{} domain enables failed", failed, results.len());
        }

        Ok(session)
    }

    /// Send a command scoped to this session.
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        self.client
            .send(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Evaluate a JavaScript expression and return its value.
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value> {
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression.into(),
                    "returnByValue": true,
                })),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let message = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .unwrap_or("JavaScript exception")
                .to_string();
            return Err(CdpError::Protocol {
                code: -32000,
                message,
            });
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Start a navigation. Completion is observed via events, not here.
    pub async fn navigate(&self, url: impl Into<String>) -> Result<Value> {
        self.send("Page.navigate", Some(json!({ "url": url.into() })))
            .await
    }

    /// Fresh target info (the URL field is the page's current location).
    pub async fn target_info(&self) -> Result<TargetInfo> {
        let result = self
            .client
            .send(
                "Target.getTargetInfo",
                Some(json!({ "targetId": &self.target_id })),
                None,
            )
            .await?;

        Ok(serde_json::from_value(result["targetInfo"].clone())?)
    }

    /// Subscribe to the connection's event stream.
    pub fn events(&self) -> broadcast::Receiver<CdpEvent> {
        self.client.events()
    }

    /// Wait on an already-subscribed receiver for a session-scoped event.
    ///
    /// Returns `false` on deadline expiry - a soft outcome the caller
    /// interprets, mirroring the bounded-wait discipline used everywhere
    /// else in this crate.
    pub async fn wait_for_event(
        &self,
        rx: &mut broadcast::Receiver<CdpEvent>,
        method: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Ok(event)) => {
                    if event.method == method
                        && event.session_id.as_deref() == Some(self.session_id.as_str())
                    {
                        return Ok(true);
                    }
                }
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::debug!("event receiver lagged, skipped {}", skipped);
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return Err(CdpError::Closed),
                Err(_) => return Ok(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore]
    async fn attach_to_first_page_target() {
        let client = CdpClient::connect("ws://localhost:9222/devtools/browser")
            .await
            .unwrap();

        let targets = client.send("Target.getTargets", None, None).await.unwrap();
        let target_id = targets["targetInfos"]
            .as_array()
            .and_then(|infos| {
                infos
                    .iter()
                    .find(|t| t["type"].as_str() == Some("page"))
                    .and_then(|t| t["targetId"].as_str())
            })
            .expect("no page target")
            .to_string();

        let session = CdpSession::attach(client, target_id).await.unwrap();
        let title = session.evaluate("document.title").await.unwrap();
        println!("attached to: {title}");
    }
}
