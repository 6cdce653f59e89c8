//! Browser attachment and page acquisition.
//!
//! Attaching to an already-running browser means continuing whatever the
//! human left behind: reuse the first open tab when one exists, never
//! manufacture a second browsing context when one is already there. Fresh
//! contexts and tabs are created only when the browser has none.

use std::sync::Arc;

use serde_json::json;

use crate::cdp::client::CdpClient;
use crate::cdp::protocol::{GetTargetsResult, TargetId, TargetInfo};
use crate::error::{BrowserError, Result};
use crate::page::Page;

/// An attached connection to one running browser instance.
pub struct Browser {
    client: Arc<CdpClient>,
}

impl Browser {
    /// Connect to a resolved WebSocket debugger URL.
    ///
    /// Transport or handshake failure here is fatal to the run.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let client = CdpClient::connect(ws_url)
            .await
            .map_err(BrowserError::AttachFailed)?;
        Ok(Self { client })
    }

    /// Obtain a page to drive: the first open tab if the browser has one,
    /// otherwise a new tab in an existing (or, failing that, new) context.
    pub async fn attach_page(&self) -> Result<Page> {
        let pages = self.page_targets().await?;
        if let Some(first) = pages.first() {
            tracing::debug!(url = %first.url, "reusing first open tab");
            return Ok(Page::attach(Arc::clone(&self.client), first.target_id.clone()).await?);
        }

        let context_id = self.resolve_context().await?;
        let target_id = self.create_target(context_id).await?;
        Ok(Page::attach(Arc::clone(&self.client), target_id).await?)
    }

    /// Open a fresh tab in the same context as the current first tab.
    ///
    /// Used when a second page must not share emulation state with the
    /// first one.
    pub async fn new_page(&self) -> Result<Page> {
        let context_id = self
            .page_targets()
            .await?
            .first()
            .and_then(|t| t.browser_context_id.clone());
        let target_id = self.create_target(context_id).await?;
        Ok(Page::attach(Arc::clone(&self.client), target_id).await?)
    }

    /// Detach from the browser. The process keeps running.
    pub async fn close(&self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }

    async fn page_targets(&self) -> Result<Vec<TargetInfo>> {
        let result = self.client.send("Target.getTargets", None, None).await?;
        let targets: GetTargetsResult =
            serde_json::from_value(result).map_err(crate::cdp::CdpError::Json)?;
        Ok(targets
            .target_infos
            .into_iter()
            .filter(|t| t.target_type == "page" && !t.url.starts_with("devtools://"))
            .collect())
    }

    /// First existing browsing context, or a newly created one when the
    /// browser exposes none.
    async fn resolve_context(&self) -> Result<Option<String>> {
        let result = self
            .client
            .send("Target.getBrowserContexts", None, None)
            .await?;
        if let Some(id) = result["browserContextIds"]
            .as_array()
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_str())
        {
            return Ok(Some(id.to_string()));
        }

        let created = self
            .client
            .send("Target.createBrowserContext", None, None)
            .await?;
        Ok(created["browserContextId"].as_str().map(str::to_string))
    }

    async fn create_target(&self, context_id: Option<String>) -> Result<TargetId> {
        let mut params = json!({ "url": "about:blank" });
        if let Some(id) = context_id {
            params["browserContextId"] = json!(id);
        }
        let result = self
            .client
            .send("Target.createTarget", Some(params), None)
            .await?;
        result["targetId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                BrowserError::Cdp(crate::cdp::CdpError::Protocol {
                    code: -32001,
                    message: "createTarget returned no targetId".to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore]
    async fn attach_reuses_open_tab() {
        let browser = Browser::connect("ws://localhost:9222/devtools/browser")
            .await
            .unwrap();

        let page = browser.attach_page().await.unwrap();
        let url = page.url().await.unwrap();
        println!("driving tab at: {url}");

        browser.close().await.unwrap();
    }
}
