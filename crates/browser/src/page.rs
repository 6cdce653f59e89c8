//! Page operations over an attached CDP session.
//!
//! One `Page` = one tab. Everything that waits is a bounded wait: either it
//! returns a [`WaitResult`] the caller interprets, or the bound is generous
//! enough that expiry means the target is wedged.
//!
//! Input goes through the `Input` domain (real mouse/key events) rather than
//! synthetic DOM events, so focus handling and form submission behave the
//! way they do for a human.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};

use crate::cdp::client::{CdpClient, Result};
use crate::cdp::protocol::TargetId;
use crate::cdp::CdpSession;

/// How often visibility polls re-check the DOM.
const VISIBILITY_POLL: Duration = Duration::from_millis(100);

/// Outcome of a bounded element wait. Timeout is data, not an error;
/// callers decide whether absence is tolerable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Visible,
    TimedOut,
}

impl WaitResult {
    pub fn is_visible(self) -> bool {
        matches!(self, WaitResult::Visible)
    }
}

/// A tab within a browsing context.
#[derive(Clone)]
pub struct Page {
    session: CdpSession,
}

impl Page {
    pub(crate) async fn attach(client: Arc<CdpClient>, target_id: TargetId) -> Result<Self> {
        let session = CdpSession::attach(client, target_id).await?;
        Ok(Self { session })
    }

    pub fn session(&self) -> &CdpSession {
        &self.session
    }

    /// The page's current location, fetched fresh from the browser.
    pub async fn url(&self) -> Result<String> {
        Ok(self.session.target_info().await?.url)
    }

    pub async fn bring_to_front(&self) -> Result<()> {
        self.session.send("Page.bringToFront", None).await?;
        Ok(())
    }

    pub async fn reload(&self) -> Result<()> {
        self.session.send("Page.reload", Some(json!({}))).await?;
        Ok(())
    }

    /// Navigate and wait for initial DOM construction.
    ///
    /// The DOM-content event is subscribed before the navigation starts so
    /// it cannot slip past. If it still does not arrive within `timeout`
    /// (cached same-document navigations sometimes skip it), one readiness
    /// probe settles the matter and we proceed.
    pub async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let mut rx = self.session.events();
        self.session.navigate(url).await?;

        let seen = self
            .session
            .wait_for_event(&mut rx, "Page.domContentEventFired", timeout)
            .await?;
        if !seen {
            let state = self.evaluate("document.readyState").await?;
            tracing::debug!(ready_state = ?state, %url, "DOM content event not observed");
        }
        Ok(())
    }

    /// Evaluate an expression and return its value.
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value> {
        self.session.evaluate(expression).await
    }

    /// Whether the first element matching `css` is rendered and visible.
    pub async fn is_visible(&self, css: &str) -> Result<bool> {
        let selector = serde_json::to_string(css)?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                return rect.width > 0 && rect.height > 0
                    && style.visibility !== 'hidden' && style.display !== 'none';
            }})()"#
        );
        Ok(self.evaluate(js).await?.as_bool().unwrap_or(false))
    }

    /// Poll until `css` is visible or `timeout` elapses.
    pub async fn wait_for_selector(&self, css: &str, timeout: Duration) -> Result<WaitResult> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_visible(css).await? {
                return Ok(WaitResult::Visible);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(WaitResult::TimedOut);
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
    }

    /// Viewport-relative center of the first match, scrolled into view.
    /// `None` when nothing matches.
    pub async fn element_center(&self, css: &str) -> Result<Option<(f64, f64)>> {
        let selector = serde_json::to_string(css)?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({selector});
                if (!el) return null;
                el.scrollIntoView({{ behavior: 'instant', block: 'center', inline: 'center' }});
                const rect = el.getBoundingClientRect();
                return {{ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 }};
            }})()"#
        );
        let coords = self.evaluate(js).await?;
        Ok(point_from(&coords))
    }

    /// Real mouse click at viewport coordinates. The move event first, so
    /// the browser updates its hit-test target before the press lands.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.mouse_event("mouseMoved", x, y, "none", 0).await?;
        self.mouse_event("mousePressed", x, y, "left", 1).await?;
        self.mouse_event("mouseReleased", x, y, "left", 1).await?;
        Ok(())
    }

    /// Click the first element matching `css`. Returns `false` when no
    /// element matched.
    pub async fn click(&self, css: &str) -> Result<bool> {
        match self.element_center(css).await? {
            Some((x, y)) => {
                self.click_at(x, y).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Focus the first match. Returns `false` when no element matched.
    pub async fn focus(&self, css: &str) -> Result<bool> {
        let selector = serde_json::to_string(css)?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                el.focus();
                return true;
            }})()"#
        );
        Ok(self.evaluate(js).await?.as_bool().unwrap_or(false))
    }

    /// Clear an input's value and notify listeners.
    pub async fn clear_value(&self, css: &str) -> Result<bool> {
        let selector = serde_json::to_string(css)?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                el.focus();
                el.value = '';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#
        );
        Ok(self.evaluate(js).await?.as_bool().unwrap_or(false))
    }

    /// Type into the focused element, one key event pair per character, with
    /// a uniformly random inter-key delay drawn from `delay_ms`.
    pub async fn type_chars(&self, text: &str, delay_ms: RangeInclusive<u64>) -> Result<()> {
        for ch in text.chars() {
            let key = ch.to_string();
            self.session
                .send(
                    "Input.dispatchKeyEvent",
                    Some(json!({ "type": "keyDown", "text": key })),
                )
                .await?;
            self.session
                .send(
                    "Input.dispatchKeyEvent",
                    Some(json!({ "type": "keyUp", "text": key })),
                )
                .await?;

            let delay = rand::thread_rng().gen_range(delay_ms.clone());
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }

    /// Press Enter in the focused element (submits a focused form input).
    pub async fn press_enter(&self) -> Result<()> {
        self.session
            .send(
                "Input.dispatchKeyEvent",
                Some(json!({
                    "type": "keyDown",
                    "key": "Enter",
                    "code": "Enter",
                    "windowsVirtualKeyCode": 13,
                    "nativeVirtualKeyCode": 13,
                    "text": "\r",
                    "unmodifiedText": "\r",
                })),
            )
            .await?;
        self.session
            .send(
                "Input.dispatchKeyEvent",
                Some(json!({
                    "type": "keyUp",
                    "key": "Enter",
                    "code": "Enter",
                    "windowsVirtualKeyCode": 13,
                    "nativeVirtualKeyCode": 13,
                })),
            )
            .await?;
        Ok(())
    }

    /// Wheel scroll at a fixed in-viewport point.
    pub async fn scroll_wheel(&self, delta_y: f64) -> Result<()> {
        self.session
            .send(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": "mouseWheel",
                    "x": 400.0,
                    "y": 300.0,
                    "deltaX": 0.0,
                    "deltaY": delta_y,
                })),
            )
            .await?;
        Ok(())
    }

    async fn mouse_event(
        &self,
        kind: &str,
        x: f64,
        y: f64,
        button: &str,
        click_count: u32,
    ) -> Result<()> {
        self.session
            .send(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": kind,
                    "x": x,
                    "y": y,
                    "button": button,
                    "clickCount": click_count,
                })),
            )
            .await?;
        Ok(())
    }
}

fn point_from(value: &Value) -> Option<(f64, f64)> {
    let x = value.get("x")?.as_f64()?;
    let y = value.get("y")?.as_f64()?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_extraction() {
        assert_eq!(
            point_from(&json!({ "x": 10.5, "y": 20.0 })),
            Some((10.5, 20.0))
        );
        assert_eq!(point_from(&Value::Null), None);
        assert_eq!(point_from(&json!({ "x": 1.0 })), None);
    }

    #[test]
    fn wait_result_classifies() {
        assert!(WaitResult::Visible.is_visible());
        assert!(!WaitResult::TimedOut.is_visible());
    }
}
