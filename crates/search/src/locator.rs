//! Search surface location.
//!
//! The target site intermittently renders a collapsed search affordance or
//! an extra consent layer depending on viewport and session state, so a
//! single fixed selector wait is not reliable. The fallback chain: probe
//! the combined input selector, then try to expand a collapsed search UI
//! and probe again, then force-navigate to the bare root and probe one last
//! time with the longest bound.
//!
//! Because the combined selector covers several markup variants, "the"
//! search box is the first *visible* match, not the first match in
//! document order.

use std::ops::RangeInclusive;
use std::time::Duration;

use browser::Page;

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::overlay::{self, center_of};

/// A ready-to-use handle to the active search input. Visibility was
/// confirmed at acquisition; each operation re-resolves the first visible
/// match so a re-render between steps does not leave us on a stale node.
pub struct SearchBox<'a> {
    page: &'a Page,
    selector: &'a str,
}

impl<'a> SearchBox<'a> {
    /// Click the input to give it focus.
    pub async fn activate(&self) -> Result<()> {
        let found = self.page.evaluate(first_visible_center_js(self.selector)).await?;
        match center_of(&found) {
            Some((x, y)) => {
                self.page.click_at(x, y).await?;
                Ok(())
            }
            None => Err(SearchError::SearchBoxUnavailable {
                url: self.page.url().await.unwrap_or_default(),
            }),
        }
    }

    /// Clear any existing text.
    pub async fn clear(&self) -> Result<()> {
        self.page
            .evaluate(focus_and_clear_js(self.selector))
            .await?;
        Ok(())
    }

    /// Type the query character by character at human cadence.
    pub async fn type_query(&self, query: &str, delay_ms: RangeInclusive<u64>) -> Result<()> {
        self.page.type_chars(query, delay_ms).await?;
        Ok(())
    }

    /// Submit with Enter.
    pub async fn submit(&self) -> Result<()> {
        self.page.press_enter().await?;
        Ok(())
    }
}

/// Acquire the active search input on `page`, or fail with
/// `SearchBoxUnavailable` after the last fallback tier.
pub async fn acquire<'a>(page: &'a Page, cfg: &'a SearchConfig) -> Result<SearchBox<'a>> {
    // Tier 0: make sure we are on the site at all, then probe directly.
    let url = page.url().await?;
    if !url.starts_with(&cfg.home_url) {
        page.goto(&cfg.home_url, cfg.nav_timeout).await?;
    }
    overlay::dismiss(page, cfg).await;

    if probe(page, cfg, cfg.box_waits[0]).await? {
        return Ok(SearchBox {
            page,
            selector: &cfg.search_box,
        });
    }

    // Tier 1: the search UI may be collapsed behind a trigger control, and
    // expanding it can reveal a second consent layer.
    if overlay::click_first(page, &cfg.search_triggers, cfg.trigger_settle).await {
        tracing::debug!("collapsed search UI expanded");
    }
    overlay::dismiss(page, cfg).await;

    if probe(page, cfg, cfg.box_waits[1]).await? {
        return Ok(SearchBox {
            page,
            selector: &cfg.search_box,
        });
    }

    // Tier 2: force-navigate to the bare root and try once more with the
    // longest bound.
    page.goto(&cfg.home_url, cfg.nav_timeout).await?;
    tokio::time::sleep(cfg.trigger_settle).await;
    overlay::dismiss(page, cfg).await;

    if probe(page, cfg, cfg.box_waits[2]).await? {
        return Ok(SearchBox {
            page,
            selector: &cfg.search_box,
        });
    }

    Err(SearchError::SearchBoxUnavailable {
        url: page.url().await.unwrap_or_default(),
    })
}

/// Bounded wait for any visible match of the combined selector.
async fn probe(page: &Page, cfg: &SearchConfig, timeout: Duration) -> Result<bool> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let visible = page
            .evaluate(any_visible_js(&cfg.search_box))
            .await?
            .as_bool()
            .unwrap_or(false);
        if visible {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn visible_filter_js() -> &'static str {
    r#"el => {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
    }"#
}

fn any_visible_js(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    let visible = visible_filter_js();
    format!(
        r#"(() => {{
            const visible = {visible};
            return [...document.querySelectorAll({selector})].some(visible);
        }})()"#
    )
}

fn first_visible_center_js(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    let visible = visible_filter_js();
    format!(
        r#"(() => {{
            const visible = {visible};
            const el = [...document.querySelectorAll({selector})].find(visible);
            if (!el) return null;
            el.scrollIntoView({{ behavior: 'instant', block: 'center', inline: 'center' }});
            const r = el.getBoundingClientRect();
            return {{ x: r.left + r.width / 2, y: r.top + r.height / 2 }};
        }})()"#
    )
}

fn focus_and_clear_js(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    let visible = visible_filter_js();
    format!(
        r#"(() => {{
            const visible = {visible};
            const el = [...document.querySelectorAll({selector})].find(visible);
            if (!el) return false;
            el.focus();
            el.value = '';
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_js_targets_all_variants() {
        let cfg = SearchConfig::default();
        let js = any_visible_js(&cfg.search_box);
        assert!(js.contains("sb_form_q"));
        assert!(js.contains("querySelectorAll"));
        assert!(js.contains("some(visible)"));
    }

    #[test]
    fn operations_resolve_first_visible_match() {
        let js = first_visible_center_js("input[name='q']");
        assert!(js.contains("find(visible)"));
        assert!(js.contains("scrollIntoView"));
    }

    #[tokio::test]
    #[ignore]
    async fn acquires_box_on_live_engine() {
        use browser::{endpoint, Browser};

        let resolved = endpoint::resolve("127.0.0.1", 9222, Duration::from_secs(15))
            .await
            .unwrap();
        let browser = Browser::connect(&resolved.ws_url).await.unwrap();
        let page = browser.attach_page().await.unwrap();
        let cfg = SearchConfig::default();

        let search_box = acquire(&page, &cfg).await.unwrap();
        search_box.activate().await.unwrap();
        browser.close().await.unwrap();
    }
}
