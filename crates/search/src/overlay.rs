//! Consent/cookie overlay dismissal.
//!
//! Strictly best-effort: an overlay that is present gets clicked away, one
//! that is absent is a normal silent outcome, and nothing here ever fails
//! the caller. Rejection controls are tried before acceptance controls.

use std::time::Duration;

use browser::Page;
use serde_json::Value;

use crate::best_effort;
use crate::config::SearchConfig;

/// One structural matcher in a prioritized control list: a CSS selector
/// optionally narrowed by case-insensitive substrings of the element's
/// text, aria-label or title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMatcher {
    pub selector: &'static str,
    pub text: Option<&'static str>,
    pub aria_label: Option<&'static str>,
    pub title: Option<&'static str>,
}

impl ControlMatcher {
    pub const fn css(selector: &'static str) -> Self {
        Self {
            selector,
            text: None,
            aria_label: None,
            title: None,
        }
    }

    pub const fn with_text(selector: &'static str, text: &'static str) -> Self {
        Self {
            selector,
            text: Some(text),
            aria_label: None,
            title: None,
        }
    }

    pub const fn with_aria(selector: &'static str, label: &'static str) -> Self {
        Self {
            selector,
            text: None,
            aria_label: Some(label),
            title: None,
        }
    }

    pub const fn with_title(selector: &'static str, title: &'static str) -> Self {
        Self {
            selector,
            text: None,
            aria_label: None,
            title: Some(title),
        }
    }

    /// Expression returning the viewport center of the first visible
    /// element this matcher selects, or null.
    pub fn find_visible_js(&self) -> String {
        let selector = json_str(self.selector);
        let text = opt_lower(self.text);
        let aria = opt_lower(self.aria_label);
        let title = opt_lower(self.title);
        format!(
            r#"(() => {{
                const textNeedle = {text};
                const ariaNeedle = {aria};
                const titleNeedle = {title};
                const has = (value, needle) =>
                    needle === null || (value || '').toLowerCase().includes(needle);
                for (const el of document.querySelectorAll({selector})) {{
                    if (!has(el.textContent, textNeedle)) continue;
                    if (!has(el.getAttribute('aria-label'), ariaNeedle)) continue;
                    if (!has(el.getAttribute('title'), titleNeedle)) continue;
                    const rect = el.getBoundingClientRect();
                    const style = window.getComputedStyle(el);
                    if (rect.width <= 0 || rect.height <= 0) continue;
                    if (style.visibility === 'hidden' || style.display === 'none') continue;
                    el.scrollIntoView({{ behavior: 'instant', block: 'center', inline: 'center' }});
                    const r = el.getBoundingClientRect();
                    return {{ x: r.left + r.width / 2, y: r.top + r.height / 2 }};
                }}
                return null;
            }})()"#
        )
    }
}

/// Walk `matchers` in order and click the first visible one. Individual
/// probe/click failures are swallowed and the next candidate is tried.
pub(crate) async fn click_first(
    page: &Page,
    matchers: &[ControlMatcher],
    settle: Duration,
) -> bool {
    for matcher in matchers {
        let Some(found) = best_effort(
            "overlay probe",
            page.evaluate(matcher.find_visible_js()).await,
        ) else {
            continue;
        };
        let Some((x, y)) = center_of(&found) else {
            continue;
        };
        if best_effort("overlay click", page.click_at(x, y).await).is_some() {
            tracing::debug!(selector = matcher.selector, "dismissal control clicked");
            tokio::time::sleep(settle).await;
            return true;
        }
    }
    false
}

/// Dismiss any consent overlay on `page`. A clicked reject control ends the
/// routine; accept controls are only consulted when no reject control was
/// actionable. Total absence of controls is silent.
pub async fn dismiss(page: &Page, cfg: &SearchConfig) {
    tokio::time::sleep(cfg.overlay_settle).await;

    for tier in dismissal_tiers(cfg) {
        if click_first(page, tier, cfg.click_settle).await {
            return;
        }
    }
}

/// The fixed precedence: every rejection matcher strictly before any
/// acceptance matcher.
fn dismissal_tiers(cfg: &SearchConfig) -> [&[ControlMatcher]; 2] {
    [&cfg.reject_controls, &cfg.accept_controls]
}

fn json_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn opt_lower(s: Option<&str>) -> String {
    match s {
        Some(s) => json_str(&s.to_lowercase()),
        None => "null".to_string(),
    }
}

pub(crate) fn center_of(value: &Value) -> Option<(f64, f64)> {
    let x = value.get("x")?.as_f64()?;
    let y = value.get("y")?.as_f64()?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_tier_is_consulted_before_accept_tier() {
        let cfg = SearchConfig::default();
        let [first, second] = dismissal_tiers(&cfg);
        assert_eq!(first, cfg.reject_controls.as_slice());
        assert_eq!(second, cfg.accept_controls.as_slice());
        assert!(first
            .iter()
            .any(|m| m.text == Some("reject") || m.aria_label == Some("reject")));
        assert!(second
            .iter()
            .any(|m| m.text == Some("accept") || m.aria_label == Some("accept")));
    }

    #[test]
    fn matcher_js_filters_case_insensitively() {
        let matcher = ControlMatcher::with_text("button", "Reject");
        let js = matcher.find_visible_js();
        assert!(js.contains(r#""reject""#), "needle must be lowercased");
        assert!(js.contains("toLowerCase()"));
        assert!(js.contains(r#"querySelectorAll("button")"#));
    }

    #[test]
    fn plain_css_matcher_skips_attribute_filters() {
        let js = ControlMatcher::css("#sbBtn").find_visible_js();
        assert!(js.contains("const textNeedle = null"));
        assert!(js.contains("const ariaNeedle = null"));
    }
}
