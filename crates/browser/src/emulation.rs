//! Device emulation on a live page.
//!
//! Overrides are applied through raw `Emulation.*` commands on the page's
//! existing session - never by opening a new browsing context - so cookies
//! and login state survive the profile switch. The page must be reloaded
//! after applying for the profile to take visual effect.

use serde_json::{json, Value};

use crate::cdp::client::Result;
use crate::page::Page;

/// A device profile: viewport metrics, user agent, touch capability.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmulationProfile {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub mobile: bool,
    pub user_agent: String,
    pub touch: bool,
    pub max_touch_points: u32,
}

impl EmulationProfile {
    /// A current-generation Android phone.
    pub fn phone() -> Self {
        Self {
            width: 412,
            height: 915,
            device_scale_factor: 2.625,
            mobile: true,
            user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36 \
                         EdgA/120.0.0.0"
                .to_string(),
            touch: true,
            max_touch_points: 5,
        }
    }

    /// The command sequence that applies this profile.
    pub fn apply_plan(&self) -> Vec<(&'static str, Value)> {
        vec![
            (
                "Emulation.setDeviceMetricsOverride",
                json!({
                    "width": self.width,
                    "height": self.height,
                    "deviceScaleFactor": self.device_scale_factor,
                    "mobile": self.mobile,
                }),
            ),
            (
                "Emulation.setUserAgentOverride",
                json!({ "userAgent": self.user_agent }),
            ),
            (
                "Emulation.setTouchEmulationEnabled",
                json!({ "enabled": self.touch, "maxTouchPoints": self.max_touch_points }),
            ),
        ]
    }
}

/// The command sequence that restores non-emulated defaults: metrics
/// override removed, empty user agent, touch disabled.
pub fn clear_plan() -> Vec<(&'static str, Value)> {
    vec![
        ("Emulation.clearDeviceMetricsOverride", json!({})),
        ("Emulation.setUserAgentOverride", json!({ "userAgent": "" })),
        ("Emulation.setTouchEmulationEnabled", json!({ "enabled": false })),
    ]
}

/// Apply `profile` to `page`. The caller reloads afterwards.
pub async fn apply(page: &Page, profile: &EmulationProfile) -> Result<()> {
    for (method, params) in profile.apply_plan() {
        page.session().send(method, Some(params)).await?;
    }
    tracing::debug!(
        width = profile.width,
        height = profile.height,
        mobile = profile.mobile,
        "emulation profile applied"
    );
    Ok(())
}

/// Clear any emulation from `page`.
///
/// Each step is attempted independently: when the protocol session is
/// already degrading (page navigated away, tab closing), whichever
/// overrides can still be reset, are. Never fails the caller.
pub async fn clear(page: &Page) {
    for (method, params) in clear_plan() {
        if let Err(e) = page.session().send(method, Some(params)).await {
            tracing::debug!("emulation clear step {} failed: {}", method, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_plan_covers_metrics_agent_and_touch() {
        let profile = EmulationProfile::phone();
        let methods: Vec<&str> = profile.apply_plan().iter().map(|(m, _)| *m).collect();
        assert_eq!(
            methods,
            vec![
                "Emulation.setDeviceMetricsOverride",
                "Emulation.setUserAgentOverride",
                "Emulation.setTouchEmulationEnabled",
            ]
        );

        let (_, metrics) = &profile.apply_plan()[0];
        assert_eq!(metrics["mobile"], json!(true));
        assert_eq!(metrics["width"], json!(412));
    }

    #[test]
    fn clear_plan_restores_defaults_and_is_idempotent() {
        let first = clear_plan();
        let second = clear_plan();
        assert_eq!(first, second);

        assert_eq!(first[1].1["userAgent"], json!(""));
        assert_eq!(first[2].1["enabled"], json!(false));
    }

    #[tokio::test]
    #[ignore]
    async fn apply_then_clear_twice_leaves_page_unemulated() {
        use crate::session::Browser;

        let browser = Browser::connect("ws://localhost:9222/devtools/browser")
            .await
            .unwrap();
        let page = browser.attach_page().await.unwrap();

        for _ in 0..2 {
            apply(&page, &EmulationProfile::phone()).await.unwrap();
            page.reload().await.unwrap();
            clear(&page).await;
            page.reload().await.unwrap();
        }

        let touch_points = page.evaluate("navigator.maxTouchPoints").await.unwrap();
        assert_eq!(touch_points, json!(0));
        browser.close().await.unwrap();
    }
}
