//! Run configuration.
//!
//! Every timeout, selector list and pause range lives here and is passed
//! into the components at construction. Selector lists are plain data so a
//! new markup variant is an additive change, not a code change.

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::overlay::ControlMatcher;

/// Configuration for one search run. Defaults target Bing.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// The engine's home page; searches start from here.
    pub home_url: String,
    /// Canonical results endpoint, `?q=` appended for recovery navigation.
    pub results_base: String,
    /// Substring a results-page URL must contain.
    pub results_marker: String,

    /// Combined selector covering every known markup variant of the
    /// search input.
    pub search_box: String,
    /// Markers that a results container has rendered.
    pub results_selector: String,
    /// Controls that expand a collapsed search UI.
    pub search_triggers: Vec<ControlMatcher>,

    /// Consent controls, rejection first - it wins whenever both exist.
    pub reject_controls: Vec<ControlMatcher>,
    pub accept_controls: Vec<ControlMatcher>,

    /// Settle after page load before probing overlays (they render async).
    pub overlay_settle: Duration,
    /// Settle after clicking a consent control.
    pub click_settle: Duration,
    /// Settle after clicking a search trigger or forced navigation.
    pub trigger_settle: Duration,

    /// DOM-content bound for navigations.
    pub nav_timeout: Duration,
    /// Search-box visibility bounds for the three probe tiers.
    pub box_waits: [Duration; 3],
    /// Result-marker bound after a normal submit (expiry tolerated).
    pub results_wait: Duration,
    /// Result-marker bound on the recovery path (expiry is the attempt's
    /// timeout).
    pub recovery_wait: Duration,

    /// Per-character typing delay, milliseconds.
    pub type_delay_ms: RangeInclusive<u64>,
    /// Pause between attempts, milliseconds.
    pub pause_ms: RangeInclusive<u64>,
    /// Post-attempt wheel scroll, units downward.
    pub scroll_delta: RangeInclusive<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            home_url: "https://www.bing.com".to_string(),
            results_base: "https://www.bing.com/search".to_string(),
            results_marker: "bing.com/search".to_string(),

            search_box: "#sb_form_q, input#sb_form_q, \
                         input[name='q'], textarea[name='q'], \
                         form[role='search'] input, form[role='search'] textarea, \
                         #b_searchboxForm input, #b_searchboxForm textarea"
                .to_string(),
            results_selector: "li.b_algo, #b_results".to_string(),
            search_triggers: vec![
                ControlMatcher::with_aria("button", "search"),
                ControlMatcher::with_aria("a", "search"),
                ControlMatcher::with_text("button", "search"),
                ControlMatcher::with_title("button", "search"),
                ControlMatcher::css("#sbBtn"),
            ],

            reject_controls: vec![
                ControlMatcher::with_text("button", "rifiuta"),
                ControlMatcher::with_text("button", "rifiuto"),
                ControlMatcher::with_text("button", "reject"),
                ControlMatcher::with_text("button", "decline"),
                ControlMatcher::with_aria("button", "reject"),
                ControlMatcher::with_aria("button", "rifiuta"),
            ],
            accept_controls: vec![
                ControlMatcher::with_text("button", "accetta"),
                ControlMatcher::with_text("button", "accept"),
                ControlMatcher::with_text("button", "i agree"),
                ControlMatcher::with_aria("button", "accept"),
                ControlMatcher::with_aria("button", "accetta"),
            ],

            overlay_settle: Duration::from_millis(400),
            click_settle: Duration::from_millis(500),
            trigger_settle: Duration::from_millis(300),

            nav_timeout: Duration::from_secs(20),
            box_waits: [
                Duration::from_secs(8),
                Duration::from_secs(12),
                Duration::from_secs(15),
            ],
            results_wait: Duration::from_secs(15),
            recovery_wait: Duration::from_secs(30),

            type_delay_ms: 60..=120,
            pause_ms: 8_000..=16_000,
            scroll_delta: 600..=1400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_tiers_escalate() {
        let cfg = SearchConfig::default();
        assert!(cfg.box_waits[0] < cfg.box_waits[1]);
        assert!(cfg.box_waits[1] < cfg.box_waits[2]);
        assert!(cfg.results_wait < cfg.recovery_wait);
    }

    #[test]
    fn selector_list_covers_known_variants() {
        let cfg = SearchConfig::default();
        for variant in ["#sb_form_q", "input[name='q']", "form[role='search']"] {
            assert!(cfg.search_box.contains(variant), "missing {variant}");
        }
    }
}
