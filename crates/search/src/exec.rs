//! The per-query execution protocol.
//!
//! One attempt: record the starting URL, acquire the search input, type and
//! submit, then *verify* that a results navigation actually happened for
//! this exact query. When it did not - silent submit failure, consent
//! interception, whatever - recovery drives straight to the canonical
//! results URL, which does not depend on the input's submit behavior at
//! all and guarantees forward progress.

use browser::Page;
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

use crate::best_effort;
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::locator;

/// How one attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Navigated,
    SameUrl,
    TimedOut,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Outcome::Navigated => "NAVIGATED",
            Outcome::SameUrl => "SAME_URL",
            Outcome::TimedOut => "TIMED_OUT",
        })
    }
}

/// Record of one completed attempt. Ephemeral - logged, never persisted.
#[derive(Debug, Clone)]
pub struct SearchAttempt {
    pub query: String,
    pub before_url: String,
    pub after_url: String,
    pub outcome: Outcome,
}

/// Percent-encode a query for a results URL, spaces as `+`.
pub fn encode_query(query: &str) -> String {
    form_urlencoded::byte_serialize(query.as_bytes()).collect()
}

/// The canonical results URL for `query`.
pub fn results_url(cfg: &SearchConfig, query: &str) -> String {
    format!("{}?q={}", cfg.results_base, encode_query(query))
}

/// The verification predicate: the URL moved, it is a results-path URL, and
/// its `q` parameter decodes to exactly the submitted query. Parameter
/// comparison goes through URL parsing so `q=old` does not pass for a page
/// that actually searched `older`.
pub fn verified(cfg: &SearchConfig, before: &str, after: &str, query: &str) -> bool {
    if after == before {
        return false;
    }
    if !after.contains(&cfg.results_marker) {
        return false;
    }
    match Url::parse(after) {
        Ok(parsed) => parsed.query_pairs().any(|(k, v)| k == "q" && v == query),
        Err(_) => false,
    }
}

/// Run one attempt on `page`. Attempt-level failures (`SearchBoxUnavailable`,
/// `AttemptTimeout`) are the caller's to catch; transport errors propagate.
pub async fn run_attempt(page: &Page, cfg: &SearchConfig, query: &str) -> Result<SearchAttempt> {
    let before_url = page.url().await?;

    let search_box = locator::acquire(page, cfg).await?;
    search_box.activate().await?;
    search_box.clear().await?;
    search_box
        .type_query(query, cfg.type_delay_ms.clone())
        .await?;
    search_box.submit().await?;

    // Result containers render asynchronously; absence here is tolerated
    // and verification decides on whatever URL currently holds.
    let _ = page
        .wait_for_selector(&cfg.results_selector, cfg.results_wait)
        .await?;

    let mut after_url = page.url().await?;
    if !verified(cfg, &before_url, &after_url, query) {
        tracing::debug!(%after_url, "submit not verified, recovering via direct navigation");
        let target = results_url(cfg, query);
        page.goto(&target, cfg.nav_timeout).await?;
        let markers = page
            .wait_for_selector(&cfg.results_selector, cfg.recovery_wait)
            .await?;
        if !markers.is_visible() {
            return Err(SearchError::AttemptTimeout {
                url: page.url().await.unwrap_or_default(),
            });
        }
        after_url = page.url().await?;
    }

    let outcome = if after_url != before_url {
        Outcome::Navigated
    } else {
        Outcome::SameUrl
    };

    // Cosmetic reading scroll; failures are discarded.
    let delta = rand::thread_rng().gen_range(cfg.scroll_delta.clone()) as f64;
    best_effort("post-attempt scroll", page.scroll_wheel(delta).await);

    Ok(SearchAttempt {
        query: query.to_string(),
        before_url,
        after_url,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_cfg() -> SearchConfig {
        SearchConfig {
            home_url: "https://site/".to_string(),
            results_base: "https://site/search".to_string(),
            results_marker: "site/search".to_string(),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn encoding_uses_plus_for_spaces_and_round_trips() {
        assert_eq!(encode_query("hello world"), "hello+world");
        assert_eq!(encode_query("caffè+latte"), "caff%C3%A8%2Blatte");

        let cfg = site_cfg();
        let query = "c# vs c++ & rust";
        let built = results_url(&cfg, query);
        let parsed = Url::parse(&built).unwrap();
        let decoded = parsed
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn moved_results_url_with_matching_query_is_verified() {
        let cfg = site_cfg();
        assert!(verified(
            &cfg,
            "https://site/",
            "https://site/search?q=hello+world",
            "hello world",
        ));
    }

    #[test]
    fn unchanged_url_is_never_verified() {
        let cfg = site_cfg();
        assert!(!verified(
            &cfg,
            "https://site/search?q=old",
            "https://site/search?q=old",
            "old",
        ));
    }

    #[test]
    fn query_parameter_must_match_exactly() {
        let cfg = site_cfg();
        // Prefix of the actual parameter: raw substring matching would pass.
        assert!(!verified(
            &cfg,
            "https://site/",
            "https://site/search?q=older",
            "old",
        ));
        // Same query in a different parameter does not count.
        assert!(!verified(
            &cfg,
            "https://site/",
            "https://site/search?form=QBLH&x=old",
            "old",
        ));
    }

    #[test]
    fn non_results_navigation_is_not_verified() {
        let cfg = site_cfg();
        assert!(!verified(
            &cfg,
            "https://site/",
            "https://site/account?q=old",
            "old",
        ));
    }

    #[test]
    fn outcome_display_matches_log_format() {
        assert_eq!(Outcome::Navigated.to_string(), "NAVIGATED");
        assert_eq!(Outcome::SameUrl.to_string(), "SAME_URL");
        assert_eq!(Outcome::TimedOut.to_string(), "TIMED_OUT");
    }
}
