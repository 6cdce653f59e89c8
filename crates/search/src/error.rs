//! Error taxonomy for a search run.
//!
//! Two tiers: `SearchBoxUnavailable` and `AttemptTimeout` are caught at the
//! per-query boundary and the run continues; everything else (endpoint,
//! attach, transport) surfaces to the top and stops the run.

use thiserror::Error;

use browser::{BrowserError, CdpError};

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search box not found after all fallback tiers (url: {url})")]
    SearchBoxUnavailable { url: String },

    #[error("attempt timed out (url: {url})")]
    AttemptTimeout { url: String },

    #[error("query corpus {path}: {reason}")]
    Corpus { path: String, reason: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Cdp(#[from] CdpError),
}

impl SearchError {
    /// Whether this error abandons only the current attempt rather than
    /// the whole run.
    pub fn is_attempt_level(&self) -> bool {
        matches!(
            self,
            SearchError::SearchBoxUnavailable { .. }
                | SearchError::AttemptTimeout { .. }
                | SearchError::Cdp(CdpError::CommandTimeout { .. })
        )
    }
}
