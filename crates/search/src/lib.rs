//! Search-session driving against a fixed search engine.
//!
//! Builds on the `browser` crate's CDP layer: locate the search input
//! across markup variants, type a query at human cadence, submit, verify
//! the navigation actually happened, and recover deterministically when it
//! did not. A run is a sequence of such attempts per page and label, with
//! randomized pauses in between.

pub mod config;
pub mod error;
pub mod events;
pub mod exec;
pub mod locator;
pub mod orchestrator;
pub mod overlay;
pub mod queries;

pub use config::SearchConfig;
pub use error::SearchError;
pub use events::{EventBus, RunEvent};
pub use exec::{Outcome, SearchAttempt};
pub use orchestrator::{Orchestrator, RunTarget};

/// Run a fallible sub-operation whose failure must not reach the caller.
///
/// Overlay probing, scroll simulation and similar cosmetics fail for dull
/// reasons (element detached mid-click, session draining); the failure is
/// logged at debug level and discarded.
pub(crate) fn best_effort<T, E: std::fmt::Display>(
    what: &str,
    result: Result<T, E>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("{what} failed: {e}");
            None
        }
    }
}
