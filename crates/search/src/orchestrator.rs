//! Run orchestration.
//!
//! Sequences attempts per target page and label, strictly one page at a
//! time. Attempt-level failures are absorbed at the per-query boundary so
//! one bad query never aborts the remaining sequence; setup and transport
//! failures propagate and stop the run.

use browser::{emulation, Browser, EmulationProfile, Page};
use rand::Rng;
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::events::{EventBus, RunEvent};
use crate::exec::{self, Outcome};
use crate::queries;

/// One unit of work: N searches on one page under one label, optionally
/// under a device-emulation profile. A page is never both emulated and
/// non-emulated - emulated targets get a fresh tab.
#[derive(Debug, Clone)]
pub struct RunTarget {
    pub label: String,
    pub count: usize,
    pub emulation: Option<EmulationProfile>,
}

pub struct Orchestrator {
    config: SearchConfig,
    events: EventBus,
    run_id: Uuid,
}

impl Orchestrator {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            events: EventBus::new(),
            run_id: Uuid::now_v7(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Execute a plan of targets sequentially against one browser.
    pub async fn run_plan(&self, browser: &Browser, corpus: &[String], plan: &[RunTarget]) -> Result<()> {
        tracing::info!(run_id = %self.run_id, targets = plan.len(), "run starting");
        for target in plan {
            if target.count == 0 {
                // Zero requested searches must not touch the browser at all.
                self.events.publish(RunEvent::TargetSkipped {
                    label: target.label.clone(),
                });
                continue;
            }
            match &target.emulation {
                None => {
                    let page = browser.attach_page().await?;
                    self.run_searches(&page, &target.label, corpus, target.count)
                        .await?;
                }
                Some(profile) => {
                    self.run_emulated(browser, profile, &target.label, corpus, target.count)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// N searches on `page` under `label`.
    pub async fn run_searches(
        &self,
        page: &Page,
        label: &str,
        corpus: &[String],
        count: usize,
    ) -> Result<()> {
        let chosen = queries::pick(corpus, count);
        if chosen.is_empty() {
            self.events.publish(RunEvent::TargetSkipped {
                label: label.to_string(),
            });
            return Ok(());
        }

        let total = chosen.len();
        page.bring_to_front().await?;

        for (i, query) in chosen.iter().enumerate() {
            let index = i + 1;
            match exec::run_attempt(page, &self.config, query).await {
                Ok(attempt) => {
                    tracing::info!(
                        label,
                        index,
                        total,
                        query = %query,
                        outcome = %attempt.outcome,
                        "attempt finished"
                    );
                    self.events.publish(RunEvent::AttemptFinished {
                        label: label.to_string(),
                        index,
                        total,
                        query: query.clone(),
                        outcome: attempt.outcome,
                    });
                }
                Err(e) if e.is_attempt_level() => {
                    tracing::warn!(label, query = %query, "attempt abandoned: {e}");
                    self.events.publish(RunEvent::Warning {
                        label: label.to_string(),
                        message: format!("{query}: {e}"),
                    });
                    self.events.publish(RunEvent::AttemptFinished {
                        label: label.to_string(),
                        index,
                        total,
                        query: query.clone(),
                        outcome: Outcome::TimedOut,
                    });
                }
                Err(fatal) => return Err(fatal),
            }

            self.pause().await;
        }
        Ok(())
    }

    /// N searches under a device-emulation profile, on a fresh page.
    /// Emulation is always cleared before returning, error path included,
    /// so a later reuse of the tab is not left emulated.
    pub async fn run_emulated(
        &self,
        browser: &Browser,
        profile: &EmulationProfile,
        label: &str,
        corpus: &[String],
        count: usize,
    ) -> Result<()> {
        let page = browser.new_page().await?;
        let result = self
            .drive_emulated(&page, profile, label, corpus, count)
            .await;
        emulation::clear(&page).await;
        result
    }

    async fn drive_emulated(
        &self,
        page: &Page,
        profile: &EmulationProfile,
        label: &str,
        corpus: &[String],
        count: usize,
    ) -> Result<()> {
        emulation::apply(page, profile).await?;
        // The override takes visual effect on the next load.
        page.goto(&self.config.home_url, self.config.nav_timeout)
            .await?;
        self.run_searches(page, label, corpus, count).await
    }

    async fn pause(&self) {
        let ms = rand::thread_rng().gen_range(self.config.pause_ms.clone());
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore]
    async fn end_to_end_two_distinct_queries() {
        use browser::endpoint;
        use std::time::Duration;

        let corpus = vec![
            "cats".to_string(),
            "dogs".to_string(),
            "birds".to_string(),
        ];

        let resolved = endpoint::resolve("127.0.0.1", 9222, Duration::from_secs(15))
            .await
            .unwrap();
        let browser = Browser::connect(&resolved.ws_url).await.unwrap();

        let orchestrator = Orchestrator::new(SearchConfig::default());
        let mut rx = orchestrator.events().subscribe();

        let page = browser.attach_page().await.unwrap();
        orchestrator
            .run_searches(&page, "TEST", &corpus, 2)
            .await
            .unwrap();

        let mut finished = 0;
        while let Ok(event) = rx.try_recv() {
            if let RunEvent::AttemptFinished { query, .. } = event {
                assert!(corpus.contains(&query));
                finished += 1;
            }
        }
        assert_eq!(finished, 2);
        browser.close().await.unwrap();
    }
}
