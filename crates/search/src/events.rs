//! Run events.
//!
//! The orchestrator publishes; sinks (the console printer, tests) subscribe.
//! Keeping the log sink out of the loop means the core never formats or
//! prints anything itself.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::exec::Outcome;

/// Progress events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    AttemptFinished {
        label: String,
        index: usize,
        total: usize,
        query: String,
        outcome: Outcome,
    },
    TargetSkipped {
        label: String,
    },
    Warning {
        label: String,
        message: String,
    },
}

/// Broadcast-channel event bus.
pub struct EventBus {
    tx: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event. No subscribers is fine.
    pub fn publish(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_events_reach_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(RunEvent::AttemptFinished {
            label: "DEFAULT".to_string(),
            index: 1,
            total: 2,
            query: "cats".to_string(),
            outcome: Outcome::Navigated,
        });

        match rx.recv().await {
            Ok(RunEvent::AttemptFinished { query, outcome, .. }) => {
                assert_eq!(query, "cats");
                assert_eq!(outcome, Outcome::Navigated);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn backlog_drains_after_bus_is_dropped() {
        // Sinks rely on this: everything published before the bus goes away
        // is still delivered, then the channel reports closed.
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(RunEvent::TargetSkipped {
            label: "DEFAULT".to_string(),
        });
        bus.publish(RunEvent::Warning {
            label: "DEFAULT".to_string(),
            message: "late warning".to_string(),
        });
        drop(bus);

        assert!(matches!(rx.recv().await, Ok(RunEvent::TargetSkipped { .. })));
        assert!(matches!(rx.recv().await, Ok(RunEvent::Warning { .. })));
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
