//! Lightweight board telemetry: structured debug logs plus an in-memory trail for inspection.

#[cfg(feature = "telemetry")]
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Loaded { tasks: usize, categories: usize },
    LoadFailed(String),
    FilterChanged(String),
    MutationApplied(String),
    MutationFailed { action: String, error: String },
    Reconciled { action: String },
    BulkFinished {
        action: String,
        succeeded: usize,
        failed: usize,
    },
}

#[derive(Debug, Default)]
pub struct Handle {
    #[cfg(feature = "telemetry")]
    events: Mutex<Vec<Event>>,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        #[cfg(feature = "telemetry")]
        {
            match &event {
                Event::Loaded { tasks, categories } => {
                    tracing::debug!(tasks, categories, "board telemetry loaded")
                }
                Event::LoadFailed(error) => {
                    tracing::debug!(error = error.as_str(), "board telemetry load failed")
                }
                Event::FilterChanged(filter) => {
                    tracing::debug!(filter = filter.as_str(), "board telemetry filter changed")
                }
                Event::MutationApplied(action) => tracing::debug!(
                    action = action.as_str(),
                    "board telemetry mutation applied"
                ),
                Event::MutationFailed { action, error } => tracing::debug!(
                    action = action.as_str(),
                    error = error.as_str(),
                    "board telemetry mutation failed"
                ),
                Event::Reconciled { action } => {
                    tracing::debug!(action = action.as_str(), "board telemetry reconciled")
                }
                Event::BulkFinished {
                    action,
                    succeeded,
                    failed,
                } => tracing::debug!(
                    action = action.as_str(),
                    succeeded,
                    failed,
                    "board telemetry bulk action finished"
                ),
            }
            self.events.lock().push(event);
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = event;
        }
    }

    pub fn is_enabled(&self) -> bool {
        cfg!(feature = "telemetry")
    }

    /// Copy of the recorded trail; always empty with the feature off.
    pub fn events(&self) -> Vec<Event> {
        #[cfg(feature = "telemetry")]
        {
            self.events.lock().clone()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_when_enabled() {
        let handle = Handle::new();
        handle.record(Event::Loaded {
            tasks: 2,
            categories: 4,
        });
        if handle.is_enabled() {
            assert_eq!(
                handle.events(),
                vec![Event::Loaded {
                    tasks: 2,
                    categories: 4
                }]
            );
        } else {
            assert!(handle.events().is_empty());
        }
    }
}
