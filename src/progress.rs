//! Progress reporting
//!
//! Long operations (imports, report generation) emit short human-readable messages
//! through a [`ProgressSink`]. The library never prints; the CLI decides where the
//! messages go.

use std::sync::{Arc, Mutex};

/// Receiver of progress messages
pub trait ProgressSink: Send + Sync {
    /// A step started or finished
    fn update(&self, message: &str);

    /// A step failed; the operation may or may not continue
    fn error(&self, message: &str);
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn update(&self, message: &str) {
        (**self).update(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Discards every message
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn update(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// Shared no-op sink used when the caller does not supply one
pub static NOOP_PROGRESS: NoopProgress = NoopProgress;

/// Forwards messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn update(&self, message: &str) {
        tracing::info!(target: "tabular_insight::progress", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "tabular_insight::progress", "{}", message);
    }
}

/// A message captured by [`RecordingProgress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Update(String),
    Error(String),
}

/// Keeps every message in memory, for tests and for callers that render later
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Error messages only
    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Error(message) => Some(message),
                ProgressEvent::Update(_) => None,
            })
            .collect()
    }

    fn push(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl ProgressSink for RecordingProgress {
    fn update(&self, message: &str) {
        self.push(ProgressEvent::Update(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(ProgressEvent::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_progress() {
        let progress = RecordingProgress::new();
        progress.update("Reading file");
        progress.error("Planner failed");

        assert_eq!(
            progress.events(),
            vec![
                ProgressEvent::Update("Reading file".to_string()),
                ProgressEvent::Error("Planner failed".to_string()),
            ]
        );
        assert_eq!(progress.errors(), vec!["Planner failed"]);
    }

    #[test]
    fn test_sinks_are_object_safe() {
        let sinks: Vec<&dyn ProgressSink> = vec![&NOOP_PROGRESS, &TracingProgress];
        for sink in sinks {
            sink.update("ok");
        }
    }
}
