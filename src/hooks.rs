//! Seams to the host: a one-flag preference store and a fire-and-forget
//! analytics sink. The core never reads anything back from the sink.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::info;

/// Key/value preference storage. The core only ever touches the tutorial flag.
pub trait Preferences: Send {
    fn has_seen_tutorial(&self) -> bool;
    fn set_seen_tutorial(&mut self, seen: bool);
}

pub trait AnalyticsSink: Send {
    fn track(&mut self, name: &str, payload: Value);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    seen_tutorial: bool,
}

impl Preferences for MemoryPreferences {
    fn has_seen_tutorial(&self) -> bool {
        self.seen_tutorial
    }

    fn set_seen_tutorial(&mut self, seen: bool) {
        self.seen_tutorial = seen;
    }
}

/// Writes analytics events to the log.
#[derive(Debug, Clone, Default)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn track(&mut self, name: &str, payload: Value) {
        info!(event = name, %payload, "analytics");
    }
}

/// Keeps every tracked event; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<(String, Value)>>>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&mut self, name: &str, payload: Value) {
        if let Ok(mut events) = self.events.lock() {
            events.push((name.to_string(), payload));
        }
    }
}
