//! Test and helper mocks for drain_core

use std::sync::{Arc, Mutex};

use drain_traits::{Cue, NotificationSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Show(Cue, String),
    Dismiss,
}

/// Notification sink that records every call; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Cues shown so far, in order.
    pub fn shown(&self) -> Vec<Cue> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Show(cue, _) => Some(cue),
                SinkCall::Dismiss => None,
            })
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn show(&mut self, cue: Cue, message: &str) {
        if let Ok(mut c) = self.calls.lock() {
            c.push(SinkCall::Show(cue, message.to_string()));
        }
    }

    fn dismiss(&mut self) {
        if let Ok(mut c) = self.calls.lock() {
            c.push(SinkCall::Dismiss);
        }
    }
}
