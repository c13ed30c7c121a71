use drain_traits::{Cue, NotificationSink, Severity};

/// Sink that renders cues as log lines. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn show(&mut self, cue: Cue, message: &str) {
        match cue.severity {
            Severity::Critical | Severity::Warning => {
                tracing::warn!(pattern = ?cue.pattern, severity = ?cue.severity, "{message}");
            }
            Severity::Info | Severity::Success => {
                tracing::info!(pattern = ?cue.pattern, severity = ?cue.severity, "{message}");
            }
        }
    }

    fn dismiss(&mut self) {
        tracing::debug!("cue dismissed");
    }
}
