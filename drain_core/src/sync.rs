//! Backend start/stop records. Failures never touch the session phase; they
//! are kept in a pending ledger for the caller to retry or reconcile.
use chrono::{DateTime, Utc};
use drain_traits::{Ack, SessionRecorder, SyncAction, SyncRecord};

use crate::error::SyncError;
use crate::fault_map::map_sync_error;

/// Weight and timing attached to a start or stop record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SyncMeta {
    pub mass_kg: Option<f64>,
    pub drained_grams: Option<f64>,
    pub duration_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub record: SyncRecord,
    pub error: SyncError,
}

pub struct SessionSync {
    recorder: Box<dyn SessionRecorder + Send>,
    device_id: String,
    pending: Vec<PendingRecord>,
}

impl SessionSync {
    pub fn new(recorder: Box<dyn SessionRecorder + Send>, device_id: impl Into<String>) -> Self {
        Self {
            recorder,
            device_id: device_id.into(),
            pending: Vec::new(),
        }
    }

    pub fn record_start(&mut self, meta: SyncMeta) -> Result<Ack, SyncError> {
        self.record(SyncAction::Start, meta, Utc::now())
    }

    pub fn record_stop(&mut self, meta: SyncMeta) -> Result<Ack, SyncError> {
        self.record(SyncAction::Stop, meta, Utc::now())
    }

    fn record(
        &mut self,
        action: SyncAction,
        meta: SyncMeta,
        timestamp: DateTime<Utc>,
    ) -> Result<Ack, SyncError> {
        let record = SyncRecord {
            action,
            device_id: self.device_id.clone(),
            timestamp,
            mass_kg: meta.mass_kg,
            drained_grams: meta.drained_grams,
            duration_seconds: meta.duration_seconds,
        };
        match self.recorder.record(&record) {
            Ok(ack) => {
                tracing::info!(action = action.as_str(), status = ack.status, "session synced");
                Ok(ack)
            }
            Err(e) => {
                let err = map_sync_error(e.as_ref());
                tracing::warn!(
                    action = action.as_str(),
                    error = %err,
                    "session sync failed; kept locally"
                );
                self.pending.push(PendingRecord {
                    record,
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    /// Records that failed and have not been retried successfully.
    pub fn pending(&self) -> &[PendingRecord] {
        &self.pending
    }

    /// Resend transient failures once, oldest first. Rejected records stay
    /// pending for manual reconciliation. Returns how many went through.
    pub fn retry_pending(&mut self) -> usize {
        let mut sent = 0;
        let mut keep = Vec::with_capacity(self.pending.len());
        for p in std::mem::take(&mut self.pending) {
            if !p.error.is_retryable() {
                keep.push(p);
                continue;
            }
            match self.recorder.record(&p.record) {
                Ok(_) => sent += 1,
                Err(e) => keep.push(PendingRecord {
                    error: map_sync_error(e.as_ref()),
                    record: p.record,
                }),
            }
        }
        self.pending = keep;
        sent
    }
}
