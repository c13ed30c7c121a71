use drain_traits::DeviceProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityChange {
    Unchanged,
    Lost,
    Restored,
}

/// Tracks device connectivity from periodic and operator-triggered probes.
///
/// Both paths share `check`, and a manual reconnect issued shortly after
/// any probe reuses that result instead of hitting the device again.
pub struct ReconnectionManager {
    probe: Box<dyn DeviceProbe + Send>,
    connected: bool,
    last_probe_ms: Option<u64>,
    manual_min_gap_ms: u64,
}

impl ReconnectionManager {
    pub fn new(probe: Box<dyn DeviceProbe + Send>, manual_min_gap_ms: u64) -> Self {
        Self {
            probe,
            connected: true,
            last_probe_ms: None,
            manual_min_gap_ms,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Scheduled probe.
    pub fn probe(&mut self, now_ms: u64) -> ConnectivityChange {
        self.check(now_ms)
    }

    /// Operator retry outside the automatic cadence.
    pub fn manual_reconnect(&mut self, now_ms: u64) -> ConnectivityChange {
        if self
            .last_probe_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.manual_min_gap_ms)
        {
            tracing::debug!(
                connected = self.connected,
                "manual reconnect coalesced with recent probe"
            );
            return ConnectivityChange::Unchanged;
        }
        self.check(now_ms)
    }

    fn check(&mut self, now_ms: u64) -> ConnectivityChange {
        self.last_probe_ms = Some(now_ms);
        let up = match self.probe.status() {
            Ok(s) => s.connected,
            Err(e) => {
                tracing::debug!(error = %e, "device status probe failed");
                false
            }
        };
        let change = match (self.connected, up) {
            (true, false) => ConnectivityChange::Lost,
            (false, true) => ConnectivityChange::Restored,
            _ => ConnectivityChange::Unchanged,
        };
        self.connected = up;
        match change {
            ConnectivityChange::Lost => tracing::warn!("device connectivity lost"),
            ConnectivityChange::Restored => tracing::info!("device connectivity restored"),
            ConnectivityChange::Unchanged => {}
        }
        change
    }
}
