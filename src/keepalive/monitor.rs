use parking_lot::Mutex;
use std::time::Instant;

/// A consistent view of the three traffic timestamps, taken under one
/// lock acquisition. `None` means the event has never happened on this
/// connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrafficSnapshot {
    pub last_packet_sent: Option<Instant>,
    pub last_packet_received: Option<Instant>,
    pub last_ping_response: Option<Instant>,
}

#[derive(Debug, Default)]
struct MonitorState {
    traffic: TrafficSnapshot,
    running: bool,
}

/// Thread-safe record of packet traffic on one connection, plus the flag
/// guarding against two concurrent keepalive runs.
///
/// All operations are O(1) under a single short-lived mutex, so the
/// client's packet paths can call the record methods from any task
/// without contending meaningfully with the controller's snapshots.
#[derive(Debug, Default)]
pub struct TrafficMonitor {
    inner: Mutex<MonitorState>,
}

impl TrafficMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self, now: Instant) {
        self.inner.lock().traffic.last_packet_sent = Some(now);
    }

    pub fn record_received(&self, now: Instant) {
        self.inner.lock().traffic.last_packet_received = Some(now);
    }

    pub fn record_ping_response(&self, now: Instant) {
        self.inner.lock().traffic.last_ping_response = Some(now);
    }

    /// Read all three timestamps atomically; no torn reads.
    pub fn snapshot(&self) -> TrafficSnapshot {
        self.inner.lock().traffic
    }

    /// Claim the running flag. Returns false if a run already holds it.
    pub(crate) fn begin_run(&self) -> bool {
        let mut state = self.inner.lock();
        if state.running {
            return false;
        }
        state.running = true;
        true
    }

    pub(crate) fn end_run(&self) {
        self.inner.lock().running = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_snapshot_starts_empty() {
        let monitor = TrafficMonitor::new();
        let snap = monitor.snapshot();
        assert!(snap.last_packet_sent.is_none());
        assert!(snap.last_packet_received.is_none());
        assert!(snap.last_ping_response.is_none());
    }

    #[test]
    fn test_records_are_visible_in_snapshot() {
        let monitor = TrafficMonitor::new();
        let t0 = Instant::now();
        monitor.record_sent(t0);
        monitor.record_received(t0 + Duration::from_millis(5));
        monitor.record_ping_response(t0 + Duration::from_millis(9));

        let snap = monitor.snapshot();
        assert_eq!(snap.last_packet_sent, Some(t0));
        assert_eq!(
            snap.last_packet_received,
            Some(t0 + Duration::from_millis(5))
        );
        assert_eq!(
            snap.last_ping_response,
            Some(t0 + Duration::from_millis(9))
        );
    }

    #[test]
    fn test_timestamps_advance_monotonically() {
        let monitor = TrafficMonitor::new();
        let t0 = Instant::now();
        let mut previous = None;
        for step in 0..50u64 {
            monitor.record_sent(t0 + Duration::from_millis(step));
            let current = monitor.snapshot().last_packet_sent;
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_running_flag_is_exclusive() {
        let monitor = TrafficMonitor::new();
        assert!(monitor.begin_run());
        assert!(!monitor.begin_run());
        monitor.end_run();
        assert!(monitor.begin_run());
    }
}
