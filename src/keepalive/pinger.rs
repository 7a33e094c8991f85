use crate::core::time::{Clock, SystemClock};
use crate::keepalive::diag::{DiagnosticSink, NoopSink};
use crate::keepalive::emitter;
use crate::keepalive::monitor::{TrafficMonitor, TrafficSnapshot};
use crate::net::stream::SharedStream;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, watch};

/// Terminal outcomes of a keepalive run.
#[derive(Debug, Error)]
pub enum KeepaliveError {
    /// The caller's connection slot was empty.
    #[error("no active stream to ping")]
    MissingStream,
    /// Another run is still active on this pinger.
    #[error("keepalive run already in progress")]
    AlreadyRunning,
    /// A dispatched PINGREQ went unanswered past the next scheduling
    /// decision; the connection is presumed dead.
    #[error("PINGRESP timed out")]
    PingRespTimeout,
    /// The PINGREQ write itself failed.
    #[error("failed to send PINGREQ: {0}")]
    Write(#[source] std::io::Error),
}

/// Keepalive controller for one MQTT connection.
///
/// The pinger owns no I/O besides the PINGREQ writes it dispatches. The
/// containing client constructs one pinger per connection, reports every
/// packet it sends or receives via the notification methods, and keeps
/// `run` alive for as long as the connection should be considered live.
/// `run` returning an error is the signal to drop the transport and let
/// reconnection logic take over.
pub struct Pinger<C: Clock = SystemClock> {
    clock: C,
    monitor: TrafficMonitor,
    diag: Arc<dyn DiagnosticSink>,
}

impl Pinger<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Pinger<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Pinger<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            monitor: TrafficMonitor::new(),
            diag: Arc::new(NoopSink),
        }
    }

    /// Install a diagnostic sink. Takes `&mut self` so the sink cannot be
    /// swapped once the pinger is shared with a running task.
    pub fn set_diagnostics(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.diag = sink;
    }

    /// The client sent any control packet.
    pub fn packet_sent(&self) {
        self.monitor.record_sent(self.clock.now());
    }

    /// The client received any control packet, PINGRESP included.
    pub fn packet_received(&self) {
        self.monitor.record_received(self.clock.now());
    }

    /// The client's reader recognized a PINGRESP.
    pub fn ping_response(&self) {
        self.monitor.record_ping_response(self.clock.now());
    }

    /// Current traffic timestamps, read atomically.
    pub fn traffic(&self) -> TrafficSnapshot {
        self.monitor.snapshot()
    }

    /// Drive the keepalive loop until cancellation or failure.
    ///
    /// - `keep_alive == 0`: keepalive is disabled; returns `Ok` at once.
    /// - `stream` is the client's current connection slot; `None` fails
    ///   with [`KeepaliveError::MissingStream`].
    /// - A second `run` while one is active fails with
    ///   [`KeepaliveError::AlreadyRunning`] and leaves the first alone.
    /// - Otherwise blocks until the shutdown channel signals `true` (or
    ///   its sender is dropped), returning `Ok`; or until a PINGRESP
    ///   timeout or write failure, returning the error.
    ///
    /// The pinger never closes the stream; in-flight writes are unblocked
    /// by the caller tearing the connection down.
    pub async fn run<W>(
        &self,
        mut shutdown: watch::Receiver<bool>,
        stream: Option<SharedStream<W>>,
        keep_alive: u16,
    ) -> Result<(), KeepaliveError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if keep_alive == 0 {
            self.diag.record("keepalive disabled, returning immediately");
            return Ok(());
        }
        let stream = stream.ok_or(KeepaliveError::MissingStream)?;
        if !self.monitor.begin_run() {
            return Err(KeepaliveError::AlreadyRunning);
        }
        // Clears the running flag on every exit path, panics included.
        let _guard = RunGuard {
            monitor: &self.monitor,
        };

        let interval = Duration::from_secs(u64::from(keep_alive));
        // Buffered so an emitter that fails after this run has already
        // returned never blocks on its report.
        let (err_tx, mut err_rx) = mpsc::channel::<KeepaliveError>(1);
        let mut last_ping_sent: Option<Instant> = None;
        // First tick fires immediately: a fresh connection pings right away.
        let mut next_fire = Duration::ZERO;

        loop {
            tokio::select! {
                () = wait_cancelled(&mut shutdown) => return Ok(()),
                () = self.clock.sleep(next_fire) => {
                    let now = self.clock.now();
                    let snapshot = self.monitor.snapshot();

                    if let Some(sent) = last_ping_sent {
                        let answered =
                            matches!(snapshot.last_ping_response, Some(resp) if resp >= sent);
                        if !answered {
                            self.diag.record("PINGRESP timeout");
                            return Err(KeepaliveError::PingRespTimeout);
                        }
                    }

                    if let Some(due) = ping_due_at(&snapshot, interval) {
                        if now < due {
                            // Traffic flowed in both directions since the
                            // last check; the ping can wait until the
                            // staler side's deadline.
                            next_fire = due - now;
                            continue;
                        }
                    }

                    last_ping_sent = Some(now);
                    emitter::dispatch(Arc::clone(&stream), err_tx.clone(), Arc::clone(&self.diag));
                    next_fire = interval;
                }
                Some(err) = err_rx.recv() => return Err(err),
            }
        }
    }
}

/// When the next PINGREQ is due, given a traffic snapshot.
///
/// MQTT-3.1.2-20 only demands a ping when nothing has been SENT within
/// the keepalive window, but under that minimum a half-open connection
/// carrying outbound-only traffic stays undetected until the TCP timeout.
/// The deadline is therefore anchored on whichever direction is staler:
/// both must stay live to defer the ping. `None` means "due immediately"
/// and covers a connection that has never seen traffic in one direction.
fn ping_due_at(snapshot: &TrafficSnapshot, interval: Duration) -> Option<Instant> {
    match (snapshot.last_packet_sent, snapshot.last_packet_received) {
        (Some(sent), Some(received)) => Some(sent.min(received) + interval),
        _ => None,
    }
}

async fn wait_cancelled(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender means the owning client is gone; treat both the
    // explicit signal and closure as cancellation.
    let _ = shutdown.wait_for(|cancelled| *cancelled).await;
}

struct RunGuard<'a> {
    monitor: &'a TrafficMonitor,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.monitor.end_run();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_due_immediately_without_bidirectional_traffic() {
        let interval = Duration::from_secs(2);
        let now = Instant::now();

        let snapshot = TrafficSnapshot::default();
        assert_eq!(ping_due_at(&snapshot, interval), None);

        // Outbound-only traffic does not defer the ping.
        let snapshot = TrafficSnapshot {
            last_packet_sent: Some(now),
            ..TrafficSnapshot::default()
        };
        assert_eq!(ping_due_at(&snapshot, interval), None);

        let snapshot = TrafficSnapshot {
            last_packet_received: Some(now),
            ..TrafficSnapshot::default()
        };
        assert_eq!(ping_due_at(&snapshot, interval), None);
    }

    #[test]
    fn test_ping_deadline_anchors_on_staler_direction() {
        let interval = Duration::from_secs(2);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(500);

        let snapshot = TrafficSnapshot {
            last_packet_sent: Some(t1),
            last_packet_received: Some(t0),
            ..TrafficSnapshot::default()
        };
        assert_eq!(ping_due_at(&snapshot, interval), Some(t0 + interval));

        let snapshot = TrafficSnapshot {
            last_packet_sent: Some(t0),
            last_packet_received: Some(t1),
            ..TrafficSnapshot::default()
        };
        assert_eq!(ping_due_at(&snapshot, interval), Some(t0 + interval));
    }

    #[test]
    fn test_fresh_traffic_pushes_deadline_out() {
        let interval = Duration::from_secs(2);
        let t0 = Instant::now();

        let snapshot = TrafficSnapshot {
            last_packet_sent: Some(t0),
            last_packet_received: Some(t0),
            ..TrafficSnapshot::default()
        };
        let due = ping_due_at(&snapshot, interval).unwrap();
        assert!(due > t0 + Duration::from_secs(1));

        let later = TrafficSnapshot {
            last_packet_sent: Some(t0 + Duration::from_secs(1)),
            last_packet_received: Some(t0 + Duration::from_secs(1)),
            ..TrafficSnapshot::default()
        };
        assert!(ping_due_at(&later, interval).unwrap() > due);
    }
}
