use parking_lot::Mutex;
use std::sync::Arc;

/// Destination for the pinger's human-readable diagnostics: timer
/// behavior, write errors, timeout declarations.
///
/// Install one with `Pinger::set_diagnostics` before calling `run`; the
/// sink cannot be swapped while a run is active.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, message: &str);
}

/// Default sink; discards everything.
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&self, _message: &str) {}
}

/// Sink that forwards diagnostics to the `tracing` stack at debug level.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, message: &str) {
        tracing::debug!(target: "keepalive", "{message}");
    }
}

/// In-memory sink for tests and postmortems.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, message: &str) {
        self.inner.lock().push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
