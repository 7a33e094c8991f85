use std::time::{Duration, Instant};

/// Clock abstraction so keepalive scheduling reads time from one place.
///
/// The pinger takes every "now" and every timer arm through this trait,
/// which lets tests substitute a manual clock when exercising the
/// scheduler without real waits.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration) -> tokio::time::Sleep;
}

/// System-backed clock; the default outside tests.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> tokio::time::Sleep {
        tokio::time::sleep(duration)
    }
}
