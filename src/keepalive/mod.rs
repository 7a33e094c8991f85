//! Keepalive engine.
//!
//! One `Pinger` per connection. The containing client feeds it traffic
//! notifications (`packet_sent`, `packet_received`, `ping_response`) and
//! drives `run` for the lifetime of the connection; the pinger emits
//! PINGREQ packets on the negotiated cadence and fails the run when a
//! PINGRESP never comes back or a write fails.

pub mod diag;
pub mod monitor;
pub mod pinger;

mod emitter;

pub use diag::{DiagnosticSink, MemorySink, NoopSink, TracingSink};
pub use monitor::{TrafficMonitor, TrafficSnapshot};
pub use pinger::{KeepaliveError, Pinger};
