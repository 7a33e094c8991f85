#![deny(unused, dead_code)]
#![deny(clippy::all, clippy::pedantic)]
// Module naming: common pattern in domain-driven code
#![allow(clippy::module_name_repetitions)]
// Documentation style: many protocol terms don't need backticks
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// API ergonomics: prefer simplicity over must_use annotations
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
// Format strings: allow non-inlined for readability
#![allow(clippy::uninlined_format_args)]
// Numeric casts: intentional in protocol code
#![allow(clippy::cast_possible_truncation)]
// Variable naming: domain terms often similar
#![allow(clippy::similar_names)]
// Import style
#![allow(clippy::wildcard_imports)]
// Control flow style
#![allow(clippy::single_match_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
// Passing style
#![allow(clippy::needless_pass_by_value)]
// Closure style
#![allow(clippy::redundant_closure_for_method_calls)]
// Explicit returns
#![allow(clippy::semicolon_if_nothing_returned)]

//! Muon - MQTT v5 client connection core.
//!
//! The centerpiece is the keepalive engine: a long-running pinger attached
//! to a live connection that emits PINGREQ packets at the negotiated
//! cadence and detects silently broken links by timing out missing
//! PINGRESPs. Around it sit the small protocol and configuration surfaces
//! a client needs to bring a connection to the point where the pinger can
//! take over.
//!
//! # Module Organization
//!
//! ## Core
//! - `core::config` - Client configuration parsing and validation
//! - `core::time` - Deterministic time utilities
//!
//! ## Networking
//! - `net::stream` - Shared write handle over an established connection
//!
//! ## Protocol
//! - `protocol::packet` - Control packet types, PINGREQ and CONNECT encoding
//! - `protocol::properties` - MQTT 5.0 CONNECT and Will properties
//!
//! ## Keepalive
//! - `keepalive::monitor` - Traffic timestamps and the running flag
//! - `keepalive::pinger` - The keepalive controller loop
//! - `keepalive::emitter` - Offloaded PINGREQ writes
//! - `keepalive::diag` - Pluggable diagnostic sink

// Core infrastructure
pub mod core;

// Networking
pub mod net;

// Protocol
pub mod protocol;

// Keepalive engine
pub mod keepalive;

// Re-exports for convenience
pub use self::core::{config, time};
pub use keepalive::{DiagnosticSink, KeepaliveError, NoopSink, Pinger, TracingSink};
pub use net::stream::{shared, SharedStream};
pub use protocol::packet::{ConnectPacket, PacketType};
pub use protocol::properties::{ConnectProperties, WillProperties};
