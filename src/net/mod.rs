//! Networking layer: the shared write handle the keepalive engine and the
//! rest of the client funnel packets through.

pub mod stream;

pub use stream::{shared, SharedStream};
