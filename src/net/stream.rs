use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

/// Shared write half of an established connection.
///
/// The client and the keepalive engine both write control packets through
/// this handle; the async mutex serializes them so no two packets ever
/// interleave bytes on the wire. Locking may park a writer for as long as
/// a concurrent large packet takes to drain, which is why the pinger
/// offloads its writes instead of taking this lock on its control loop.
///
/// The handle never closes the underlying stream. Ownership of the
/// connection's lifetime stays with the client; dropping every clone of
/// the `Arc` is how the stream is ultimately released.
pub type SharedStream<W> = Arc<Mutex<W>>;

/// Wrap an established stream (or its write half) for shared use.
pub fn shared<W>(stream: W) -> SharedStream<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    Arc::new(Mutex::new(stream))
}
