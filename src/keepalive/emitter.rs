use crate::keepalive::diag::DiagnosticSink;
use crate::keepalive::pinger::KeepaliveError;
use crate::net::stream::SharedStream;
use crate::protocol::packet;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

/// Write one PINGREQ from a task of its own.
///
/// The write can outlive the keepalive period: a large concurrent packet
/// or TCP backpressure may hold the stream lock or stall the socket for
/// longer than the interval, and the controller must keep ticking through
/// that to notice a missing PINGRESP. Closing the stream unblocks the
/// write with an error, and the error channel is buffered, so the task
/// always terminates once the connection is torn down.
pub(crate) fn dispatch<W>(
    stream: SharedStream<W>,
    errors: mpsc::Sender<KeepaliveError>,
    diag: Arc<dyn DiagnosticSink>,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = stream.lock().await;
        if let Err(err) = packet::write_pingreq(&mut *stream).await {
            diag.record(&format!("PINGREQ write error: {err}"));
            let _ = errors.send(KeepaliveError::Write(err)).await;
        }
    });
}
