//! Splitting a TLS stream into independently lockable read/write halves.
//!
//! A plain TCP socket can be split for free with `try_clone` because the
//! kernel already serializes access to the two clones of one file
//! descriptor. A `rustls::ClientConnection` session object offers no such
//! guarantee: reading and writing both mutate its internal state machine, so
//! concurrent access from two threads needs its own synchronization.
//!
//! The halves here share one stream behind a `parking_lot::Mutex`. The read
//! half is given a short socket read timeout so it periodically releases the
//! lock even with no data available, giving a concurrent Attention write
//! (sent from a different OS thread during query cancellation) a chance to
//! acquire the lock and reach the wire promptly instead of waiting out a
//! long-lived read.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::connector::TlsStream;
use crate::prelogin_wrapper::TlsPreloginWrapper;

/// How long a read half blocks per poll attempt before releasing the lock.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A transport that can report the socket it is ultimately backed by, so the
/// split halves can apply the short read-timeout poll regardless of how many
/// wrapper layers (PreLogin framing, TLS) sit on top of the raw socket.
pub trait SetReadTimeout {
    /// Set (or clear) the read timeout on the underlying socket.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl SetReadTimeout for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

impl<S: SetReadTimeout> SetReadTimeout for TlsPreloginWrapper<S> {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.get_ref().set_read_timeout(timeout)
    }
}

/// Split a blocking TLS stream into a read half and a write half.
///
/// Sets a short read timeout on the underlying socket so the read half
/// never holds the shared lock for more than `READ_POLL_INTERVAL` at a time.
pub fn split<S>(stream: TlsStream<S>) -> io::Result<(TlsReadHalf<S>, TlsWriteHalf<S>)>
where
    S: Read + Write + SetReadTimeout,
{
    stream.sock.set_read_timeout(Some(READ_POLL_INTERVAL))?;
    let inner = Arc::new(Mutex::new(stream));
    Ok((
        TlsReadHalf {
            inner: Arc::clone(&inner),
        },
        TlsWriteHalf { inner },
    ))
}

/// The read half of a split TLS stream.
pub struct TlsReadHalf<S> {
    inner: Arc<Mutex<TlsStream<S>>>,
}

impl<S: Read + Write> Read for TlsReadHalf<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let result = self.inner.lock().read(buf);
            match result {
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    // Lock was released above; a pending cancel write can
                    // now get in before we poll again.
                    continue;
                }
                other => return other,
            }
        }
    }
}

/// The write half of a split TLS stream.
pub struct TlsWriteHalf<S> {
    inner: Arc<Mutex<TlsStream<S>>>,
}

impl<S: Read + Write> Write for TlsWriteHalf<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}
