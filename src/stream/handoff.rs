use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::foundation::error::{HoldframeError, HoldframeResult};

/// Default read timeout.
pub const DEFAULT_HANDOFF_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Default)]
struct Inner {
    buf: Vec<u8>,
    read_pos: usize,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<Inner>,
    readable: Condvar,
}

/// Single-writer, single-reader byte channel with timeout-bounded blocking reads.
///
/// Bridges a push-style producer (audio callbacks) into a pull-style consumer. Clones share
/// the same channel; hand one clone to the writer and one to the reader.
///
/// Writes never block. Consumed bytes are released once the reader catches up with the
/// writer, so memory only grows while the reader lags.
#[derive(Clone, Debug)]
pub struct BoundedHandoffStream {
    shared: Arc<Shared>,
    timeout: Duration,
}

impl Default for BoundedHandoffStream {
    fn default() -> Self {
        Self::new(DEFAULT_HANDOFF_TIMEOUT)
    }
}

impl BoundedHandoffStream {
    /// Create an empty, open stream.
    pub fn new(timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            timeout,
        }
    }

    /// Read timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> HoldframeResult<MutexGuard<'_, Inner>> {
        self.shared
            .inner
            .lock()
            .map_err(|_| HoldframeError::state("hand-off stream lock poisoned"))
    }

    /// Append `bytes` and wake a blocked reader. Fails once the stream is closed.
    pub fn write(&self, bytes: &[u8]) -> HoldframeResult<()> {
        let mut inner = self.lock()?;
        if inner.closed {
            return Err(HoldframeError::state("write to closed hand-off stream"));
        }
        inner.buf.extend_from_slice(bytes);
        drop(inner);
        self.shared.readable.notify_all();
        Ok(())
    }

    /// Copy up to `out.len()` available bytes into `out`.
    ///
    /// Blocks until data arrives, the stream is closed (returns `Ok(0)`), or the timeout
    /// elapses with no data ([`HoldframeError::Timeout`]). An empty `out` returns `Ok(0)`
    /// immediately.
    pub fn read(&self, out: &mut [u8]) -> HoldframeResult<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let deadline = Instant::now() + self.timeout;
        let mut inner = self.lock()?;
        loop {
            let available = inner.buf.len() - inner.read_pos;
            if available > 0 {
                let n = available.min(out.len());
                let start = inner.read_pos;
                out[..n].copy_from_slice(&inner.buf[start..start + n]);
                inner.read_pos += n;
                if inner.read_pos == inner.buf.len() {
                    inner.buf.clear();
                    inner.read_pos = 0;
                }
                return Ok(n);
            }
            if inner.closed {
                return Ok(0);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(HoldframeError::timeout(self.timeout));
            }
            inner = self
                .shared
                .readable
                .wait_timeout(inner, deadline - now)
                .map_err(|_| HoldframeError::state("hand-off stream lock poisoned"))?
                .0;
        }
    }

    /// Mark the stream closed and wake any blocked reader.
    ///
    /// Bytes written before the close can still be read; after that reads return 0.
    pub fn close(&self) {
        match self.shared.inner.lock() {
            Ok(mut inner) => inner.closed = true,
            Err(poisoned) => poisoned.into_inner().closed = true,
        }
        self.shared.readable.notify_all();
    }

    /// `true` once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.lock().map(|inner| inner.closed).unwrap_or(true)
    }

    /// Bytes written but not yet read.
    pub fn pending(&self) -> usize {
        self.lock()
            .map(|inner| inner.buf.len() - inner.read_pos)
            .unwrap_or(0)
    }
}

impl io::Read for BoundedHandoffStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        BoundedHandoffStream::read(self, buf).map_err(|err| match err {
            HoldframeError::Timeout(_) => io::Error::new(io::ErrorKind::TimedOut, err),
            other => io::Error::other(other),
        })
    }
}

impl io::Write for BoundedHandoffStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BoundedHandoffStream::write(self, buf)
            .map(|()| buf.len())
            .map_err(|err| io::Error::new(io::ErrorKind::BrokenPipe, err))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/handoff.rs"]
mod tests;
