use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// A connected duplex byte stream — implements Read + Write.
///
/// Reads are expected to block for at most a bounded interval and surface
/// `ErrorKind::TimedOut` when no bytes arrived, so a reader loop can poll a
/// shutdown flag between reads. `Ok(0)` means the other end is gone.
pub trait Link: Read + Write + Send {
    /// Clone a handle sharing the same underlying channel.
    ///
    /// Used to hand the read half to a dedicated reader thread while the
    /// write half stays with the dispatcher.
    fn try_clone(&self) -> Result<Box<dyn Link>>;
}

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// One direction of an in-process byte pipe.
struct Pipe {
    state: Mutex<PipeState>,
    readable: Condvar,
}

struct PipeState {
    buf: VecDeque<u8>,
    writers: usize,
}

impl Pipe {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PipeState {
                buf: VecDeque::new(),
                writers: 1,
            }),
            readable: Condvar::new(),
        })
    }
}

/// An in-process [`Link`] pair used by tests and device simulators.
///
/// Mimics serial-port read semantics: reads time out with
/// `ErrorKind::TimedOut` when no data arrives, and return `Ok(0)` once every
/// write handle for the opposite end has been dropped.
pub struct MemoryLink {
    rx: Arc<Pipe>,
    tx: Arc<Pipe>,
    read_timeout: Duration,
}

impl MemoryLink {
    /// Create a connected pair of links.
    pub fn pair() -> (MemoryLink, MemoryLink) {
        let a_to_b = Pipe::new();
        let b_to_a = Pipe::new();
        (
            MemoryLink {
                rx: Arc::clone(&b_to_a),
                tx: a_to_b.clone(),
                read_timeout: DEFAULT_READ_TIMEOUT,
            },
            MemoryLink {
                rx: a_to_b,
                tx: b_to_a,
                read_timeout: DEFAULT_READ_TIMEOUT,
            },
        )
    }

    /// Set how long a read blocks before reporting `TimedOut`.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

impl Read for MemoryLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self
            .rx
            .state
            .lock()
            .map_err(|_| std::io::Error::other("link poisoned"))?;

        while state.buf.is_empty() {
            if state.writers == 0 {
                return Ok(0);
            }
            let (next, timeout) = self
                .rx
                .readable
                .wait_timeout(state, self.read_timeout)
                .map_err(|_| std::io::Error::other("link poisoned"))?;
            state = next;
            if timeout.timed_out() && state.buf.is_empty() {
                if state.writers == 0 {
                    return Ok(0);
                }
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
        }

        let n = buf.len().min(state.buf.len());
        for slot in buf.iter_mut().take(n) {
            // n is bounded by the queue length, pop cannot fail
            *slot = state.buf.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl Write for MemoryLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut state = self
            .tx
            .state
            .lock()
            .map_err(|_| std::io::Error::other("link poisoned"))?;
        state.buf.extend(buf.iter().copied());
        drop(state);
        self.tx.readable.notify_all();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Link for MemoryLink {
    fn try_clone(&self) -> Result<Box<dyn Link>> {
        let mut state = self
            .tx
            .state
            .lock()
            .map_err(|_| TransportError::Closed)?;
        state.writers += 1;
        drop(state);
        Ok(Box::new(MemoryLink {
            rx: Arc::clone(&self.rx),
            tx: Arc::clone(&self.tx),
            read_timeout: self.read_timeout,
        }))
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        if let Ok(mut state) = self.tx.state.lock() {
            state.writers = state.writers.saturating_sub(1);
        }
        // Wake any blocked reader so it can observe the hangup.
        self.tx.readable.notify_all();
    }
}

impl std::fmt::Debug for MemoryLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLink")
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn pair_roundtrip() {
        let (mut a, mut b) = MemoryLink::pair();

        a.write_all(b"ping").expect("write should succeed");
        let mut buf = [0u8; 4];
        b.read_exact(&mut buf).expect("read should succeed");
        assert_eq!(&buf, b"ping");

        b.write_all(b"pong").expect("write should succeed");
        a.read_exact(&mut buf).expect("read should succeed");
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn read_times_out_when_idle() {
        let (mut a, _b) = MemoryLink::pair();
        a.set_read_timeout(Duration::from_millis(10));

        let mut buf = [0u8; 1];
        let err = a.read(&mut buf).expect_err("read should time out");
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }

    #[test]
    fn read_returns_zero_after_peer_drop() {
        let (mut a, b) = MemoryLink::pair();
        a.set_read_timeout(Duration::from_millis(10));
        drop(b);

        let mut buf = [0u8; 1];
        let n = a.read(&mut buf).expect("read should observe hangup");
        assert_eq!(n, 0);
    }

    #[test]
    fn clone_keeps_channel_open() {
        let (mut a, b) = MemoryLink::pair();
        a.set_read_timeout(Duration::from_millis(10));
        let mut b_clone = b.try_clone().expect("clone should succeed");
        drop(b);

        b_clone.write_all(b"x").expect("write should succeed");
        let mut buf = [0u8; 1];
        a.read_exact(&mut buf).expect("read should succeed");
        assert_eq!(&buf, b"x");

        drop(b_clone);
        let n = a.read(&mut buf).expect("read should observe hangup");
        assert_eq!(n, 0);
    }

    #[test]
    fn cross_thread_stream() {
        let (mut a, mut b) = MemoryLink::pair();

        let writer = thread::spawn(move || {
            for i in 0..64u8 {
                a.write_all(&[i]).expect("write should succeed");
            }
        });

        let mut buf = [0u8; 64];
        b.read_exact(&mut buf).expect("read should succeed");
        for (i, byte) in buf.iter().enumerate() {
            assert_eq!(*byte as usize, i);
        }
        writer.join().expect("writer thread should complete");
    }
}
