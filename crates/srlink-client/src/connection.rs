//! Serial connection with a background reader thread.
//!
//! One command is in flight at a time. `execute` arms a pending slot
//! with the expected response id, writes the request, then waits on a
//! condvar until the reader thread fills the slot or the timeout
//! expires. Notifications arriving in between are routed to
//! subscriptions without disturbing the pending exchange.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::Bytes;
use srlink_frame::{CommandId, CommandKind, FrameError, FrameReader, FrameWriter};
use srlink_transport::Link;
use tracing::{debug, info, trace, warn};

use crate::error::{CommandError, Result};
use crate::notify::{
    parse_notification, NotificationKind, Subscription, SubscriptionInner,
    DEFAULT_QUEUE_CAPACITY,
};

/// What to do when another command is already being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Wait for the in-flight command to finish, then send.
    #[default]
    Queue,
    /// Fail immediately with [`CommandError::Busy`].
    FailFast,
}

/// Per-command dispatch tuning.
#[derive(Debug, Clone, Copy)]
pub struct CommandOptions {
    /// How long to wait for the response on each attempt.
    pub timeout: Duration,
    /// How many times to resend after a timed-out attempt.
    pub retries: u32,
    pub mode: DispatchMode,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            retries: 2,
            mode: DispatchMode::Queue,
        }
    }
}

impl CommandOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Default)]
struct Pending {
    expect: Option<u16>,
    reply: Option<Bytes>,
}

struct Shared {
    pending: Mutex<Pending>,
    reply_ready: Condvar,
    subscriptions: Mutex<Vec<Weak<SubscriptionInner>>>,
    closed: AtomicBool,
    shutdown: AtomicBool,
}

impl Shared {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.reply_ready.notify_all();
        let subs = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for sub in subs.iter().filter_map(Weak::upgrade) {
            sub.close();
        }
    }
}

/// A live serial session with the module.
pub struct Connection {
    writer: Mutex<FrameWriter<Box<dyn Link>>>,
    send_lock: Mutex<()>,
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
}

impl Connection {
    /// Take ownership of a link and start the reader thread.
    pub fn open(link: Box<dyn Link>) -> Result<Self> {
        let read_half = link.try_clone()?;
        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending::default()),
            reply_ready: Condvar::new(),
            subscriptions: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });
        let reader_shared = Arc::clone(&shared);
        let reader = std::thread::Builder::new()
            .name("srlink-reader".into())
            .spawn(move || read_loop(read_half, reader_shared))
            .map_err(|err| CommandError::Transport(err.into()))?;
        Ok(Self {
            writer: Mutex::new(FrameWriter::new(link)),
            send_lock: Mutex::new(()),
            shared,
            reader: Some(reader),
        })
    }

    /// Whether the reader thread has seen the link close.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait for its paired response payload.
    pub fn execute(&self, id: CommandId, payload: &[u8]) -> Result<Bytes> {
        self.execute_with(id, payload, CommandOptions::default())
    }

    pub fn execute_with(
        &self,
        id: CommandId,
        payload: &[u8],
        options: CommandOptions,
    ) -> Result<Bytes> {
        if id.kind() != CommandKind::Request {
            return Err(CommandError::InvalidArgument(format!(
                "{id:?} is not a request"
            )));
        }
        let _guard = match options.mode {
            DispatchMode::Queue => self
                .send_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            DispatchMode::FailFast => match self.send_lock.try_lock() {
                Ok(guard) => guard,
                Err(std::sync::TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(std::sync::TryLockError::WouldBlock) => return Err(CommandError::Busy),
            },
        };

        let expect = id.response_id();
        let attempts = options.retries + 1;
        for attempt in 1..=attempts {
            if self.is_closed() {
                return Err(CommandError::LinkClosed);
            }
            self.arm(expect);
            if let Err(err) = self.send(id, payload) {
                self.disarm();
                return Err(err);
            }
            trace!(id = ?id, attempt, "request sent");
            match self.wait_reply(options.timeout) {
                Some(reply) => return Ok(reply),
                None => {
                    self.disarm();
                    if self.is_closed() {
                        return Err(CommandError::LinkClosed);
                    }
                    debug!(id = ?id, attempt, "response timed out");
                }
            }
        }
        Err(CommandError::Timeout {
            id: id.as_u16(),
            attempts,
        })
    }

    /// Register for unsolicited notifications, optionally filtered by
    /// kind.
    pub fn subscribe(&self, filter: Option<NotificationKind>) -> Subscription {
        let inner = SubscriptionInner::new(filter, DEFAULT_QUEUE_CAPACITY);
        let mut subs = self
            .shared
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subs.retain(|weak| weak.strong_count() > 0);
        subs.push(Arc::downgrade(&inner));
        Subscription::new(inner)
    }

    fn arm(&self, expect: u16) {
        let mut pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending.expect = Some(expect);
        pending.reply = None;
    }

    fn disarm(&self) {
        let mut pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending.expect = None;
        pending.reply = None;
    }

    fn send(&self, id: CommandId, payload: &[u8]) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        writer.send(id.as_u16(), payload)?;
        Ok(())
    }

    fn wait_reply(&self, timeout: Duration) -> Option<Bytes> {
        let deadline = Instant::now() + timeout;
        let mut pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(reply) = pending.reply.take() {
                pending.expect = None;
                return Some(reply);
            }
            if self.shared.closed.load(Ordering::SeqCst) {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (next, _) = self
                .shared
                .reply_ready
                .wait_timeout(pending, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            pending = next;
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        self.shared.close();
    }
}

fn read_loop(link: Box<dyn Link>, shared: Arc<Shared>) {
    let mut reader = FrameReader::new(link);
    loop {
        if shared.shutdown.load(Ordering::SeqCst) {
            break;
        }
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::Io(err))
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                ) =>
            {
                continue;
            }
            Err(FrameError::LinkClosed) => {
                info!("link closed by peer");
                break;
            }
            Err(err) => {
                warn!(%err, "read loop terminating");
                break;
            }
        };
        match CommandId::from_u16(frame.id) {
            Some(id) if id.kind() == CommandKind::Notification => {
                match parse_notification(id, &frame.payload) {
                    Ok(notification) => {
                        let subs = shared
                            .subscriptions
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        for sub in subs.iter().filter_map(Weak::upgrade) {
                            sub.push(&notification);
                        }
                    }
                    Err(err) => warn!(%err, id = frame.id, "dropping malformed notification"),
                }
            }
            _ => {
                let mut pending = shared
                    .pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if pending.expect == Some(frame.id) {
                    pending.reply = Some(frame.payload);
                    shared.reply_ready.notify_all();
                } else {
                    debug!(id = frame.id, "discarding unexpected frame");
                }
            }
        }
    }
    shared.close();
}
