//! Unsolicited notification fan-out.
//!
//! The reader thread pushes parsed notifications into every live
//! subscription whose filter matches. Queues are bounded; when a
//! subscriber falls behind the oldest notification is dropped so the
//! reader never blocks on a slow consumer.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use srlink_frame::CommandId;
use tracing::warn;

use crate::commands::{mac_from_le, short_from_le};
use crate::error::{CommandError, Result};

pub(crate) const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Which class of unsolicited traffic a subscription wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    DataReceived,
    NetworkStateChanged,
}

/// A change in the module's network membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkState {
    AddressChanged {
        short_address: String,
        pan_id: String,
        coordinator: String,
    },
    ModuleInitialized,
    NodeConnected {
        short_address: String,
        mac_address: String,
    },
    NodeDisconnected {
        short_address: String,
        mac_address: String,
    },
}

/// Application data delivered by the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedData {
    pub destination: String,
    pub source: String,
    pub nor: u8,
    pub security: bool,
    pub ttl: u8,
    pub data: Bytes,
}

/// An unsolicited message from the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    DataReceived(ReceivedData),
    NetworkStateChanged(NetworkState),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::DataReceived(_) => NotificationKind::DataReceived,
            Notification::NetworkStateChanged(_) => NotificationKind::NetworkStateChanged,
        }
    }
}

pub(crate) fn parse_notification(id: CommandId, payload: &Bytes) -> Result<Notification> {
    let bad = |message: &str| CommandError::BadResponse {
        id: id.as_u16(),
        message: message.to_string(),
    };

    match id {
        CommandId::DataReceivedNotification => {
            // destination(3 LE) source(3 LE) nor security ttl data...
            if payload.len() < 9 {
                return Err(bad("data notification too short"));
            }
            Ok(Notification::DataReceived(ReceivedData {
                destination: short_from_le(&payload[0..2]),
                source: short_from_le(&payload[3..5]),
                nor: payload[6],
                security: payload[7] != 0,
                ttl: payload[8],
                data: payload.slice(9..),
            }))
        }
        CommandId::NetworkStateChangedNotification => {
            let (state, rest) = payload
                .split_first()
                .ok_or_else(|| bad("empty state notification"))?;
            let state = match state {
                0x00 => {
                    if rest.len() < 6 {
                        return Err(bad("address change too short"));
                    }
                    NetworkState::AddressChanged {
                        short_address: short_from_le(&rest[0..2]),
                        pan_id: short_from_le(&rest[2..4]),
                        coordinator: short_from_le(&rest[4..6]),
                    }
                }
                0x02 => NetworkState::ModuleInitialized,
                0x03 | 0x04 => {
                    if rest.len() < 10 {
                        return Err(bad("node change too short"));
                    }
                    let short_address = short_from_le(&rest[0..2]);
                    let mac_address = mac_from_le(&rest[2..10]);
                    if *state == 0x03 {
                        NetworkState::NodeConnected {
                            short_address,
                            mac_address,
                        }
                    } else {
                        NetworkState::NodeDisconnected {
                            short_address,
                            mac_address,
                        }
                    }
                }
                other => {
                    return Err(bad(&format!("unknown network state {other:#04x}")));
                }
            };
            Ok(Notification::NetworkStateChanged(state))
        }
        _ => Err(bad("not a notification id")),
    }
}

struct QueueState {
    items: VecDeque<Notification>,
    closed: bool,
    dropped: u64,
}

pub(crate) struct SubscriptionInner {
    filter: Option<NotificationKind>,
    capacity: usize,
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl SubscriptionInner {
    pub(crate) fn new(filter: Option<NotificationKind>, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            filter,
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
                dropped: 0,
            }),
            ready: Condvar::new(),
        })
    }

    pub(crate) fn push(&self, notification: &Notification) {
        if let Some(filter) = self.filter {
            if notification.kind() != filter {
                return;
            }
        }
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return;
        }
        if state.items.len() == self.capacity {
            state.items.pop_front();
            state.dropped += 1;
            warn!(dropped = state.dropped, "subscription queue full, dropping oldest");
        }
        state.items.push_back(notification.clone());
        self.ready.notify_one();
    }

    pub(crate) fn close(&self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.ready.notify_all();
    }
}

/// A handle to a stream of notifications.
///
/// Dropping the handle unsubscribes; queued notifications are
/// discarded.
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub(crate) fn new(inner: Arc<SubscriptionInner>) -> Self {
        Self { inner }
    }

    /// Take the next queued notification without blocking.
    pub fn try_recv(&self) -> Option<Notification> {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.items.pop_front()
    }

    /// Block until a notification arrives or the connection closes.
    ///
    /// `None` means the connection is gone and the queue is drained.
    pub fn recv(&self) -> Option<Notification> {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(notification) = state.items.pop_front() {
                return Some(notification);
            }
            if state.closed {
                return None;
            }
            state = self
                .inner
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block up to `timeout` for the next notification.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Notification> {
        let deadline = Instant::now() + timeout;
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(notification) = state.items.pop_front() {
                return Some(notification);
            }
            if state.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (next, _) = self
                .inner
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
        }
    }

    /// Unsubscribe explicitly. Equivalent to dropping the handle.
    pub fn close(self) {}

    /// How many notifications have been dropped because this subscriber
    /// fell behind.
    pub fn dropped(&self) -> u64 {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dropped
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.close();
    }
}
