// core/src/events.rs
//! Notice bus: an explicitly created pub/sub service that the controller
//! publishes user-facing notices to. Create it at startup, hand clones to
//! whoever needs it, call `shutdown` when the app goes away.
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Validation,
    Network,
    PartialEnhancementFailure,
    PersistenceFailure,
    Location,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

#[derive(Default)]
struct Inner {
    subscribers: Vec<Sender<Notice>>,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// New subscriber channel. After shutdown the receiver is disconnected immediately.
    pub fn subscribe(&self) -> Receiver<Notice> {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.lock();
        if !inner.closed {
            inner.subscribers.push(tx);
        }
        rx
    }

    /// Delivers to all live subscribers; dropped receivers are pruned.
    pub fn publish(&self, notice: Notice) {
        let mut inner = self.lock();
        if inner.closed {
            debug!("event bus closed, dropping notice {:?}", notice.kind);
            return;
        }
        inner.subscribers.retain(|tx| tx.send(notice.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Disconnects every subscriber; later publishes are no-ops.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.subscribers.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a subscriber panicked mid-send; the list is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
