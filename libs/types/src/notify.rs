//! Notification boundary
//!
//! The core emits notices; delivering them (email, push, websocket) is
//! somebody else's job. Sinks must not block and must not fail the caller.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

/// What happened, from the notified user's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeKind {
    OfferAccepted,
    OfferExpired,
    ListingExpired,
    PaymentCaptured,
    PaymentFailed,
    TicketsDelivered,
    ReceiptConfirmed,
    PayoutReleased,
    TransactionCancelled,
    TransactionRefunded,
}

/// A single outbound notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub body: Value,
}

impl Notice {
    pub fn new(kind: NoticeKind, body: Value) -> Self {
        Self { kind, body }
    }
}

/// Outbound notification sink
pub trait NotificationSink: Send + Sync {
    fn notify(&self, user: UserId, notice: Notice);
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _user: UserId, _notice: Notice) {}
}

/// Sink that records every notice, for test assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(UserId, Notice)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far
    pub fn sent(&self) -> Vec<(UserId, Notice)> {
        self.sent.lock().unwrap().clone()
    }

    /// How many notices of one kind went out
    pub fn count_of(&self, kind: NoticeKind) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, n)| n.kind == kind)
            .count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, user: UserId, notice: Notice) {
        self.sent.lock().unwrap().push((user, notice));
    }
}
