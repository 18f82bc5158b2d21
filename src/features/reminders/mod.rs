//! # Reminders Feature
//!
//! Scheduled reminder system: natural-language time parsing, the persistence
//! and delivery boundaries, and the polling scheduler that delivers due
//! reminders.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Trait-based store/delivery boundaries, Russian time expressions
//! - 1.0.0: Initial scheduler

pub mod delivery;
pub mod parser;
pub mod scheduler;
pub mod service;

pub use delivery::DirectMessages;
pub use scheduler::{ReminderScheduler, SchedulerState};
pub use service::ReminderService;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::fmt;

/// Wire format for timestamps in the store. Lexicographic order on the
/// rendered strings matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lifecycle status of a reminder. Transitions are monotone: a reminder
/// starts `Active` and moves to `Delivered` exactly once, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderStatus {
    Active,
    Delivered,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Active => "active",
            ReminderStatus::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ReminderStatus::Active),
            "delivered" => Some(ReminderStatus::Delivered),
            _ => None,
        }
    }
}

/// A persisted request to deliver a text payload to a user at or after a
/// specific instant. All fields except `status` are immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: i64,
    pub owner_id: String,
    pub body: String,
    pub due_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub status: ReminderStatus,
}

impl Reminder {
    /// A reminder is eligible for delivery iff it is still active and its
    /// due time has passed.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.status == ReminderStatus::Active && self.due_at <= now
    }
}

/// Durable reminder storage boundary.
///
/// `try_mark_delivered` is the correctness backstop for concurrent delivery:
/// the transition succeeds only while the row is still active, so the same
/// reminder can never be recorded as delivered twice.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Persist a new reminder; returns the store-assigned id.
    async fn insert(
        &self,
        owner_id: &str,
        body: &str,
        due_at: NaiveDateTime,
        created_at: NaiveDateTime,
    ) -> Result<i64>;

    /// Active reminders for one user, ordered by `due_at` ascending.
    async fn active_for(&self, owner_id: &str) -> Result<Vec<Reminder>>;

    /// All reminders that are active and due at `now`.
    async fn due(&self, now: NaiveDateTime) -> Result<Vec<Reminder>>;

    /// Conditionally transition a reminder to `delivered`. Returns true iff
    /// this call performed the transition; false if the reminder was already
    /// delivered, cancelled or does not belong to `owner_id`.
    async fn try_mark_delivered(&self, id: i64, owner_id: &str) -> Result<bool>;
}

/// How a delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The recipient cannot be reached now or later; retrying is pointless.
    Permanent,
    /// Anything else; the reminder stays active and is retried next cycle.
    Transient,
}

/// Structured delivery failure reported by a [`DeliveryChannel`].
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl DeliveryFailure {
    pub fn permanent(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            detail: detail.into(),
        }
    }

    pub fn transient(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            detail: detail.into(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == FailureKind::Permanent
    }
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Permanent => write!(f, "permanent: {}", self.detail),
            FailureKind::Transient => write!(f, "transient: {}", self.detail),
        }
    }
}

impl std::error::Error for DeliveryFailure {}

/// Outbound message delivery boundary.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, owner_id: &str, text: &str) -> Result<(), DeliveryFailure>;
}
