//! # Reminder Service
//!
//! Intake-facing operations over the reminder store: create a reminder from a
//! raw time expression, list a user's active reminders, cancel one.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.9.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation

use anyhow::Result;
use chrono::NaiveDateTime;
use log::{debug, info};
use std::sync::Arc;

use super::parser;
use super::{Reminder, ReminderStatus, ReminderStore};

/// Operations exposed to the command surface. Cheap to clone.
#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
}

impl ReminderService {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }

    /// Create a reminder from a raw time expression.
    ///
    /// Returns `Ok(None)` when the expression matches no recognized form;
    /// that is user input to be reported back synchronously, not a system
    /// fault. Store failures surface as `Err`.
    pub async fn create(
        &self,
        owner_id: &str,
        time_text: &str,
        body: &str,
        now: NaiveDateTime,
    ) -> Result<Option<Reminder>> {
        let Some(due_at) = parser::parse_time(time_text, now) else {
            debug!("Unrecognized time expression from user {owner_id}: {time_text:?}");
            return Ok(None);
        };

        let id = self.store.insert(owner_id, body, due_at, now).await?;
        info!("Created reminder {id} for user {owner_id}, due {due_at}");

        Ok(Some(Reminder {
            id,
            owner_id: owner_id.to_string(),
            body: body.to_string(),
            due_at,
            created_at: now,
            status: ReminderStatus::Active,
        }))
    }

    /// Active reminders for one user, soonest first.
    pub async fn list_active(&self, owner_id: &str) -> Result<Vec<Reminder>> {
        self.store.active_for(owner_id).await
    }

    /// Cancel an active reminder. Returns false when the id does not exist,
    /// belongs to someone else, or was already delivered.
    ///
    /// Cancellation reuses the store's terminal status transition, so a
    /// cancelled reminder can never be picked up by the scheduler again.
    pub async fn cancel(&self, id: i64, owner_id: &str) -> Result<bool> {
        let cancelled = self.store.try_mark_delivered(id, owner_id).await?;
        if cancelled {
            info!("Cancelled reminder {id} for user {owner_id}");
        }
        Ok(cancelled)
    }
}
