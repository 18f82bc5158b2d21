//! # Database
//!
//! SQLite persistence for reminders. One thread-safe connection is shared
//! behind an `Arc`; SQLite's own full mutex serializes statements, and the
//! conditional UPDATE in `try_mark_delivered` makes the active → delivered
//! transition atomic per row.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Status column replaces the is_active/is_sent flag pair
//! - 1.0.0: Initial reminders table

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::info;
use sqlite::{ConnectionThreadSafe, State, Statement};
use std::sync::Arc;

use crate::features::reminders::{Reminder, ReminderStatus, ReminderStore, TIMESTAMP_FORMAT};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        body TEXT NOT NULL,
        due_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active'
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders(status, due_at);
";

const REMINDER_COLUMNS: &str = "id, owner_id, body, due_at, created_at, status";

/// SQLite-backed [`ReminderStore`]. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    connection: Arc<ConnectionThreadSafe>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &str) -> Result<Self> {
        let connection = sqlite::Connection::open_thread_safe(path)
            .with_context(|| format!("failed to open database at {path}"))?;
        connection.execute(SCHEMA)?;
        info!("Database initialised at {path}");
        Ok(Self {
            connection: Arc::new(connection),
        })
    }
}

#[async_trait]
impl ReminderStore for Database {
    async fn insert(
        &self,
        owner_id: &str,
        body: &str,
        due_at: NaiveDateTime,
        created_at: NaiveDateTime,
    ) -> Result<i64> {
        let mut statement = self.connection.prepare(
            "INSERT INTO reminders (owner_id, body, due_at, created_at, status)
             VALUES (?, ?, ?, ?, 'active')
             RETURNING id",
        )?;
        let due_at = render_timestamp(due_at);
        let created_at = render_timestamp(created_at);
        statement.bind((1, owner_id))?;
        statement.bind((2, body))?;
        statement.bind((3, due_at.as_str()))?;
        statement.bind((4, created_at.as_str()))?;

        let id = match statement.next()? {
            State::Row => statement.read::<i64, _>("id")?,
            State::Done => bail!("insert returned no row"),
        };
        // Drain the statement so the implicit transaction completes cleanly.
        while statement.next()? == State::Row {}
        Ok(id)
    }

    async fn active_for(&self, owner_id: &str) -> Result<Vec<Reminder>> {
        let mut statement = self.connection.prepare(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders
             WHERE owner_id = ? AND status = 'active'
             ORDER BY due_at",
        ))?;
        statement.bind((1, owner_id))?;
        collect_reminders(&mut statement)
    }

    async fn due(&self, now: NaiveDateTime) -> Result<Vec<Reminder>> {
        let mut statement = self.connection.prepare(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders
             WHERE status = 'active' AND due_at <= ?
             ORDER BY due_at",
        ))?;
        let now = render_timestamp(now);
        statement.bind((1, now.as_str()))?;
        collect_reminders(&mut statement)
    }

    async fn try_mark_delivered(&self, id: i64, owner_id: &str) -> Result<bool> {
        // The status guard in the WHERE clause is what makes the transition
        // one-shot under concurrent cycles.
        let mut statement = self.connection.prepare(
            "UPDATE reminders SET status = 'delivered'
             WHERE id = ? AND owner_id = ? AND status = 'active'
             RETURNING id",
        )?;
        statement.bind((1, id))?;
        statement.bind((2, owner_id))?;

        let mut transitioned = false;
        while statement.next()? == State::Row {
            transitioned = true;
        }
        Ok(transitioned)
    }
}

fn render_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .with_context(|| format!("malformed timestamp in store: {raw:?}"))
}

fn collect_reminders(statement: &mut Statement<'_>) -> Result<Vec<Reminder>> {
    let mut reminders = Vec::new();
    while statement.next()? == State::Row {
        reminders.push(read_reminder(statement)?);
    }
    Ok(reminders)
}

fn read_reminder(statement: &Statement<'_>) -> Result<Reminder> {
    let due_at = parse_timestamp(&statement.read::<String, _>("due_at")?)?;
    let created_at = parse_timestamp(&statement.read::<String, _>("created_at")?)?;
    let raw_status = statement.read::<String, _>("status")?;
    let status = ReminderStatus::parse(&raw_status)
        .with_context(|| format!("unknown reminder status in store: {raw_status:?}"))?;

    Ok(Reminder {
        id: statement.read::<i64, _>("id")?,
        owner_id: statement.read::<String, _>("owner_id")?,
        body: statement.read::<String, _>("body")?,
        due_at,
        created_at,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tokio::task::JoinSet;

    fn memory_db() -> Database {
        Database::open(":memory:").unwrap()
    }

    fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_query_roundtrip() {
        let db = memory_db();
        let id = db
            .insert("42", "Проверить почту", dt(10, 14, 30), dt(10, 12, 0))
            .await
            .unwrap();

        let reminders = db.active_for("42").await.unwrap();
        assert_eq!(reminders.len(), 1);
        let r = &reminders[0];
        assert_eq!(r.id, id);
        assert_eq!(r.owner_id, "42");
        assert_eq!(r.body, "Проверить почту");
        assert_eq!(r.due_at, dt(10, 14, 30));
        assert_eq!(r.created_at, dt(10, 12, 0));
        assert_eq!(r.status, ReminderStatus::Active);
    }

    #[tokio::test]
    async fn test_active_for_is_ordered_and_owner_scoped() {
        let db = memory_db();
        db.insert("42", "later", dt(11, 9, 0), dt(10, 12, 0))
            .await
            .unwrap();
        db.insert("42", "sooner", dt(10, 13, 0), dt(10, 12, 0))
            .await
            .unwrap();
        db.insert("99", "other", dt(10, 12, 30), dt(10, 12, 0))
            .await
            .unwrap();

        let reminders = db.active_for("42").await.unwrap();
        let bodies: Vec<&str> = reminders.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["sooner", "later"]);
    }

    #[tokio::test]
    async fn test_due_filters_by_time_and_status() {
        let db = memory_db();
        let overdue = db
            .insert("42", "overdue", dt(10, 11, 0), dt(10, 10, 0))
            .await
            .unwrap();
        let exactly_now = db
            .insert("42", "on the dot", dt(10, 12, 0), dt(10, 10, 0))
            .await
            .unwrap();
        db.insert("42", "future", dt(10, 13, 0), dt(10, 10, 0))
            .await
            .unwrap();

        let due = db.due(dt(10, 12, 0)).await.unwrap();
        let ids: Vec<i64> = due.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![overdue, exactly_now]);

        assert!(db.try_mark_delivered(overdue, "42").await.unwrap());
        let due = db.due(dt(10, 12, 0)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, exactly_now);
    }

    #[tokio::test]
    async fn test_mark_delivered_is_idempotent() {
        let db = memory_db();
        let id = db
            .insert("42", "чай", dt(10, 11, 0), dt(10, 10, 0))
            .await
            .unwrap();

        assert!(db.try_mark_delivered(id, "42").await.unwrap());
        assert!(!db.try_mark_delivered(id, "42").await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_delivered_checks_ownership_and_existence() {
        let db = memory_db();
        let id = db
            .insert("42", "чай", dt(10, 11, 0), dt(10, 10, 0))
            .await
            .unwrap();

        assert!(!db.try_mark_delivered(id, "99").await.unwrap());
        assert!(!db.try_mark_delivered(id + 1000, "42").await.unwrap());
        // Still active after the failed attempts.
        assert_eq!(db.active_for("42").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_mark_delivered_transitions_once() {
        let db = memory_db();
        let id = db
            .insert("42", "гонка", dt(10, 11, 0), dt(10, 10, 0))
            .await
            .unwrap();

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let db = db.clone();
            tasks.spawn(async move { db.try_mark_delivered(id, "42").await.unwrap() });
        }

        let mut transitions = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap() {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1);
    }
}
