//! # Reminder Scheduler
//!
//! Polling loop that finds due reminders, delivers them concurrently and
//! reconciles the outcomes against the store.
//!
//! Each cycle fans the due reminders out as independent tokio tasks; a
//! failure in one attempt never aborts the others. Successful deliveries and
//! permanently unreachable recipients are recorded through the store's
//! conditional transition, so a reminder is marked delivered at most once
//! even if two cycles ever race on the same row. Transient failures leave the
//! reminder active and it is retried on the next cycle.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.9.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Explicit per-instance state machine, structured delivery outcomes
//! - 1.0.0: Initial polling checker

use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;

use super::{DeliveryChannel, DeliveryFailure, Reminder, ReminderStore};

/// Lifecycle of a scheduler instance. Owned by the instance, never global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopping,
            _ => SchedulerState::Stopped,
        }
    }
}

/// Result of a single delivery attempt, joined back for reconciliation.
struct DeliveryOutcome {
    reminder: Reminder,
    result: Result<(), DeliveryFailure>,
}

/// Drives the recurring poll → dispatch → reconcile cycle.
pub struct ReminderScheduler {
    store: Arc<dyn ReminderStore>,
    channel: Arc<dyn DeliveryChannel>,
    state: AtomicU8,
}

impl ReminderScheduler {
    pub fn new(store: Arc<dyn ReminderStore>, channel: Arc<dyn DeliveryChannel>) -> Self {
        Self {
            store,
            channel,
            state: AtomicU8::new(SchedulerState::Idle as u8),
        }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Start the polling loop on the current tokio runtime.
    ///
    /// Allowed from `Idle` and `Stopped`; returns false when the scheduler is
    /// already running or winding down.
    pub fn start(self: &Arc<Self>, interval: Duration) -> bool {
        let started = self.transition_to_running(SchedulerState::Idle)
            || self.transition_to_running(SchedulerState::Stopped);
        if !started {
            warn!("Reminder scheduler already running, start ignored");
            return false;
        }

        info!(
            "⏰ Reminder scheduler started (poll interval {}s)",
            interval.as_secs()
        );
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.run(interval).await;
        });
        true
    }

    /// Request a cooperative stop. Idempotent. The loop observes the request
    /// at one-second granularity, so shutdown latency does not depend on the
    /// poll interval; in-flight delivery attempts are left to complete.
    pub fn stop(&self) {
        let requested = self
            .state
            .compare_exchange(
                SchedulerState::Running as u8,
                SchedulerState::Stopping as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if requested {
            info!("🛑 Reminder scheduler stop requested");
        }
    }

    fn transition_to_running(&self, from: SchedulerState) -> bool {
        self.state
            .compare_exchange(
                from as u8,
                SchedulerState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    async fn run(&self, interval: Duration) {
        while self.state() == SchedulerState::Running {
            // A bad cycle (store down etc.) must not kill the scheduler; the
            // next cycle simply proceeds after the interval.
            if let Err(err) = self.run_cycle().await {
                error!("Reminder cycle failed: {err:#}");
            }
            self.sleep_between_cycles(interval).await;
        }
        self.state
            .store(SchedulerState::Stopped as u8, Ordering::SeqCst);
        info!("✅ Reminder scheduler stopped");
    }

    /// Sleep `interval` in one-second slices, watching the stop flag between
    /// slices so `stop()` does not have to wait out a long interval.
    async fn sleep_between_cycles(&self, interval: Duration) {
        let ticks = interval.as_secs().max(1);
        for _ in 0..ticks {
            if self.state() != SchedulerState::Running {
                return;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    /// One poll → dispatch → reconcile pass.
    async fn run_cycle(&self) -> Result<()> {
        let now = chrono::Local::now().naive_local();
        let due = self.store.due(now).await?;

        if due.is_empty() {
            debug!("📭 No reminders due");
            return Ok(());
        }

        info!("📨 {} reminder(s) due for delivery", due.len());
        let outcomes = self.dispatch(due).await;
        self.reconcile(outcomes).await;
        Ok(())
    }

    /// Fan the due reminders out as independent delivery tasks and join them
    /// in completion order. Delivery to one user never blocks another.
    async fn dispatch(&self, due: Vec<Reminder>) -> Vec<DeliveryOutcome> {
        let mut attempts = JoinSet::new();
        for reminder in due {
            let channel = Arc::clone(&self.channel);
            attempts.spawn(async move {
                let text = render_notification(&reminder.body);
                let result = channel.send(&reminder.owner_id, &text).await;
                DeliveryOutcome { reminder, result }
            });
        }

        let mut outcomes = Vec::with_capacity(attempts.len());
        while let Some(joined) = attempts.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => error!("Delivery task failed to complete: {err}"),
            }
        }
        outcomes
    }

    async fn reconcile(&self, outcomes: Vec<DeliveryOutcome>) {
        for outcome in outcomes {
            let reminder = outcome.reminder;
            match outcome.result {
                Ok(()) => {
                    info!(
                        "🔔 Reminder {} delivered to user {}",
                        reminder.id, reminder.owner_id
                    );
                    self.mark_delivered(&reminder).await;
                }
                Err(failure) if failure.is_permanent() => {
                    warn!(
                        "Reminder {} dropped, recipient {} unreachable: {failure}",
                        reminder.id, reminder.owner_id
                    );
                    self.mark_delivered(&reminder).await;
                }
                Err(failure) => {
                    warn!(
                        "Reminder {} delivery failed, will retry next cycle: {failure}",
                        reminder.id
                    );
                }
            }
        }
    }

    /// Conditional transition; `false` means another cycle got there first.
    async fn mark_delivered(&self, reminder: &Reminder) {
        match self
            .store
            .try_mark_delivered(reminder.id, &reminder.owner_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!("Reminder {} was already delivered", reminder.id),
            Err(err) => error!(
                "Failed to record delivery of reminder {}: {err:#}",
                reminder.id
            ),
        }
    }
}

/// Message pushed to the user when a reminder fires.
fn render_notification(body: &str) -> String {
    format!("🔔 **Напоминание!**\n\n📝 {body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::testing::{MemoryStore, StubChannel};
    use crate::features::reminders::ReminderStatus;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::atomic::AtomicBool;

    async fn insert_overdue(store: &MemoryStore, owner: &str) -> i64 {
        let now = chrono::Local::now().naive_local();
        store
            .insert(owner, "проверить почту", now - chrono::Duration::seconds(1), now)
            .await
            .unwrap()
    }

    fn scheduler(store: Arc<MemoryStore>, channel: Arc<StubChannel>) -> Arc<ReminderScheduler> {
        Arc::new(ReminderScheduler::new(store, channel))
    }

    #[tokio::test]
    async fn test_cycle_delivers_overdue_reminder_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(StubChannel::ok());
        let id = insert_overdue(&store, "42").await;

        let scheduler = scheduler(Arc::clone(&store), Arc::clone(&channel));
        scheduler.run_cycle().await.unwrap();

        assert_eq!(channel.sent_count(), 1);
        assert_eq!(store.get(id).unwrap().status, ReminderStatus::Delivered);
        {
            let sent = channel.sent.lock().unwrap();
            assert_eq!(sent[0].0, "42");
            assert!(sent[0].1.contains("проверить почту"));
        }

        // Second cycle must not attempt delivery again.
        scheduler.run_cycle().await.unwrap();
        assert_eq!(channel.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_terminal() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(StubChannel::failing(vec![DeliveryFailure::permanent(
            "user blocked the bot",
        )]));
        let id = insert_overdue(&store, "42").await;

        let scheduler = scheduler(Arc::clone(&store), Arc::clone(&channel));
        scheduler.run_cycle().await.unwrap();

        assert_eq!(channel.sent_count(), 1);
        assert_eq!(store.get(id).unwrap().status, ReminderStatus::Delivered);

        scheduler.run_cycle().await.unwrap();
        assert_eq!(channel.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_next_cycle() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(StubChannel::failing(vec![DeliveryFailure::transient(
            "http 500",
        )]));
        let id = insert_overdue(&store, "42").await;

        let scheduler = scheduler(Arc::clone(&store), Arc::clone(&channel));
        scheduler.run_cycle().await.unwrap();

        assert_eq!(channel.sent_count(), 1);
        assert_eq!(store.get(id).unwrap().status, ReminderStatus::Active);

        // Script exhausted, the retry succeeds.
        scheduler.run_cycle().await.unwrap();
        assert_eq!(channel.sent_count(), 2);
        assert_eq!(store.get(id).unwrap().status, ReminderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_other_deliveries() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(StubChannel::failing(vec![DeliveryFailure::transient(
            "flaky network",
        )]));
        insert_overdue(&store, "42").await;
        insert_overdue(&store, "43").await;
        insert_overdue(&store, "44").await;

        let scheduler = scheduler(Arc::clone(&store), Arc::clone(&channel));
        scheduler.run_cycle().await.unwrap();

        // All three attempts went out; exactly one stays active for retry.
        assert_eq!(channel.sent_count(), 3);
        let now = chrono::Local::now().naive_local();
        assert_eq!(store.due(now).await.unwrap().len(), 1);
    }

    /// Store whose `due` query fails on demand; everything else delegates.
    struct FlakyStore {
        inner: MemoryStore,
        fail_next_due: AtomicBool,
    }

    #[async_trait]
    impl crate::features::reminders::ReminderStore for FlakyStore {
        async fn insert(
            &self,
            owner_id: &str,
            body: &str,
            due_at: NaiveDateTime,
            created_at: NaiveDateTime,
        ) -> Result<i64> {
            self.inner.insert(owner_id, body, due_at, created_at).await
        }

        async fn active_for(&self, owner_id: &str) -> Result<Vec<Reminder>> {
            self.inner.active_for(owner_id).await
        }

        async fn due(&self, now: NaiveDateTime) -> Result<Vec<Reminder>> {
            if self.fail_next_due.swap(false, Ordering::SeqCst) {
                anyhow::bail!("database is locked");
            }
            self.inner.due(now).await
        }

        async fn try_mark_delivered(&self, id: i64, owner_id: &str) -> Result<bool> {
            self.inner.try_mark_delivered(id, owner_id).await
        }
    }

    #[tokio::test]
    async fn test_cycle_error_does_not_poison_later_cycles() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_next_due: AtomicBool::new(true),
        });
        let channel = Arc::new(StubChannel::ok());
        insert_overdue(&store.inner, "42").await;

        let scheduler = Arc::new(ReminderScheduler::new(
            Arc::clone(&store) as Arc<dyn ReminderStore>,
            Arc::clone(&channel) as Arc<dyn DeliveryChannel>,
        ));

        assert!(scheduler.run_cycle().await.is_err());
        assert_eq!(channel.sent_count(), 0);

        scheduler.run_cycle().await.unwrap();
        assert_eq!(channel.sent_count(), 1);
    }

    async fn wait_for_state(scheduler: &ReminderScheduler, state: SchedulerState) {
        while scheduler.state() != state {
            sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_a_long_sleep() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(StubChannel::ok());
        let scheduler = scheduler(store, channel);

        assert!(scheduler.start(Duration::from_secs(60)));
        assert_eq!(scheduler.state(), SchedulerState::Running);

        // Let the first cycle run and the loop enter its sleep.
        sleep(Duration::from_millis(10)).await;
        scheduler.stop();

        let stopped = tokio::time::timeout(
            Duration::from_secs(2),
            wait_for_state(&scheduler, SchedulerState::Stopped),
        )
        .await;
        assert!(stopped.is_ok(), "stop was not honored within two seconds");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_state_machine() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(StubChannel::ok());
        let scheduler = scheduler(store, channel);

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.start(Duration::from_secs(1)));
        assert!(!scheduler.start(Duration::from_secs(1)));

        scheduler.stop();
        scheduler.stop(); // idempotent
        wait_for_state(&scheduler, SchedulerState::Stopped).await;

        // A stopped scheduler can be started again.
        assert!(scheduler.start(Duration::from_secs(1)));
        scheduler.stop();
        wait_for_state(&scheduler, SchedulerState::Stopped).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_loop_delivers_on_schedule() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(StubChannel::ok());
        let id = insert_overdue(&store, "42").await;

        let scheduler = scheduler(Arc::clone(&store), Arc::clone(&channel));
        assert!(scheduler.start(Duration::from_secs(1)));

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.get(id).unwrap().status != ReminderStatus::Delivered {
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("reminder was not delivered by the running loop");

        assert_eq!(channel.sent_count(), 1);
        scheduler.stop();
        wait_for_state(&scheduler, SchedulerState::Stopped).await;
    }

    #[test]
    fn test_notification_text_carries_the_body() {
        let text = render_notification("Позвонить маме");
        assert!(text.contains("Напоминание"));
        assert!(text.contains("Позвонить маме"));
    }
}
