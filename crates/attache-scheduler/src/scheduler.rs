//! The reminder polling loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use attache_events::EventBus;
use attache_models::{BusEvent, Reminder};
use attache_persistence::ReminderStore;

use crate::cron::CronExpr;
use crate::error::Result;

/// How often the scheduler re-evaluates the reminder table.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Evaluates stored reminders against the wall clock and publishes
/// [`BusEvent::ReminderTriggered`] when one comes due.
///
/// Polling runs every 15 seconds but matching happens at minute precision,
/// so a reminder fires at most once per matching minute. The trigger is
/// recorded in the store before the event goes out; a crash between the two
/// drops the notification rather than repeating it.
pub struct ReminderScheduler {
    store: Arc<ReminderStore>,
    bus: EventBus,
    shutdown: watch::Receiver<bool>,
}

impl ReminderScheduler {
    pub fn new(store: Arc<ReminderStore>, bus: EventBus, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            store,
            bus,
            shutdown,
        }
    }

    /// Runs the polling loop until shutdown is signalled.
    pub async fn run(&mut self) {
        info!(interval_secs = POLL_INTERVAL.as_secs(), "reminder scheduler started");
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll_once(Utc::now()) {
                        error!(error = %e, "reminder poll failed");
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("reminder scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One evaluation pass at the given instant.
    pub fn poll_once(&self, now: DateTime<Utc>) -> Result<()> {
        let minute = truncate_to_minute(now);

        for reminder in self.store.list_enabled()? {
            let expr = match CronExpr::parse(&reminder.cron) {
                Ok(expr) => expr,
                Err(e) => {
                    warn!(id = %reminder.id, cron = %reminder.cron, error = %e,
                        "skipping reminder with invalid cron");
                    continue;
                }
            };

            if !expr.matches(minute) {
                continue;
            }
            if already_fired_this_minute(&reminder, minute) {
                continue;
            }

            if let Err(e) = self.store.mark_triggered(&reminder.id, now) {
                error!(id = %reminder.id, error = %e, "failed to record trigger, not firing");
                continue;
            }

            debug!(id = %reminder.id, note = %reminder.note, "reminder due");
            if let Err(e) = self.bus.publish(BusEvent::ReminderTriggered {
                id: reminder.id,
                note: reminder.note.clone(),
            }) {
                error!(id = %reminder.id, error = %e, "failed to publish reminder trigger");
            }
        }

        Ok(())
    }
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::minutes(1)).unwrap_or(at)
}

fn already_fired_this_minute(reminder: &Reminder, minute: DateTime<Utc>) -> bool {
    reminder
        .last_triggered
        .map(truncate_to_minute)
        .is_some_and(|last| last == minute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_models::EventKind;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn setup() -> (
        Arc<ReminderStore>,
        EventBus,
        ReminderScheduler,
        tokio::sync::mpsc::UnboundedReceiver<BusEvent>,
    ) {
        let dir = tempdir().unwrap();
        let store = Arc::new(ReminderStore::new(dir.path()));
        // Keep the backing directory alive for the duration of the test.
        std::mem::forget(dir);

        let bus = EventBus::new();
        let (_handle, rx) = bus.subscribe_channel(EventKind::ReminderTriggered).unwrap();
        let (_tx, shutdown) = watch::channel(false);
        let scheduler = ReminderScheduler::new(store.clone(), bus.clone(), shutdown);
        (store, bus, scheduler, rx)
    }

    fn monday_9am() -> DateTime<Utc> {
        // 2025-06-02 is a Monday.
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 7).unwrap()
    }

    #[tokio::test]
    async fn test_due_reminder_fires() {
        let (store, _bus, scheduler, mut rx) = setup();
        let reminder = Reminder::new("0 9 * * 1-5", "standup");
        store.save(&reminder).unwrap();

        scheduler.poll_once(monday_9am()).unwrap();

        match rx.try_recv().unwrap() {
            BusEvent::ReminderTriggered { id, note } => {
                assert_eq!(id, reminder.id);
                assert_eq!(note, "standup");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fires_once_per_minute() {
        let (store, _bus, scheduler, mut rx) = setup();
        store.save(&Reminder::new("0 9 * * *", "once")).unwrap();

        let base = monday_9am();
        scheduler.poll_once(base).unwrap();
        // Later ticks within the same minute stay quiet.
        scheduler.poll_once(base + TimeDelta::seconds(15)).unwrap();
        scheduler.poll_once(base + TimeDelta::seconds(45)).unwrap();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_not_due_reminder_silent() {
        let (store, _bus, scheduler, mut rx) = setup();
        store.save(&Reminder::new("30 17 * * *", "evening")).unwrap();

        scheduler.poll_once(monday_9am()).unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disabled_reminder_skipped() {
        let (store, _bus, scheduler, mut rx) = setup();
        let mut reminder = Reminder::new("0 9 * * *", "muted");
        reminder.enabled = false;
        store.save(&reminder).unwrap();

        scheduler.poll_once(monday_9am()).unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_cron_does_not_block_others() {
        let (store, _bus, scheduler, mut rx) = setup();
        let mut broken = Reminder::new("not a cron", "broken");
        broken.created_at = monday_9am() - TimeDelta::days(1);
        store.save(&broken).unwrap();
        store.save(&Reminder::new("0 9 * * *", "healthy")).unwrap();

        scheduler.poll_once(monday_9am()).unwrap();

        match rx.try_recv().unwrap() {
            BusEvent::ReminderTriggered { note, .. } => assert_eq!(note, "healthy"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_trigger_recorded_before_publish() {
        let (store, _bus, scheduler, mut rx) = setup();
        let reminder = Reminder::new("0 9 * * *", "audit");
        store.save(&reminder).unwrap();

        let at = monday_9am();
        scheduler.poll_once(at).unwrap();

        assert!(rx.try_recv().is_ok());
        let loaded = store.load(&reminder.id).unwrap();
        assert_eq!(loaded.last_triggered, Some(at));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_stops_on_shutdown() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ReminderStore::new(dir.path()));
        let bus = EventBus::new();
        let (tx, shutdown) = watch::channel(false);
        let mut scheduler = ReminderScheduler::new(store, bus, shutdown);

        let task = tokio::spawn(async move { scheduler.run().await });
        tokio::time::sleep(Duration::from_secs(31)).await;

        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
