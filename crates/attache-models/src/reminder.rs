//! Persisted reminder rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cron-scheduled reminder.
///
/// `last_triggered` is the dedup anchor: the scheduler never fires a reminder
/// twice within the same calendar minute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    /// Five-field cron expression (minute hour day-of-month month day-of-week).
    pub cron: String,
    /// What to remind about.
    pub note: String,
    pub enabled: bool,
    pub last_triggered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(cron: impl Into<String>, note: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            cron: cron.into(),
            note: note.into(),
            enabled: true,
            last_triggered: None,
            created_at: now,
            updated_at: now,
        }
    }
}
