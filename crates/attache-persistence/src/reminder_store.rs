//! Reminder persistence.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use attache_models::Reminder;

use crate::atomic::{atomic_write_json, read_json};
use crate::error::{PersistenceError, Result};

/// Manages persistence of reminders.
///
/// Reminders are stored as individual JSON files:
/// ```text
/// base_path/
/// └── reminders/
///     ├── {uuid}.json
///     └── {uuid}.json
/// ```
pub struct ReminderStore {
    base_path: PathBuf,
}

impl ReminderStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn dir(&self) -> PathBuf {
        self.base_path.join("reminders")
    }

    fn path(&self, id: &Uuid) -> PathBuf {
        self.dir().join(format!("{}.json", id))
    }

    /// Saves a reminder, replacing any previous row with the same id.
    pub fn save(&self, reminder: &Reminder) -> Result<()> {
        atomic_write_json(&self.path(&reminder.id), reminder)
    }

    /// Loads one reminder.
    pub fn load(&self, id: &Uuid) -> Result<Reminder> {
        let path = self.path(id);
        if !path.exists() {
            return Err(PersistenceError::NotFound {
                kind: "reminder".to_string(),
                id: id.to_string(),
            });
        }
        read_json(&path)
    }

    /// Lists all reminders, oldest first. Corrupt rows are skipped with a
    /// warning instead of failing the whole listing.
    pub fn list(&self) -> Result<Vec<Reminder>> {
        let dir = self.dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut reminders = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|source| PersistenceError::ReadError {
            path: dir.clone(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| PersistenceError::ReadError {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match read_json::<Reminder>(&path) {
                    Ok(reminder) => reminders.push(reminder),
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping corrupt reminder"),
                }
            }
        }

        reminders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(reminders)
    }

    /// Lists only the reminders the scheduler should evaluate.
    pub fn list_enabled(&self) -> Result<Vec<Reminder>> {
        Ok(self.list()?.into_iter().filter(|r| r.enabled).collect())
    }

    /// Deletes a reminder. Returns whether a row existed.
    pub fn delete(&self, id: &Uuid) -> Result<bool> {
        let path = self.path(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| PersistenceError::WriteError { path, source })?;
        Ok(true)
    }

    /// Records that a reminder fired at `at`.
    pub fn mark_triggered(&self, id: &Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut reminder = self.load(id)?;
        reminder.last_triggered = Some(at);
        reminder.updated_at = at;
        self.save(&reminder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = ReminderStore::new(dir.path());

        let reminder = Reminder::new("0 9 * * *", "standup");
        store.save(&reminder).unwrap();

        let loaded = store.load(&reminder.id).unwrap();
        assert_eq!(loaded.note, "standup");
        assert_eq!(loaded.cron, "0 9 * * *");
    }

    #[test]
    fn test_load_not_found() {
        let dir = tempdir().unwrap();
        let store = ReminderStore::new(dir.path());

        let result = store.load(&Uuid::new_v4());
        assert!(matches!(result, Err(PersistenceError::NotFound { .. })));
    }

    #[test]
    fn test_list_sorted_oldest_first() {
        let dir = tempdir().unwrap();
        let store = ReminderStore::new(dir.path());

        let first = Reminder::new("* * * * *", "first");
        let mut second = Reminder::new("* * * * *", "second");
        second.created_at = first.created_at + chrono::TimeDelta::seconds(1);
        // Save out of order; listing sorts by created_at.
        store.save(&second).unwrap();
        store.save(&first).unwrap();

        let notes: Vec<String> = store.list().unwrap().into_iter().map(|r| r.note).collect();
        assert_eq!(notes, vec!["first", "second"]);
    }

    #[test]
    fn test_list_enabled_filters() {
        let dir = tempdir().unwrap();
        let store = ReminderStore::new(dir.path());

        let on = Reminder::new("* * * * *", "on");
        let mut off = Reminder::new("* * * * *", "off");
        off.enabled = false;
        store.save(&on).unwrap();
        store.save(&off).unwrap();

        let enabled = store.list_enabled().unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].note, "on");
    }

    #[test]
    fn test_corrupt_row_skipped() {
        let dir = tempdir().unwrap();
        let store = ReminderStore::new(dir.path());

        store.save(&Reminder::new("* * * * *", "good")).unwrap();
        fs::write(store.dir().join("broken.json"), "{nope").unwrap();

        let reminders = store.list().unwrap();
        assert_eq!(reminders.len(), 1);
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let store = ReminderStore::new(dir.path());

        let reminder = Reminder::new("* * * * *", "gone soon");
        store.save(&reminder).unwrap();

        assert!(store.delete(&reminder.id).unwrap());
        assert!(!store.delete(&reminder.id).unwrap());
        assert!(store.load(&reminder.id).is_err());
    }

    #[test]
    fn test_mark_triggered() {
        let dir = tempdir().unwrap();
        let store = ReminderStore::new(dir.path());

        let reminder = Reminder::new("* * * * *", "fire me");
        store.save(&reminder).unwrap();

        let at = Utc::now();
        store.mark_triggered(&reminder.id, at).unwrap();

        let loaded = store.load(&reminder.id).unwrap();
        assert_eq!(loaded.last_triggered, Some(at));
        assert_eq!(loaded.updated_at, at);
    }
}
