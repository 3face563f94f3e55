//! Cron-style reminder scheduling for Attache.
//!
//! [`ReminderScheduler`] polls the reminder store on a fixed cadence,
//! matches each enabled reminder's cron expression against the current
//! minute, and publishes a bus event for every reminder that comes due.

pub mod cron;
pub mod error;
pub mod scheduler;

pub use cron::{CronExpr, Field};
pub use error::{Result, SchedulerError};
pub use scheduler::{ReminderScheduler, POLL_INTERVAL};
