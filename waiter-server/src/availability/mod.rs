//! Open/closed resolution
//!
//! Gates order ingestion: a manual override wins, an external schedule
//! collaborator fills in when the override is unset.

mod monitor;

pub use monitor::{AvailabilityMonitor, Schedule};

use chrono::{DateTime, Local};

/// Store-hours schedule (external collaborator; the arithmetic behind it
/// is out of scope here).
pub struct AlwaysOpen;

impl Schedule for AlwaysOpen {
    fn is_open_at(&self, _at: DateTime<Local>) -> bool {
        true
    }
}
