use serde::{Deserialize, Serialize};

/// Courier directory entry (external, read-only).
///
/// Dispatch only cares about active entries with a non-empty phone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Courier {
    pub id: String,
    pub name: String,
    /// May be empty for couriers registered without a reachable number
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub active: bool,
}

impl Courier {
    /// Whether this courier can currently receive a notification.
    pub fn is_reachable(&self) -> bool {
        self.active && !self.phone.trim().is_empty()
    }
}
