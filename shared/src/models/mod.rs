//! External collaborator record types

mod courier;
mod payment_key;

pub use courier::Courier;
pub use payment_key::PaymentKey;

use serde::{Deserialize, Serialize};

/// Manual open/closed override kept in configuration.
///
/// `Unset` defers to the business-hours schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ManualOverride {
    Open,
    Closed,
    #[default]
    Unset,
}
