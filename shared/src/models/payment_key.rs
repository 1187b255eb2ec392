use serde::{Deserialize, Serialize};

/// One rotating payment identifier from the static configuration list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentKey {
    /// Short label shown to operators ("pix-maria")
    pub label: String,
    /// The identifier handed to the requester
    pub value: String,
    /// Account owner, for staff-facing logs
    pub owner_name: String,
}
