use serde::{Deserialize, Serialize};

use super::{Order, OrderStatus};

/// What kind of order transition produced a dispatch event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DispatchKind {
    /// A freshly created order crossed the ingestion cursor
    New,
    /// An existing order entered a notify-worthy status
    StatusChanged { previous: Option<OrderStatus> },
}

/// Internal notification of an order creation or notify-worthy status
/// change. Created by the poller, consumed exactly once by the
/// dispatcher, then discarded — never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchEvent {
    pub kind: DispatchKind,
    /// Order snapshot taken at observation time
    pub order: Order,
}

impl DispatchEvent {
    pub fn new_order(order: Order) -> Self {
        Self { kind: DispatchKind::New, order }
    }

    pub fn status_changed(order: Order, previous: Option<OrderStatus>) -> Self {
        Self { kind: DispatchKind::StatusChanged { previous }, order }
    }

    pub fn order_id(&self) -> &str {
        &self.order.id
    }
}
