use serde::{Deserialize, Serialize};

// ============================================================================
// Order Status
// ============================================================================

/// 订单状态
///
/// Parsing accepts the store's English values plus the pt-BR aliases the
/// upstream panel writes, so a status change is never dropped over
/// spelling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Parse a raw status string, accepting locale aliases.
    ///
    /// Returns `None` for values outside the known set; callers decide
    /// whether unknown means "default" (ingestion) or "ignore" (dispatch).
    pub fn parse(raw: &str) -> Option<Self> {
        let norm = raw.trim().to_ascii_lowercase();
        let status = match norm.as_str() {
            "pending" | "pendente" | "aguardando" => Self::Pending,
            "confirmed" | "confirmado" | "aceito" => Self::Confirmed,
            "preparing" | "preparando" | "em_preparo" | "em preparo" => Self::Preparing,
            "ready" | "pronto" | "pronta" => Self::Ready,
            "out_for_delivery" | "saiu_para_entrega" | "saiu para entrega" | "em_rota" => {
                Self::OutForDelivery
            }
            "delivered" | "entregue" => Self::Delivered,
            "completed" | "finalizado" | "concluido" | "concluído" => Self::Completed,
            "cancelled" | "canceled" | "cancelado" => Self::Cancelled,
            _ => return None,
        };
        Some(status)
    }

    /// Whether this status triggers at least one outbound message.
    pub fn is_notify_worthy(&self) -> bool {
        matches!(
            self,
            Self::Confirmed
                | Self::Preparing
                | Self::Ready
                | Self::OutForDelivery
                | Self::Delivered
                | Self::Completed
        )
    }

    /// Stable label used in logs and message templates.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order Type
// ============================================================================

/// 订单类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Delivery,
    #[default]
    Pickup,
    DineIn,
}

impl OrderType {
    pub fn parse(raw: &str) -> Option<Self> {
        let norm = raw.trim().to_ascii_lowercase();
        let order_type = match norm.as_str() {
            "delivery" | "entrega" => Self::Delivery,
            "pickup" | "takeout" | "retirada" => Self::Pickup,
            "dine_in" | "dinein" | "mesa" | "local" => Self::DineIn,
            _ => return None,
        };
        Some(order_type)
    }
}

// ============================================================================
// Order
// ============================================================================

/// Strictly-typed order snapshot, read-only inside the service.
///
/// Built only through [`super::from_raw`]; the external store owns the
/// record, we never write back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Opaque unique id assigned by the store
    pub id: String,
    /// Creation timestamp, epoch millis, monotonically assigned by the store
    pub created_at: i64,
    pub status: OrderStatus,
    pub order_type: OrderType,
    /// Digits-only customer phone, when the record carries one
    pub customer_phone: Option<String>,
    pub total_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_accepts_locale_aliases() {
        assert_eq!(OrderStatus::parse("READY"), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::parse("pronto"), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::parse("saiu_para_entrega"), Some(OrderStatus::OutForDelivery));
        assert_eq!(OrderStatus::parse("finalizado"), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::parse("  confirmado "), Some(OrderStatus::Confirmed));
        assert_eq!(OrderStatus::parse("banana"), None);
    }

    #[test]
    fn notify_worthy_excludes_pending_and_cancelled() {
        assert!(!OrderStatus::Pending.is_notify_worthy());
        assert!(!OrderStatus::Cancelled.is_notify_worthy());
        assert!(OrderStatus::Confirmed.is_notify_worthy());
        assert!(OrderStatus::Ready.is_notify_worthy());
        assert!(OrderStatus::Delivered.is_notify_worthy());
    }

    #[test]
    fn order_type_parse() {
        assert_eq!(OrderType::parse("entrega"), Some(OrderType::Delivery));
        assert_eq!(OrderType::parse("dine_in"), Some(OrderType::DineIn));
        assert_eq!(OrderType::parse("drive_thru"), None);
    }
}
