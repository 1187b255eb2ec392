use shared::{Order, OrderStatus};

/// Message-text rendering (external collaborator).
///
/// Real deployments plug a localized template engine here; the texts
/// themselves are out of this crate's scope.
pub trait Templates: Send + Sync {
    fn customer_confirmation(&self, order: &Order) -> String;
    fn store_new_order(&self, order: &Order) -> String;
    fn courier_new_delivery(&self, order: &Order) -> String;
    fn store_status_update(&self, order: &Order, status: OrderStatus) -> String;
    fn customer_order_ready(&self, order: &Order) -> String;
}

/// Minimal unstyled texts so the binary runs without the template engine.
pub struct PlainTemplates;

impl Templates for PlainTemplates {
    fn customer_confirmation(&self, order: &Order) -> String {
        format!("Order {} received, total {:.2}.", order.id, order.total_amount)
    }

    fn store_new_order(&self, order: &Order) -> String {
        format!("New {:?} order {} ({:.2}).", order.order_type, order.id, order.total_amount)
    }

    fn courier_new_delivery(&self, order: &Order) -> String {
        format!("Delivery available: order {}.", order.id)
    }

    fn store_status_update(&self, order: &Order, status: OrderStatus) -> String {
        format!("Order {} is now {}.", order.id, status)
    }

    fn customer_order_ready(&self, order: &Order) -> String {
        format!("Order {} is ready!", order.id)
    }
}
