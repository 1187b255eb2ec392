//! Best-effort notification fan-out
//!
//! One dispatch event fans out to customer, store and couriers. Every
//! recipient send is independent: a failure is logged and counted, the
//! siblings still go out, and nothing propagates to the caller. Send
//! retry policy deliberately does not live here — delivery is
//! best-effort per recipient.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use shared::{DispatchEvent, DispatchKind, Order, OrderStatus, OrderType};

use crate::store::CourierDirectory;

use super::Templates;

/// Single-attempt outbound send. Implemented by the connection manager;
/// tests substitute mocks.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// `false` means the message did not go out; never panics.
    async fn send(&self, recipient: &str, text: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Store staff number receiving every notification
    pub store_phone: String,
    /// Pause between consecutive courier sends (transport rate limits)
    pub courier_send_gap: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { store_phone: String::new(), courier_send_gap: Duration::from_millis(500) }
    }
}

pub struct NotificationDispatcher {
    sender: Arc<dyn OutboundSender>,
    couriers: Arc<dyn CourierDirectory>,
    templates: Arc<dyn Templates>,
    config: DispatcherConfig,
    failed_sends: AtomicU64,
}

impl NotificationDispatcher {
    pub fn new(
        sender: Arc<dyn OutboundSender>,
        couriers: Arc<dyn CourierDirectory>,
        templates: Arc<dyn Templates>,
        config: DispatcherConfig,
    ) -> Self {
        Self { sender, couriers, templates, config, failed_sends: AtomicU64::new(0) }
    }

    /// Route one ingestion event.
    pub async fn dispatch(&self, event: &DispatchEvent) {
        match &event.kind {
            DispatchKind::New => self.dispatch_new(&event.order).await,
            DispatchKind::StatusChanged { .. } => {
                self.dispatch_status_change(&event.order, event.order.status).await
            }
        }
    }

    /// New-order fan-out: customer (when reachable), store, and for
    /// delivery orders every reachable courier.
    pub async fn dispatch_new(&self, order: &Order) {
        tracing::info!(order_id = %order.id, order_type = ?order.order_type, "Dispatching new order");

        if let Some(phone) = &order.customer_phone {
            self.deliver("customer", phone, &self.templates.customer_confirmation(order)).await;
        }

        self.deliver("store", &self.config.store_phone, &self.templates.store_new_order(order))
            .await;

        if order.order_type == OrderType::Delivery {
            self.notify_couriers(order).await;
        }
    }

    /// Status-change fan-out. Statuses outside the notify-worthy set are
    /// ignored; the store always hears about notify-worthy ones; the
    /// customer only hears about `Ready`.
    pub async fn dispatch_status_change(&self, order: &Order, new_status: OrderStatus) {
        if !new_status.is_notify_worthy() {
            tracing::debug!(order_id = %order.id, status = %new_status, "Status not notify-worthy, ignoring");
            return;
        }

        tracing::info!(order_id = %order.id, status = %new_status, "Dispatching status change");

        self.deliver(
            "store",
            &self.config.store_phone,
            &self.templates.store_status_update(order, new_status),
        )
        .await;

        if new_status == OrderStatus::Ready
            && let Some(phone) = &order.customer_phone
        {
            self.deliver("customer", phone, &self.templates.customer_order_ready(order)).await;
        }
    }

    /// Total sends that came back failed since construction.
    pub fn failed_send_count(&self) -> u64 {
        self.failed_sends.load(Ordering::Relaxed)
    }

    async fn notify_couriers(&self, order: &Order) {
        let couriers = match self.couriers.active_couriers().await {
            Ok(list) => list,
            Err(e) => {
                // Directory outage degrades the fan-out, never the dispatch.
                tracing::warn!(order_id = %order.id, "Courier directory read failed: {e}");
                return;
            }
        };

        let text = self.templates.courier_new_delivery(order);
        let mut first = true;
        for courier in couriers.iter().filter(|c| c.is_reachable()) {
            if !first {
                tokio::time::sleep(self.config.courier_send_gap).await;
            }
            first = false;
            self.deliver("courier", &courier.phone, &text).await;
        }
    }

    /// One recipient, one attempt. Failures are counted and logged only.
    async fn deliver(&self, audience: &str, recipient: &str, text: &str) -> bool {
        if recipient.trim().is_empty() {
            tracing::warn!(audience, "Skipping send to empty recipient");
            self.failed_sends.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let ok = self.sender.send(recipient, text).await;
        if !ok {
            self.failed_sends.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(audience, recipient, "Send failed");
        }
        ok
    }
}
