//! At-least-once order ingestion
//!
//! On a fixed interval, fetch orders past the cursor watermark,
//! deduplicate against the processed set, and hand each new order to the
//! dispatcher — synchronously, in ascending `created_at` order, each
//! dispatch finishing (fan-out included) before the next order starts.
//!
//! The cursor is seeded from the newest existing order at boot so a
//! restart never replays history, and advances on every observed order,
//! duplicate or not. A tick that finds the previous tick still running
//! skips instead of overlapping; ordering depends on that.

use std::sync::Arc;
use std::time::Duration;

use shared::DispatchEvent;
use shared::util::now_millis;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::availability::AvailabilityMonitor;
use crate::dispatch::NotificationDispatcher;
use crate::store::OrderStore;

use super::ProcessedSet;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Max orders fetched per tick
    pub batch_limit: usize,
    /// ProcessedSet cap, sized well past any realistic batch window
    pub processed_cap: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(10), batch_limit: 50, processed_cap: 4096 }
    }
}

/// What a single tick did, mostly for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Previous tick still in flight
    Busy,
    /// Business closed, tick is a no-op
    Closed,
    /// Store read failed; cursor retained, retry next interval
    StoreUnavailable,
    /// Tick ran; how many orders were dispatched (duplicates excluded)
    Dispatched(usize),
}

struct PollerState {
    cursor: i64,
    processed: ProcessedSet,
}

pub struct OrderIngestionPoller {
    store: Arc<dyn OrderStore>,
    availability: Arc<AvailabilityMonitor>,
    dispatcher: Arc<NotificationDispatcher>,
    config: PollerConfig,
    /// Single-flight guard and sole owner of cursor + processed set
    state: Mutex<PollerState>,
}

impl OrderIngestionPoller {
    /// Build the poller, seeding the cursor from the newest existing
    /// order. When even that read fails, seed from the wall clock — the
    /// invariant is that history is never replayed, not that the first
    /// tick sees everything.
    pub async fn initialize(
        store: Arc<dyn OrderStore>,
        availability: Arc<AvailabilityMonitor>,
        dispatcher: Arc<NotificationDispatcher>,
        config: PollerConfig,
    ) -> Self {
        let cursor = match store.latest_created_at().await {
            Ok(Some(latest)) => latest,
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!("Cursor seed read failed, seeding from wall clock: {e}");
                now_millis()
            }
        };
        tracing::info!(cursor, "Ingestion cursor seeded");

        let processed = ProcessedSet::new(config.processed_cap);
        Self {
            store,
            availability,
            dispatcher,
            config,
            state: Mutex::new(PollerState { cursor, processed }),
        }
    }

    /// One poll tick. Safe to call concurrently; overlapping calls are
    /// rejected, not queued.
    pub async fn tick(&self) -> TickOutcome {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Poll tick skipped: previous tick still in flight");
                return TickOutcome::Busy;
            }
        };

        if !self.availability.is_open().await {
            tracing::debug!("Poll tick skipped: business closed");
            return TickOutcome::Closed;
        }

        let orders = match self.store.fetch_after(state.cursor, self.config.batch_limit).await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::warn!(cursor = state.cursor, "Order fetch failed, keeping cursor: {e}");
                return TickOutcome::StoreUnavailable;
            }
        };

        let mut dispatched = 0;
        for order in orders {
            if state.processed.contains(&order.id) {
                // Idempotent skip; the watermark still moves.
                state.cursor = state.cursor.max(order.created_at);
                continue;
            }

            let event = DispatchEvent::new_order(order);
            self.dispatcher.dispatch(&event).await;
            dispatched += 1;

            // Inserted after dispatch returns, success or partial
            // failure — delivery is at-least-once, not exactly-once.
            state.processed.insert(event.order.id.clone());
            state.cursor = state.cursor.max(event.order.created_at);
        }

        if dispatched > 0 {
            tracing::info!(dispatched, cursor = state.cursor, "Poll tick dispatched orders");
        }
        TickOutcome::Dispatched(dispatched)
    }

    /// Current cursor watermark.
    pub async fn cursor(&self) -> i64 {
        self.state.lock().await.cursor
    }

    /// Run the fixed-interval poll loop until shutdown.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(interval_secs = self.config.interval.as_secs(), "Order poller started");
        let mut interval = tokio::time::interval(self.config.interval);
        interval.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
        tracing::info!("Order poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::models::ManualOverride;

    use crate::availability::{AlwaysOpen, AvailabilityMonitor, Schedule};
    use crate::dispatch::{DispatcherConfig, NotificationDispatcher, OutboundSender, PlainTemplates};
    use crate::store::{MemoryOrderStore, StaticCourierDirectory, StaticOverrideSource};

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSender {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl OutboundSender for CountingSender {
        async fn send(&self, _recipient: &str, _text: &str) -> bool {
            self.sends.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    struct Fixture {
        store: Arc<MemoryOrderStore>,
        override_source: Arc<StaticOverrideSource>,
        sender: Arc<CountingSender>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryOrderStore::new()),
                override_source: Arc::new(StaticOverrideSource::new(ManualOverride::Open)),
                sender: Arc::new(CountingSender { sends: AtomicUsize::new(0) }),
            }
        }

        async fn poller(&self, config: PollerConfig) -> OrderIngestionPoller {
            self.poller_with_schedule(config, AlwaysOpen).await
        }

        async fn poller_with_schedule(
            &self,
            config: PollerConfig,
            schedule: impl Schedule + 'static,
        ) -> OrderIngestionPoller {
            let availability = Arc::new(AvailabilityMonitor::new(
                self.override_source.clone(),
                Arc::new(schedule),
                Duration::ZERO,
            ));
            let dispatcher = Arc::new(NotificationDispatcher::new(
                self.sender.clone(),
                Arc::new(StaticCourierDirectory::new(vec![])),
                Arc::new(PlainTemplates),
                DispatcherConfig {
                    store_phone: "5511-store".to_string(),
                    courier_send_gap: Duration::ZERO,
                },
            ));
            OrderIngestionPoller::initialize(
                self.store.clone(),
                availability,
                dispatcher,
                config,
            )
            .await
        }

        fn insert_order(&self, id: &str, created_at: i64) {
            self.store
                .insert_raw(&json!({"id": id, "createdAt": created_at, "status": "pending"}))
                .unwrap();
        }

        fn sends(&self) -> usize {
            self.sender.sends.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn same_order_in_successive_ticks_dispatches_once() {
        let fx = Fixture::new();
        let poller = fx.poller(PollerConfig::default()).await;

        fx.insert_order("o-1", 100);
        assert_eq!(poller.tick().await, TickOutcome::Dispatched(1));

        // Store returns it again (cursor bug upstream, clock skew, ...):
        // ProcessedSet absorbs it.
        fx.insert_order("o-1", 150);
        assert_eq!(poller.tick().await, TickOutcome::Dispatched(0));
        assert_eq!(fx.sends(), 1, "exactly one store notification");
    }

    #[tokio::test]
    async fn cursor_is_monotone_and_tracks_last_observed_order() {
        let fx = Fixture::new();
        let poller = fx.poller(PollerConfig::default()).await;
        assert_eq!(poller.cursor().await, 0);

        fx.insert_order("o-1", 100);
        fx.insert_order("o-2", 200);
        poller.tick().await;
        assert_eq!(poller.cursor().await, 200);

        // Duplicate with a later timestamp still advances the watermark.
        fx.insert_order("o-2", 300);
        poller.tick().await;
        assert_eq!(poller.cursor().await, 300);

        // Nothing new: cursor holds.
        poller.tick().await;
        assert_eq!(poller.cursor().await, 300);
    }

    #[tokio::test]
    async fn cursor_seeded_from_newest_existing_order() {
        let fx = Fixture::new();
        fx.insert_order("historic-1", 500);
        fx.insert_order("historic-2", 900);

        let poller = fx.poller(PollerConfig::default()).await;
        assert_eq!(poller.cursor().await, 900);

        // Boot-time history is never replayed.
        assert_eq!(poller.tick().await, TickOutcome::Dispatched(0));
        assert_eq!(fx.sends(), 0);
    }

    #[tokio::test]
    async fn closed_business_makes_tick_a_no_op() {
        let fx = Fixture::new();
        fx.override_source.set(ManualOverride::Closed);
        let poller = fx.poller(PollerConfig::default()).await;

        fx.insert_order("o-1", 100);
        assert_eq!(poller.tick().await, TickOutcome::Closed);
        assert_eq!(fx.sends(), 0);
        assert_eq!(poller.cursor().await, 0, "closed ticks must not move the cursor");
    }

    #[tokio::test]
    async fn store_outage_skips_tick_and_retains_cursor() {
        let fx = Fixture::new();
        let poller = fx.poller(PollerConfig::default()).await;

        fx.insert_order("o-1", 100);
        poller.tick().await;
        assert_eq!(poller.cursor().await, 100);

        fx.store.set_fail_reads(true);
        assert_eq!(poller.tick().await, TickOutcome::StoreUnavailable);
        assert_eq!(poller.cursor().await, 100);

        // Next interval, store is back and new work flows again.
        fx.store.set_fail_reads(false);
        fx.insert_order("o-2", 200);
        assert_eq!(poller.tick().await, TickOutcome::Dispatched(1));
    }

    #[tokio::test]
    async fn batch_limit_bounds_each_tick() {
        let fx = Fixture::new();
        let poller =
            fx.poller(PollerConfig { batch_limit: 2, ..PollerConfig::default() }).await;

        for i in 1..=5 {
            fx.insert_order(&format!("o-{i}"), i * 100);
        }

        assert_eq!(poller.tick().await, TickOutcome::Dispatched(2));
        assert_eq!(poller.cursor().await, 200);
        assert_eq!(poller.tick().await, TickOutcome::Dispatched(2));
        assert_eq!(poller.tick().await, TickOutcome::Dispatched(1));
        assert_eq!(poller.cursor().await, 500);
    }

    #[tokio::test]
    async fn overlapping_tick_is_rejected() {
        let fx = Fixture::new();
        let poller = fx.poller(PollerConfig::default()).await;

        // Hold the single-flight guard the way an in-flight tick would.
        let guard = poller.state.lock().await;
        assert_eq!(poller.tick().await, TickOutcome::Busy);
        drop(guard);

        assert_eq!(poller.tick().await, TickOutcome::Dispatched(0));
    }

    #[tokio::test]
    async fn processed_set_cap_is_honored() {
        let fx = Fixture::new();
        let poller = fx
            .poller(PollerConfig { processed_cap: 2, ..PollerConfig::default() })
            .await;

        for i in 1..=4 {
            fx.insert_order(&format!("o-{i}"), i * 100);
        }
        poller.tick().await;
        assert_eq!(poller.state.lock().await.processed.len(), 2);
    }
}
