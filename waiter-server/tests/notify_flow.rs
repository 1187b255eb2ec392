//! End-to-end flow over the in-process transport: order store -> poller
//! -> dispatcher -> connection manager -> transport session.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use shared::models::{Courier, ManualOverride, PaymentKey};
use tokio_util::sync::CancellationToken;

use waiter_server::availability::AlwaysOpen;
use waiter_server::connection::ConnectionState;
use waiter_server::dispatch::PlainTemplates;
use waiter_server::ingestion::TickOutcome;
use waiter_server::store::{
    MemoryCredentialStore, MemoryOrderStore, StaticCourierDirectory, StaticOverrideSource,
};
use waiter_server::transport::MemoryTransport;
use waiter_server::{AppState, Collaborators, Config};

struct Harness {
    transport: MemoryTransport,
    orders: Arc<MemoryOrderStore>,
    override_source: Arc<StaticOverrideSource>,
    state: AppState,
}

fn test_config() -> Config {
    Config {
        store_phone: "5511000000000".to_string(),
        poll_interval: Duration::from_millis(50),
        poll_batch_limit: 50,
        processed_cap: 4096,
        backoff_base: Duration::from_millis(10),
        max_reconnect_attempts: 6,
        courier_send_gap: Duration::ZERO,
        block_window: Duration::from_secs(6 * 3600),
        history_retention: Duration::from_secs(24 * 3600),
        availability_ttl: Duration::ZERO,
        payment_keys: vec![
            PaymentKey {
                label: "key-a".to_string(),
                value: "a@bank".to_string(),
                owner_name: "Ana".to_string(),
            },
            PaymentKey {
                label: "key-b".to_string(),
                value: "b@bank".to_string(),
                owner_name: "Bea".to_string(),
            },
        ],
        log_dir: None,
        environment: "test".to_string(),
    }
}

async fn harness(couriers: Vec<Courier>) -> Harness {
    let transport = MemoryTransport::with_auto_auth();
    let orders = Arc::new(MemoryOrderStore::new());
    let override_source = Arc::new(StaticOverrideSource::new(ManualOverride::Unset));

    let collaborators = Collaborators {
        transport: Arc::new(transport.clone()),
        credentials: Arc::new(MemoryCredentialStore::new()),
        orders: orders.clone(),
        couriers: Arc::new(StaticCourierDirectory::new(couriers)),
        override_source: override_source.clone(),
        schedule: Arc::new(AlwaysOpen),
        templates: Arc::new(PlainTemplates),
    };

    let state =
        AppState::initialize(test_config(), collaborators, CancellationToken::new()).await;
    Harness { transport, orders, override_source, state }
}

async fn connect(h: &Harness) {
    h.state.connection.start().await;
    for _ in 0..200 {
        if h.state.connection.state().await == ConnectionState::Connected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("connection did not reach Connected");
}

fn courier(id: &str, phone: &str) -> Courier {
    Courier {
        id: id.to_string(),
        name: id.to_string(),
        phone: phone.to_string(),
        active: true,
    }
}

#[tokio::test]
async fn delivery_order_reaches_customer_store_and_couriers() {
    let h = harness(vec![courier("c-1", "5511111111111"), courier("c-2", "5511222222222")]).await;
    connect(&h).await;

    h.orders
        .insert_raw(&json!({
            "id": "ord-1",
            "createdAt": 1_000,
            "status": "pending",
            "orderType": "delivery",
            "customerPhone": "5511999999999",
            "totalAmount": 42.5,
        }))
        .unwrap();

    assert_eq!(h.state.poller.tick().await, TickOutcome::Dispatched(1));

    let recipients: Vec<String> =
        h.transport.sent_messages().into_iter().map(|m| m.recipient).collect();
    assert_eq!(
        recipients,
        vec!["5511999999999", "5511000000000", "5511111111111", "5511222222222"],
        "customer first, then store, then couriers"
    );

    // A second tick must not re-notify anyone.
    assert_eq!(h.state.poller.tick().await, TickOutcome::Dispatched(0));
    assert_eq!(h.transport.sent_messages().len(), 4);
}

#[tokio::test]
async fn pickup_order_skips_couriers() {
    let h = harness(vec![courier("c-1", "5511111111111")]).await;
    connect(&h).await;

    h.orders
        .insert_raw(&json!({
            "id": "ord-2",
            "createdAt": 2_000,
            "status": "pending",
            "orderType": "pickup",
            "customerPhone": "5511999999999",
        }))
        .unwrap();

    h.state.poller.tick().await;
    assert_eq!(h.transport.sent_to("5511111111111"), 0);
    assert_eq!(h.transport.sent_to("5511999999999"), 1);
    assert_eq!(h.transport.sent_to("5511000000000"), 1);
}

#[tokio::test]
async fn closed_override_gates_the_whole_pipeline() {
    let h = harness(vec![]).await;
    connect(&h).await;
    h.override_source.set(ManualOverride::Closed);

    h.orders
        .insert_raw(&json!({"id": "ord-3", "createdAt": 3_000, "status": "pending"}))
        .unwrap();

    assert_eq!(h.state.poller.tick().await, TickOutcome::Closed);
    assert!(h.transport.sent_messages().is_empty());

    // Flip back open: the order is picked up on the next tick.
    h.override_source.set(ManualOverride::Open);
    assert_eq!(h.state.poller.tick().await, TickOutcome::Dispatched(1));
}

#[tokio::test]
async fn disconnected_transport_drops_sends_but_ingestion_continues() {
    let h = harness(vec![]).await;
    // No connect(): the session was never established.

    h.orders
        .insert_raw(&json!({"id": "ord-4", "createdAt": 4_000, "status": "pending"}))
        .unwrap();

    assert_eq!(h.state.poller.tick().await, TickOutcome::Dispatched(1));
    assert!(h.transport.sent_messages().is_empty());
    assert!(h.state.dispatcher.failed_send_count() > 0);

    // The order is marked processed: reconnecting later must not replay it.
    connect(&h).await;
    assert_eq!(h.state.poller.tick().await, TickOutcome::Dispatched(0));
    assert!(h.transport.sent_messages().is_empty());
}

#[tokio::test]
async fn configured_payment_keys_rotate_fairly() {
    let h = harness(vec![]).await;
    let selector = &h.state.rotation;

    for i in 0..10 {
        let key = selector.select(&format!("551199999{i:04}"));
        assert!(key.is_some());
    }
    let counts = selector.usage_counts();
    assert_eq!(counts.iter().sum::<u64>(), 10);
    assert!(counts.iter().max().unwrap() - counts.iter().min().unwrap() <= 1);
}
