//! In-memory collaborator implementations (tests / local runs)

use std::sync::Mutex;

use async_trait::async_trait;
use shared::Order;
use shared::models::{Courier, ManualOverride};
use shared::order::from_raw;

use crate::transport::Credentials;
use crate::utils::{AppError, AppResult};

use super::{CourierDirectory, CredentialStore, OrderStore, OverrideSource};

// ============================================================================
// Order store
// ============================================================================

/// Order store over a plain Vec, sorted on read.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<Order>>,
    fail_reads: Mutex<bool>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Order) {
        self.orders.lock().unwrap().push(order);
    }

    /// Insert a loosely-typed record the way the real store would hold it.
    pub fn insert_raw(&self, raw: &serde_json::Value) -> AppResult<()> {
        let order = from_raw(raw).map_err(|e| AppError::invalid(e.to_string()))?;
        self.insert(order);
        Ok(())
    }

    /// Simulate a store outage for subsequent reads.
    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    fn check_available(&self) -> AppResult<()> {
        if *self.fail_reads.lock().unwrap() {
            return Err(AppError::store("order store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn fetch_after(&self, cursor_millis: i64, limit: usize) -> AppResult<Vec<Order>> {
        self.check_available()?;
        let mut matched: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.created_at > cursor_millis)
            .cloned()
            .collect();
        matched.sort_by_key(|o| o.created_at);
        matched.truncate(limit);
        Ok(matched)
    }

    async fn latest_created_at(&self) -> AppResult<Option<i64>> {
        self.check_available()?;
        Ok(self.orders.lock().unwrap().iter().map(|o| o.created_at).max())
    }
}

// ============================================================================
// Courier directory
// ============================================================================

/// Fixed courier list.
pub struct StaticCourierDirectory {
    couriers: Mutex<Vec<Courier>>,
}

impl StaticCourierDirectory {
    pub fn new(couriers: Vec<Courier>) -> Self {
        Self { couriers: Mutex::new(couriers) }
    }
}

#[async_trait]
impl CourierDirectory for StaticCourierDirectory {
    async fn active_couriers(&self) -> AppResult<Vec<Courier>> {
        Ok(self.couriers.lock().unwrap().iter().filter(|c| c.active).cloned().collect())
    }
}

// ============================================================================
// Manual override flag
// ============================================================================

/// Mutable override flag, settable from tests.
pub struct StaticOverrideSource {
    value: Mutex<ManualOverride>,
    fail_reads: Mutex<bool>,
}

impl StaticOverrideSource {
    pub fn new(value: ManualOverride) -> Self {
        Self { value: Mutex::new(value), fail_reads: Mutex::new(false) }
    }

    pub fn set(&self, value: ManualOverride) {
        *self.value.lock().unwrap() = value;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }
}

#[async_trait]
impl OverrideSource for StaticOverrideSource {
    async fn manual_override(&self) -> AppResult<ManualOverride> {
        if *self.fail_reads.lock().unwrap() {
            return Err(AppError::store("override flag unavailable"));
        }
        Ok(*self.value.lock().unwrap())
    }
}

// ============================================================================
// Credential store
// ============================================================================

/// Credential store over a Mutex'd Option.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self { credentials: Mutex::new(Some(credentials)) }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> AppResult<Option<Credentials>> {
        Ok(self.credentials.lock().unwrap().clone())
    }

    async fn save(&self, credentials: &Credentials) -> AppResult<()> {
        *self.credentials.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.credentials.lock().unwrap() = None;
        Ok(())
    }
}
