//! External collaborator boundaries
//!
//! The order store, courier directory, manual-override flag and
//! credential store are owned by other systems. Each is a small trait so
//! the core stays testable and deployment wiring stays out of the
//! components. [`memory`] carries in-process implementations for tests
//! and local runs.

pub mod memory;

pub use memory::{MemoryCredentialStore, MemoryOrderStore, StaticCourierDirectory, StaticOverrideSource};

use async_trait::async_trait;
use shared::Order;
use shared::models::{Courier, ManualOverride};

use crate::transport::Credentials;
use crate::utils::AppResult;

/// Read-only view of the external order store.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders with `created_at > cursor_millis`, ascending by `created_at`,
    /// at most `limit` records.
    async fn fetch_after(&self, cursor_millis: i64, limit: usize) -> AppResult<Vec<Order>>;

    /// `created_at` of the newest existing order, if any. Used to seed the
    /// ingestion cursor so history is never replayed.
    async fn latest_created_at(&self) -> AppResult<Option<i64>>;
}

/// Courier directory (external).
#[async_trait]
pub trait CourierDirectory: Send + Sync {
    /// Currently active couriers; entries without a phone are still
    /// returned and filtered at dispatch time.
    async fn active_couriers(&self) -> AppResult<Vec<Courier>>;
}

/// Manual open/closed override flag (external config key).
#[async_trait]
pub trait OverrideSource: Send + Sync {
    async fn manual_override(&self) -> AppResult<ManualOverride>;
}

/// Opaque transport-credential persistence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> AppResult<Option<Credentials>>;
    async fn save(&self, credentials: &Credentials) -> AppResult<()>;
    async fn clear(&self) -> AppResult<()>;
}
