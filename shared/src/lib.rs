//! Shared types for the Waiter notification service
//!
//! Common types used across crates: the typed order model, dispatch
//! events, the raw-record normalization adapter, courier and payment-key
//! records, and small utility helpers.

pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Order re-exports (for convenient access)
pub use order::{DispatchEvent, DispatchKind, Order, OrderStatus, OrderType};
