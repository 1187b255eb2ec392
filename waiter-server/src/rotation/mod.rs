//! Rotating payment-identifier selection

mod selector;

pub use selector::{KeyRotationSelector, RotationConfig};
