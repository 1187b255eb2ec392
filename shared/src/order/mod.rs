//! Typed order model and dispatch events
//!
//! External order records are loosely typed and use inconsistent field
//! names; everything inward of [`normalize::from_raw`] works with the
//! strict types defined here.

mod event;
mod normalize;
mod types;

pub use event::{DispatchEvent, DispatchKind};
pub use normalize::{NormalizeError, from_raw};
pub use types::{Order, OrderStatus, OrderType};
