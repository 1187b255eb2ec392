//! Transport session lifecycle

mod manager;

pub use manager::{ConnectionConfig, ConnectionManager, ConnectionState};
