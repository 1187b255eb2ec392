//! Transport 传输层抽象
//!
//! The messaging transport is an external library boundary. It is modeled
//! as a session factory plus a bounded set of typed lifecycle events, so
//! the whole connection lifecycle lives in one explicit state machine
//! ([`crate::connection::ConnectionManager`]) instead of scattered
//! untyped callbacks.
//!
//! ```text
//!         ┌────────────────────┐
//!         │  Transport Trait   │  ◄── 可插拔接口
//!         └────────┬───────────┘
//!                  │ open_session(credentials?)
//!                  ▼
//!      (SessionHandle, SessionEvents)
//! ```

pub mod memory;

pub use memory::MemoryTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::utils::AppResult;

/// Opaque credential payload issued by the transport on authentication.
///
/// The service persists and replays it verbatim; its shape belongs to the
/// transport library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials(pub serde_json::Value);

/// Why a session closed, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The account was logged out remotely; stored credentials are dead
    ForcedLogout,
    Timeout,
    /// Another device took over the session
    Replaced,
    Closed,
    RestartRequired,
    Other(String),
}

impl CloseReason {
    /// Transient closures are retried with backoff rather than re-paired.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Replaced | Self::Closed | Self::RestartRequired)
    }
}

/// Lifecycle events a session emits, in the order the transport fires them.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Out-of-band credential-linking payload (QR-style pairing)
    PairingChallenge(Vec<u8>),
    /// Authentication confirmed; credentials are worth persisting now
    Authenticated { credentials: Credentials },
    /// Session ended; no further events follow on this receiver
    Closed(CloseReason),
}

pub type SessionEvents = mpsc::Receiver<SessionEvent>;

/// Live session handle. `send` is a single attempt; timeouts are the
/// transport's business.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> AppResult<()>;

    /// Detach listeners and close the socket. Idempotent.
    async fn close(&self);
}

/// Session factory — one live session at a time per manager.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session, resuming with `credentials` when available.
    async fn open_session(
        &self,
        credentials: Option<Credentials>,
    ) -> AppResult<(Arc<dyn SessionHandle>, SessionEvents)>;
}
