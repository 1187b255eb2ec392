//! Memory 传输层实现 (同进程)
//!
//! In-process transport used by tests and local runs. Sessions record
//! outbound messages instead of hitting the network, and tests drive the
//! lifecycle by injecting [`SessionEvent`]s into the current session.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::utils::{AppError, AppResult};

use super::{Credentials, SessionEvent, SessionEvents, SessionHandle, Transport};

const EVENT_BUFFER: usize = 32;

/// One recorded outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub text: String,
}

#[derive(Default)]
struct SharedLog {
    sent: Mutex<Vec<SentMessage>>,
    fail_recipients: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
}

/// In-process transport for tests and local runs.
#[derive(Clone)]
pub struct MemoryTransport {
    log: Arc<SharedLog>,
    /// Event injector of the most recently opened session
    current: Arc<Mutex<Option<mpsc::Sender<SessionEvent>>>>,
    sessions_opened: Arc<AtomicUsize>,
    /// Emit pairing + authenticated right after open (local runs)
    auto_auth: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            log: Arc::new(SharedLog::default()),
            current: Arc::new(Mutex::new(None)),
            sessions_opened: Arc::new(AtomicUsize::new(0)),
            auto_auth: false,
        }
    }

    /// Sessions authenticate themselves immediately after opening.
    pub fn with_auto_auth() -> Self {
        Self { auto_auth: true, ..Self::new() }
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.log.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> usize {
        self.log.sent.lock().unwrap().iter().filter(|m| m.recipient == recipient).count()
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Make every send fail (transport outage).
    pub fn set_fail_all(&self, fail: bool) {
        self.log.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make sends to one recipient fail (per-recipient failure).
    pub fn fail_recipient(&self, recipient: &str) {
        self.log.fail_recipients.lock().unwrap().insert(recipient.to_string());
    }

    /// Event injector for the most recently opened session.
    pub fn current_session(&self) -> Option<mpsc::Sender<SessionEvent>> {
        self.current.lock().unwrap().clone()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open_session(
        &self,
        credentials: Option<Credentials>,
    ) -> AppResult<(Arc<dyn SessionHandle>, SessionEvents)> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = Some(tx.clone());

        if self.auto_auth {
            if credentials.is_none() {
                let _ = tx.send(SessionEvent::PairingChallenge(b"memory-pairing".to_vec())).await;
            }
            let creds = credentials
                .unwrap_or_else(|| Credentials(json!({"session": "memory"})));
            let _ = tx.send(SessionEvent::Authenticated { credentials: creds }).await;
        }

        let handle = MemorySession { log: Arc::clone(&self.log), closed: AtomicBool::new(false) };
        Ok((Arc::new(handle), rx))
    }
}

struct MemorySession {
    log: Arc<SharedLog>,
    closed: AtomicBool,
}

#[async_trait]
impl SessionHandle for MemorySession {
    async fn send(&self, recipient: &str, text: &str) -> AppResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::transport("session closed"));
        }
        if self.log.fail_all.load(Ordering::SeqCst) {
            return Err(AppError::transport("send failed (outage)"));
        }
        if self.log.fail_recipients.lock().unwrap().contains(recipient) {
            return Err(AppError::transport(format!("send to {} failed", recipient)));
        }
        self.log.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
