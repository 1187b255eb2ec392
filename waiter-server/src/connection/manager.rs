//! Connection lifecycle state machine
//!
//! Owns the single outbound transport session: authentication, QR-style
//! pairing, reconnection. Designed to run indefinitely — every closure is
//! classified and answered with a retry plan, never a permanent give-up.
//!
//! Each `start()` call carries a monotonically increasing generation tag;
//! lifecycle events and retry timers from a superseded generation are
//! ignored, so a stale reconnect timer can never tear down a newer
//! session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::OutboundSender;
use crate::store::CredentialStore;
use crate::transport::{CloseReason, SessionEvent, SessionEvents, SessionHandle, Transport};

/// Externally observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Transport issued a pairing challenge and waits for it to be scanned
    AwaitingPairing,
    Connected,
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Backoff base: delay = base * 2^reconnect_attempts
    pub backoff_base: Duration,
    /// Attempts beyond this reset the counters and keep retrying
    pub max_reconnect_attempts: u32,
    /// Short fixed delay before re-pairing after a forced logout
    pub forced_logout_delay: Duration,
    /// Fixed moderate delay for unclassified closures
    pub fallback_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_secs(2),
            max_reconnect_attempts: 6,
            forced_logout_delay: Duration::from_secs(3),
            fallback_delay: Duration::from_secs(15),
        }
    }
}

/// What to do after a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RetryPlan {
    /// Credentials are dead: drop them, then retry after the delay
    ClearCredentials { delay: Duration },
    Retry { delay: Duration },
    /// Initial handshake still in flight (pairing event coming) — no timer
    Wait,
}

/// Mutable lifecycle state, touched only under the manager's lock.
#[derive(Default)]
struct Lifecycle {
    state: ConnectionState,
    pairing_challenge: Option<Vec<u8>>,
    pairing_attempts_since_auth: u32,
    reconnect_attempts: u32,
    ever_authenticated: bool,
    session: Option<Arc<dyn SessionHandle>>,
    event_task: Option<JoinHandle<()>>,
}

impl Lifecycle {
    /// Classify a closure and update counters. State mutation only — the
    /// caller performs the I/O the plan asks for.
    fn plan_close(&mut self, reason: &CloseReason, config: &ConnectionConfig) -> RetryPlan {
        self.state = ConnectionState::Disconnected;
        self.session = None;
        // The challenge belongs to the session that just died; it is only
        // observable while AwaitingPairing.
        self.pairing_challenge = None;

        if *reason == CloseReason::ForcedLogout {
            self.reconnect_attempts = 0;
            self.pairing_attempts_since_auth = 0;
            return RetryPlan::ClearCredentials { delay: config.forced_logout_delay };
        }

        if reason.is_transient() || self.ever_authenticated {
            self.reconnect_attempts += 1;
            if self.reconnect_attempts > config.max_reconnect_attempts {
                // Exhausted the ladder: reset counters, start over at the
                // base delay. Never give up permanently.
                self.reconnect_attempts = 0;
                self.pairing_attempts_since_auth = 0;
                return RetryPlan::Retry { delay: config.backoff_base };
            }
            return RetryPlan::Retry {
                delay: backoff_delay(config.backoff_base, self.reconnect_attempts),
            };
        }

        if self.pairing_attempts_since_auth == 0 {
            // Never authenticated and no pairing challenge issued yet:
            // the initial handshake is still in flight.
            return RetryPlan::Wait;
        }

        RetryPlan::Retry { delay: config.fallback_delay }
    }
}

/// Exponential backoff, saturating well past any sane attempt cap.
fn backoff_delay(base: Duration, attempts: u32) -> Duration {
    base.saturating_mul(1u32.checked_shl(attempts.min(16)).unwrap_or(u32::MAX))
}

pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    config: ConnectionConfig,
    generation: AtomicU64,
    inner: Mutex<Lifecycle>,
    shutdown: CancellationToken,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        config: ConnectionConfig,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            credentials,
            config,
            generation: AtomicU64::new(0),
            inner: Mutex::new(Lifecycle::default()),
            shutdown,
        })
    }

    /// Establish (or re-establish) the session.
    ///
    /// Tears down any previous transport handle first so two live
    /// sessions never coexist, then opens a new session under a fresh
    /// generation tag.
    pub async fn start(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(generation, "Starting transport session");

        // Teardown of the superseded session: detach its event task, close
        // the handle.
        let old_session = {
            let mut inner = self.inner.lock().await;
            if let Some(task) = inner.event_task.take() {
                task.abort();
            }
            inner.state = ConnectionState::Disconnected;
            inner.pairing_challenge = None;
            inner.session.take()
        };
        if let Some(session) = old_session {
            session.close().await;
        }

        let stored = match self.credentials.load().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Credential load failed, pairing from scratch: {e}");
                None
            }
        };

        match self.transport.open_session(stored).await {
            Ok((session, events)) => {
                let mut inner = self.inner.lock().await;
                if self.current_generation() != generation {
                    // A newer start() superseded us while the session was
                    // opening; discard this one.
                    drop(inner);
                    session.close().await;
                    return;
                }
                inner.session = Some(session);
                inner.event_task =
                    Some(tokio::spawn(Arc::clone(self).run_events(generation, events)));
            }
            Err(e) => {
                // No session means no pairing event in flight; always put
                // a timer on the wire here or the manager would stall.
                tracing::warn!(generation, "Session open failed: {e}");
                self.schedule_retry(generation, self.config.fallback_delay);
            }
        }
    }

    /// Single send attempt. `false` on any failure; sends are never
    /// retried here — retry policy for messages belongs to the caller.
    pub async fn send(&self, recipient: &str, text: &str) -> bool {
        let session = {
            let inner = self.inner.lock().await;
            if inner.state != ConnectionState::Connected {
                None
            } else {
                inner.session.clone()
            }
        };
        let Some(session) = session else {
            tracing::debug!(recipient, "Send skipped: not connected");
            return false;
        };
        match session.send(recipient, text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(recipient, "Send failed: {e}");
                false
            }
        }
    }

    /// Stop for good: cancel timers and the event loop, close the session.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        // Invalidate any in-flight retry timers.
        self.generation.fetch_add(1, Ordering::SeqCst);
        let session = {
            let mut inner = self.inner.lock().await;
            if let Some(task) = inner.event_task.take() {
                task.abort();
            }
            inner.state = ConnectionState::Disconnected;
            inner.session.take()
        };
        if let Some(session) = session {
            session.close().await;
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Opaque pairing payload, present only while `AwaitingPairing`.
    pub async fn pairing_challenge(&self) -> Option<Vec<u8>> {
        self.inner.lock().await.pairing_challenge.clone()
    }

    pub async fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().await.reconnect_attempts
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn run_events(self: Arc<Self>, generation: u64, mut events: SessionEvents) {
        while let Some(event) = events.recv().await {
            if self.shutdown.is_cancelled() {
                return;
            }
            if self.current_generation() != generation {
                // Stale session still flushing events after a newer
                // start(); drop everything it says.
                tracing::debug!(generation, "Ignoring event from superseded session");
                return;
            }
            match event {
                SessionEvent::PairingChallenge(payload) => self.on_pairing(payload).await,
                SessionEvent::Authenticated { credentials } => {
                    let mut inner = self.inner.lock().await;
                    inner.state = ConnectionState::Connected;
                    inner.reconnect_attempts = 0;
                    inner.pairing_attempts_since_auth = 0;
                    inner.pairing_challenge = None;
                    inner.ever_authenticated = true;
                    drop(inner);
                    tracing::info!(generation, "Transport authenticated");
                    if let Err(e) = self.credentials.save(&credentials).await {
                        tracing::warn!("Credential save failed: {e}");
                    }
                }
                SessionEvent::Closed(reason) => {
                    tracing::warn!(generation, ?reason, "Transport session closed");
                    let plan = {
                        let mut inner = self.inner.lock().await;
                        inner.plan_close(&reason, &self.config)
                    };
                    self.apply_plan(generation, plan).await;
                    return;
                }
            }
        }
    }

    async fn on_pairing(&self, payload: Vec<u8>) {
        let mut inner = self.inner.lock().await;
        if inner.state == ConnectionState::Connected {
            return;
        }
        inner.state = ConnectionState::AwaitingPairing;
        inner.pairing_attempts_since_auth += 1;
        let attempt = inner.pairing_attempts_since_auth;
        inner.pairing_challenge = Some(payload);
        drop(inner);
        tracing::info!(attempt, "Pairing challenge received, waiting for link");
    }

    async fn apply_plan(self: &Arc<Self>, generation: u64, plan: RetryPlan) {
        match plan {
            RetryPlan::ClearCredentials { delay } => {
                tracing::warn!("Forced logout: clearing stored credentials, re-pairing");
                if let Err(e) = self.credentials.clear().await {
                    tracing::warn!("Credential clear failed: {e}");
                }
                self.schedule_retry(generation, delay);
            }
            RetryPlan::Retry { delay } => {
                self.schedule_retry(generation, delay);
            }
            RetryPlan::Wait => {
                tracing::debug!(generation, "Initial handshake in flight, no retry scheduled");
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, generation: u64, delay: Duration) {
        tracing::info!(generation, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = manager.shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if manager.current_generation() != generation {
                // A newer start() superseded this timer.
                return;
            }
            manager.start().await;
        });
    }
}

#[async_trait]
impl OutboundSender for ConnectionManager {
    async fn send(&self, recipient: &str, text: &str) -> bool {
        ConnectionManager::send(self, recipient, text).await
    }
}
