use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use shared::models::ManualOverride;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::store::OverrideSource;

/// Day-of-week / time-of-day business hours (external collaborator).
pub trait Schedule: Send + Sync {
    fn is_open_at(&self, at: DateTime<Local>) -> bool;
}

#[derive(Clone, Copy)]
struct CachedFlag {
    value: ManualOverride,
    read_at: Instant,
}

/// Resolves whether the business is currently open.
///
/// The manual override is read through a TTL cache so every poller tick
/// does not hit the config store; `Unset` falls back to the schedule,
/// which is evaluated fresh on each call (it is local arithmetic). A
/// failed override read retains the previous cached flag, stale or not.
pub struct AvailabilityMonitor {
    source: Arc<dyn OverrideSource>,
    schedule: Arc<dyn Schedule>,
    ttl: Duration,
    cached: Mutex<Option<CachedFlag>>,
}

impl AvailabilityMonitor {
    pub fn new(source: Arc<dyn OverrideSource>, schedule: Arc<dyn Schedule>, ttl: Duration) -> Self {
        Self { source, schedule, ttl, cached: Mutex::new(None) }
    }

    pub async fn is_open(&self) -> bool {
        let flag = self.override_flag().await;
        match flag {
            ManualOverride::Open => true,
            ManualOverride::Closed => false,
            ManualOverride::Unset => self.schedule.is_open_at(Local::now()),
        }
    }

    async fn override_flag(&self) -> ManualOverride {
        let mut cached = self.cached.lock().await;

        if let Some(flag) = *cached
            && flag.read_at.elapsed() < self.ttl
        {
            return flag.value;
        }

        match self.source.manual_override().await {
            Ok(value) => {
                *cached = Some(CachedFlag { value, read_at: Instant::now() });
                value
            }
            Err(e) => {
                tracing::warn!("Override flag read failed, keeping cached value: {e}");
                // Keep the stale entry; fall back to Unset only when we
                // have never read successfully.
                cached.as_ref().map(|f| f.value).unwrap_or(ManualOverride::Unset)
            }
        }
    }
}
