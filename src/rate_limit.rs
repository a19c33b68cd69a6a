use chrono::{DateTime, TimeDelta, Utc};
use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

/// Wait applied when the quota endpoint itself cannot be queried.
pub const FALLBACK_WAIT: Duration = Duration::from_secs(60);

/// Source of wall clock time and sleeping, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Real time backed by `chrono` and the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Remaining API quota as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds
    pub reset: i64,
}

impl Quota {
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Anything that can report the current quota without being rate limited itself.
pub trait QuotaProbe: Send + Sync {
    fn quota(&self) -> BoxFuture<'_, Result<Quota>>;
}

/// Read the `X-RateLimit-*` headers of an API response.
pub fn quota_from_headers(headers: &HeaderMap) -> Option<Quota> {
    let read = |name: &str| headers.get(name)?.to_str().ok()?.trim().parse::<i64>().ok();

    let remaining = read("X-RateLimit-Remaining")?;
    let reset = read("X-RateLimit-Reset")?;
    let limit = read("X-RateLimit-Limit").unwrap_or(0);

    Some(Quota {
        limit: u32::try_from(limit).unwrap_or(0),
        remaining: u32::try_from(remaining).unwrap_or(0),
        reset,
    })
}

/// Blocks callers until GitHub's quota window allows another request.
///
/// The only state is the reset time recorded when the quota ran out. It is
/// cleared again as soon as a probe reports capacity.
pub struct RateLimiter {
    reset_at: Mutex<Option<DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        RateLimiter {
            reset_at: Mutex::new(None),
            clock,
        }
    }

    pub async fn reset_at(&self) -> Option<DateTime<Utc>> {
        *self.reset_at.lock().await
    }

    /// Wait until a remote call may be made. Never fails; at worst it delays.
    pub async fn ensure_capacity<P: QuotaProbe + ?Sized>(&self, probe: &P) {
        let pending = *self.reset_at.lock().await;
        if let Some(reset_at) = pending {
            if self.clock.now() < reset_at {
                self.wait_until(reset_at).await;
            }
        }

        match probe.quota().await {
            Ok(quota) if quota.remaining == 0 => {
                let reset_at = quota.reset_at();
                *self.reset_at.lock().await = Some(reset_at);
                self.wait_until(reset_at).await;
            }
            Ok(quota) => {
                debug!("Rate limit: {}/{}", quota.remaining, quota.limit);
                // A reset observed by another request meanwhile is kept
                // unless it has already passed.
                let mut reset_at = self.reset_at.lock().await;
                let now = self.clock.now();
                if *reset_at == pending || reset_at.is_some_and(|r| r <= now) {
                    *reset_at = None;
                }
            }
            Err(e) => {
                warn!("Error fetching rate limit: {}", e);
                let reset_at = self.clock.now() + fallback_delta();
                *self.reset_at.lock().await = Some(reset_at);
                warn!(
                    "Waiting for {} seconds before retrying.",
                    FALLBACK_WAIT.as_secs()
                );
                self.clock.sleep(FALLBACK_WAIT).await;
            }
        }
    }

    /// Record an exhausted quota seen in response headers so the next
    /// `ensure_capacity` waits before probing.
    pub async fn observe(&self, headers: &HeaderMap) {
        if let Some(quota) = quota_from_headers(headers) {
            if quota.remaining == 0 {
                debug!("Quota exhausted, resets at {}", quota.reset_at());
                *self.reset_at.lock().await = Some(quota.reset_at());
            }
        }
    }

    async fn wait_until(&self, reset_at: DateTime<Utc>) {
        let wait = (reset_at - self.clock.now()).to_std().unwrap_or_default();
        if wait.is_zero() {
            return;
        }
        warn!(
            "Rate limit exceeded. Waiting for {} seconds.",
            wait.as_secs_f64()
        );
        self.clock.sleep(wait).await;
    }
}

fn fallback_delta() -> TimeDelta {
    TimeDelta::from_std(FALLBACK_WAIT).unwrap_or_else(|_| TimeDelta::seconds(60))
}
