//! Sliding-window throttle over the persisted key-value store. Checked
//! before any signing or network work happens.

use std::sync::Arc;
use std::time::Duration;

use auth_core::kv::KeyValueStore;
use tokio::sync::Mutex;

use crate::services::error::AuthError;

/// Attempts counted per window.
pub const MAX_IN_WINDOW: usize = 3;

/// Window size: five minutes.
pub const WINDOW_MS: i64 = 5 * 60 * 1000;

/// Windows whose newest entry is older than this are swept away.
pub const RETENTION_MS: i64 = 60 * 60 * 1000;

const KEY_PREFIX: &str = "rl:";

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    // Serializes load -> filter -> append -> persist so concurrent
    // attempts cannot lose updates
    guard: Mutex<()>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    pub async fn try_acquire(&self, phone_key: &str) -> Result<bool, AuthError> {
        self.try_acquire_at(phone_key, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Returns false, with no mutation, once three attempts already sit
    /// inside the window.
    pub async fn try_acquire_at(&self, phone_key: &str, now_ms: i64) -> Result<bool, AuthError> {
        let _guard = self.guard.lock().await;

        let key = format!("{}{}", KEY_PREFIX, phone_key);
        let mut stamps = self.load_window(&key).await?;

        stamps.retain(|t| now_ms - t < WINDOW_MS);

        if stamps.len() >= MAX_IN_WINDOW {
            tracing::warn!(key = %key, "Rate limit window full");
            return Ok(false);
        }

        stamps.push(now_ms);
        let raw = serde_json::to_string(&stamps)
            .map_err(|e| AuthError::Store(format!("failed to encode window: {}", e)))?;
        self.store.set(&key, &raw).await?;

        Ok(true)
    }

    pub async fn sweep(&self) -> Result<usize, AuthError> {
        self.sweep_at(chrono::Utc::now().timestamp_millis()).await
    }

    /// Drop windows whose newest entry is past retention, bounding storage
    /// growth. Returns the number of windows removed.
    pub async fn sweep_at(&self, now_ms: i64) -> Result<usize, AuthError> {
        let _guard = self.guard.lock().await;

        let mut removed = 0;
        for key in self.store.scan_prefix(KEY_PREFIX).await? {
            let stamps = self.load_window(&key).await?;
            let newest = stamps.iter().max().copied().unwrap_or(0);
            if now_ms - newest > RETENTION_MS {
                self.store.delete(&key).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "Swept expired rate-limit windows");
        }

        Ok(removed)
    }

    async fn load_window(&self, key: &str) -> Result<Vec<i64>, AuthError> {
        match self.store.get(key).await? {
            // A corrupt window resets rather than wedging every attempt
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }
}

/// Run `sweep` on a fixed interval until the handle is dropped or aborted.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            if let Err(e) = limiter.sweep().await {
                tracing::warn!(error = %e, "Rate-limit sweep failed");
            }
        }
    })
}
