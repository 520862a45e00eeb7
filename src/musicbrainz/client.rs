use std::{future::Future, time::Duration};

use tokio::{
    sync::Mutex,
    time::{Instant, sleep, sleep_until},
};

use crate::{error::SearchError, warning};

/// Pacing and retry settings for [`RateLimitedClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Minimum gap between two request starts. MusicBrainz allows one per second.
    pub min_delay: Duration,
    /// Wait before the single retry of a 502/503 answer.
    pub retry_backoff: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1100),
            retry_backoff: Duration::from_secs(3),
        }
    }
}

/// Serializes calls to one rate-limited service.
///
/// All clones of the owning resolver share one instance, so the pacing is
/// process wide: the lock is held while waiting out the delay, which queues
/// concurrent callers behind each other.
#[derive(Debug)]
pub struct RateLimitedClient {
    config: RateLimitConfig,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimitedClient {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(None),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Runs `call` once the pacing delay has passed.
    ///
    /// A transient failure is retried exactly once after the backoff. Anything
    /// else, including a second transient failure, is logged and turned into
    /// `None`.
    pub async fn request<T, F, Fut>(&self, what: &str, mut call: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        self.pace().await;
        match call().await {
            Ok(value) => Some(value),
            Err(e) if e.is_transient() => {
                warning!(
                    "{} ({}), retrying in {}s",
                    e,
                    what,
                    self.config.retry_backoff.as_secs_f32()
                );
                sleep(self.config.retry_backoff).await;
                self.pace().await;
                match call().await {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warning!("Giving up on {}: {}", what, e);
                        None
                    }
                }
            }
            Err(e) => {
                warning!("Lookup failed for {}: {}", what, e);
                None
            }
        }
    }

    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.config.min_delay;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
