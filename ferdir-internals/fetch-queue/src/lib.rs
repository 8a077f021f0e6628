//! Ferdir Fetch Queue
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! ferdir-internals/fetch-queue
//! Bounded-concurrency queue for backend API calls, retrying transient
//! failures with exponential backoff and jitter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time;

/// Error returned once a fetch is given up on
#[derive(Debug, Error)]
pub enum FetchQueueError {
    #[error("gave up after {attempts} attempt(s)")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("permanent failure")]
    Permanent(#[source] anyhow::Error),
    #[error("queue is closed")]
    QueueClosed,
}

/// Outcome of a single failed attempt.
///
/// Transient failures (network errors, 5xx) are retried, permanent ones
/// (4xx, undecodable payloads) are returned immediately.
#[derive(Debug)]
pub enum FetchFailure {
    Transient(anyhow::Error),
    Permanent(anyhow::Error),
}

impl FetchFailure {
    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        Self::Transient(err.into())
    }

    pub fn permanent(err: impl Into<anyhow::Error>) -> Self {
        Self::Permanent(err.into())
    }
}

impl From<anyhow::Error> for FetchFailure {
    fn from(err: anyhow::Error) -> Self {
        Self::Transient(err)
    }
}

/// Backoff settings applied between attempts
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the current delay added as random jitter, 0.0 disables it
    pub jitter_factor: f64,
    pub max_retries: u32,
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter_factor: 0.5,
            max_retries: 3,
            exponential: true,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.max(0.0);
        self
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        if self.exponential {
            std::cmp::min(delay * 2, self.max_delay)
        } else {
            delay
        }
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor == 0.0 {
            return delay;
        }

        let jitter_ms = (delay.as_millis() as f64 * self.jitter_factor) as u64;
        let rand_jitter = rand::thread_rng().gen_range(0..=jitter_ms);

        delay + Duration::from_millis(rand_jitter)
    }
}

/// Limits the number of in-flight backend requests and retries transient
/// failures.
///
/// Clones share the same permits, so one queue can back every clone of an
/// API client.
///
/// ```ignore
/// let queue = FetchQueue::new(4, RetryPolicy::default());
/// let places = queue.run("places", || async { fetch().await.map_err(FetchFailure::transient) }).await?;
/// ```
#[derive(Clone, Debug)]
pub struct FetchQueue {
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl Default for FetchQueue {
    fn default() -> Self {
        Self::new(4, RetryPolicy::default())
    }
}

impl FetchQueue {
    pub fn new(max_concurrent: usize, policy: RetryPolicy) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `f` while holding a permit, retrying transient failures.
    ///
    /// The permit is held across retries so a failing endpoint cannot be
    /// hammered by more than `max_concurrent` callers at once.
    pub async fn run<T, F, Fut>(&self, label: &str, mut f: F) -> Result<T, FetchQueueError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, FetchFailure>> + Send,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchQueueError::QueueClosed)?;

        let mut attempts = 0;
        let mut delay = self.policy.initial_delay;

        loop {
            attempts += 1;
            match f().await {
                Ok(value) => {
                    if attempts > 1 {
                        tracing::debug!("[{}] succeeded after {} attempts", label, attempts);
                    }
                    return Ok(value);
                }
                Err(FetchFailure::Permanent(e)) => {
                    tracing::debug!("[{}] permanent failure: {:#}", label, e);
                    return Err(FetchQueueError::Permanent(e));
                }
                Err(FetchFailure::Transient(e)) => {
                    if attempts > self.policy.max_retries {
                        tracing::warn!("[{}] giving up after {} attempts: {:#}", label, attempts, e);
                        return Err(FetchQueueError::RetriesExhausted {
                            attempts,
                            source: e,
                        });
                    }

                    let wait = self.policy.apply_jitter(delay);
                    tracing::debug!(
                        "[{}] attempt {} failed ({:#}), retrying in {:?}",
                        label,
                        attempts,
                        e,
                        wait
                    );
                    time::sleep(wait).await;
                    delay = self.policy.next_delay(delay);
                }
            }
        }
    }
}
