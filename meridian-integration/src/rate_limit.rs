use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, oneshot};

/// Priority levels for rate limited operations against the Market Data Hub's
/// pull surface. Ordered so that `Execution` requests are served before a
/// contemporaneous `Discovery` request when tokens are scarce.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Priority {
    Execution,
    PortfolioValuation,
    Charts,
    Discovery,
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("exceeded maximum wait of {0:?} for a rate limit permit")]
    MaxWaitExceeded(Duration),
}

struct Waiter {
    tx: oneshot::Sender<()>,
}

struct Inner {
    capacity: usize,
    tokens: usize,
    interval: Duration,
    last_refill: Instant,
    base_interval: Duration,
    max_interval: Duration,
    queues: [VecDeque<Waiter>; 4],
}

impl Inner {
    fn refill(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= self.interval {
            let periods =
                now.duration_since(self.last_refill).as_millis() / self.interval.as_millis();
            let add_tokens = (periods as usize + 1) * self.capacity;
            self.last_refill = now;
            self.tokens = usize::min(self.tokens + add_tokens, self.capacity);
            while self.tokens > 0 {
                let Some(waiter) = self.queues.iter_mut().find_map(|q| q.pop_front()) else {
                    break;
                };
                self.tokens -= 1;
                let _ = waiter.tx.send(());
            }
            if self.tokens > self.capacity {
                self.tokens = self.capacity;
            }
        }
    }

    fn queue_for(&mut self, priority: Priority) -> &mut VecDeque<Waiter> {
        &mut self.queues[priority as usize]
    }
}

/// Token bucket rate limiter with priority queues and adaptive backoff,
/// shared per upstream key (eg/ per account, per IP) as the exchange's own
/// rate-limit scheme requires.
///
/// Callers whose request would otherwise have to wait suspend cooperatively
/// via [`RateLimiter::acquire`] rather than failing; [`RateLimiter::acquire_with_max_wait`]
/// bounds that suspension for callers that would rather surface
/// `RateLimited` than block indefinitely.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Inner>>,
}

impl RateLimiter {
    /// Construct a new [`RateLimiter`] allowing `capacity` operations every `interval`.
    pub fn new(capacity: usize, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                capacity,
                tokens: capacity,
                interval,
                last_refill: Instant::now(),
                base_interval: interval,
                max_interval: interval * 16,
                queues: Default::default(),
            })),
        }
    }

    /// Acquire a permit according to the provided priority, suspending
    /// cooperatively until one is available.
    pub async fn acquire(&self, priority: Priority) {
        loop {
            let rx = {
                let mut inner = self.inner.lock().await;
                inner.refill();
                if inner.tokens > 0 {
                    inner.tokens -= 1;
                    None
                } else {
                    let (tx, rx) = oneshot::channel();
                    inner.queue_for(priority).push_back(Waiter { tx });
                    Some(rx)
                }
            };
            match rx {
                None => return,
                Some(rx) => {
                    let _ = rx.await;
                }
            }
        }
    }

    /// As [`acquire`](Self::acquire), but gives up after `max_wait` and
    /// returns [`RateLimitError::MaxWaitExceeded`] instead of suspending
    /// forever.
    pub async fn acquire_with_max_wait(
        &self,
        priority: Priority,
        max_wait: Duration,
    ) -> Result<(), RateLimitError> {
        tokio::time::timeout(max_wait, self.acquire(priority))
            .await
            .map_err(|_| RateLimitError::MaxWaitExceeded(max_wait))
    }

    /// Report a rate limit violation (eg/ a 429 from upstream) to trigger backoff.
    pub async fn report_violation(&self) {
        let mut inner = self.inner.lock().await;
        let next = inner.interval * 2;
        inner.interval = std::cmp::min(next, inner.max_interval);
    }

    /// Reset the current backoff to the base interval.
    pub async fn reset_backoff(&self) {
        let mut inner = self.inner.lock().await;
        inner.interval = inner.base_interval;
    }
}
