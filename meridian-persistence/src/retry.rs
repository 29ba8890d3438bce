use crate::error::PersistenceError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const BASE_DELAY: Duration = Duration::from_millis(250);
const BACKOFF_FACTOR: u32 = 2;
const MAX_ATTEMPTS: u32 = 5;

/// Retries `op` against `PersistenceError::Conflict` with the bounded,
/// jittered exponential backoff spec.md §7 mandates for serializable-isolation
/// conflicts (base 250ms, factor 2, max 5 attempts). Any other error, or
/// exhausting the attempt budget, returns immediately.
pub async fn with_conflict_retry<T, F, Fut>(mut op: F) -> Result<T, PersistenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PersistenceError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(PersistenceError::Conflict) if attempt + 1 < MAX_ATTEMPTS => {
                let backoff = BASE_DELAY * BACKOFF_FACTOR.pow(attempt);
                let jitter_ms = rand::rng().random_range(0..=backoff.as_millis() as u64 / 4 + 1);
                warn!(attempt, ?backoff, jitter_ms, "retrying after persistence conflict");
                tokio::time::sleep(backoff + Duration::from_millis(jitter_ms)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_conflicts() {
        let calls = AtomicU32::new(0);
        let result = with_conflict_retry(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(PersistenceError::Conflict)
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_conflict_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PersistenceError::Conflict)
        })
        .await;
        assert!(matches!(result, Err(PersistenceError::Conflict)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS as u32);
    }

    #[tokio::test]
    async fn non_conflict_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_conflict_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PersistenceError::NotFound("trade".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
