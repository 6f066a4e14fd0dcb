//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap peer and orderer calls with a per-call timeout
//! - Abandon calls cleanly when the caller cancels
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout and cancellation are distinct from call errors
//! - Dropping the wrapped future closes its connection

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a deadline-bounded call ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Deadline<T> {
    Completed(T),
    TimedOut,
    Cancelled,
}

/// Run `fut` until it completes, `limit` elapses, or `cancel` fires.
pub async fn with_deadline<F>(
    limit: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Deadline<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Deadline::Cancelled,
        result = tokio::time::timeout(limit, fut) => match result {
            Ok(value) => Deadline::Completed(value),
            Err(_) => Deadline::TimedOut,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_completes() {
        let token = CancellationToken::new();
        let result = with_deadline(Duration::from_secs(1), &token, async { 7 }).await;
        assert_eq!(result, Deadline::Completed(7));
    }

    #[tokio::test]
    async fn test_times_out() {
        let token = CancellationToken::new();
        let result = with_deadline(
            Duration::from_millis(20),
            &token,
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        assert_eq!(result, Deadline::TimedOut);
    }

    #[tokio::test]
    async fn test_cancellation_wins_early() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = with_deadline(
            Duration::from_secs(10),
            &token,
            tokio::time::sleep(Duration::from_secs(10)),
        )
        .await;
        assert_eq!(result, Deadline::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = with_deadline(Duration::from_secs(1), &token, async { 1 }).await;
        assert_eq!(result, Deadline::Cancelled);
    }
}
