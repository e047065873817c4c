//! Bounded fan-out/fan-in worker pool.
//!
//! The primitive every fan-out executor (Upsert, Downsert, ParallelSearch,
//! Validation) is built on: dispatch up to `width` items concurrently,
//! collect each item's outcome or error independently, stop at the group
//! deadline. One item's failure never aborts its siblings.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

/// Aggregate outcome of one fan-out group.
#[derive(Debug)]
pub struct FanOut<R> {
    /// Outcomes of items that settled successfully, in completion order.
    pub settled: Vec<R>,
    /// Per-item error messages for items that settled with a failure.
    pub errors: Vec<String>,
    /// Items still outstanding when the group deadline elapsed. They are
    /// abandoned, not force-cancelled mid-flight: underlying blocking I/O may
    /// be uninterruptible, so they are reported as neither succeeded nor
    /// failed.
    pub abandoned: usize,
    pub timed_out: bool,
}

impl<R> FanOut<R> {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty() && !self.timed_out
    }
}

/// Run `op` once per item with at most `width` in flight, collecting
/// independent per-item outcomes until all settle or `group_timeout` elapses.
pub async fn fan_out<T, R, F, Fut>(
    items: Vec<T>,
    width: usize,
    group_timeout: Duration,
    op: F,
) -> FanOut<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, String>> + Send,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(width.max(1)));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for item in items {
        let sem = sem.clone();
        let fut = op(item);
        futs.push(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Err("semaphore closed unexpectedly".to_string()),
            };
            fut.await
        });
    }

    let deadline = tokio::time::Instant::now() + group_timeout;
    let mut settled = Vec::new();
    let mut errors = Vec::new();
    let mut timed_out = false;

    loop {
        match tokio::time::timeout_at(deadline, futs.next()).await {
            Ok(Some(Ok(outcome))) => settled.push(outcome),
            Ok(Some(Err(message))) => errors.push(message),
            Ok(None) => break,
            Err(_) => {
                timed_out = true;
                break;
            }
        }
    }

    let abandoned = total - settled.len() - errors.len();
    if timed_out {
        tracing::warn!(
            settled = settled.len(),
            failed = errors.len(),
            abandoned,
            "fan-out group deadline elapsed"
        );
    }

    FanOut {
        settled,
        errors,
        abandoned,
        timed_out,
    }
}

/// Run a synchronous per-item function on the blocking pool, mapping a panic
/// into a per-item error instead of tearing down the group.
pub async fn run_blocking<R, F>(f: F) -> Result<R, String>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R, String> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(format!("worker panicked: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn collects_successes_and_errors_independently() {
        let out = fan_out(
            (0..10u32).collect::<Vec<_>>(),
            4,
            Duration::from_secs(5),
            |n| async move {
                if n % 3 == 0 {
                    Err(format!("item {n} failed"))
                } else {
                    Ok(n * 2)
                }
            },
        )
        .await;

        assert_eq!(out.settled.len(), 6);
        assert_eq!(out.errors.len(), 4);
        assert_eq!(out.abandoned, 0);
        assert!(!out.timed_out);
        assert!(!out.succeeded());
    }

    #[tokio::test]
    async fn width_bounds_in_flight_items() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let out = fan_out(
            (0..8u32).collect::<Vec<_>>(),
            2,
            Duration::from_secs(5),
            |_| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .await;

        assert_eq!(out.settled.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn group_deadline_abandons_outstanding_items() {
        let out = fan_out(
            vec![10u64, 10, 10, 10],
            1,
            Duration::from_millis(50),
            |ms| async move {
                tokio::time::sleep(Duration::from_secs(ms)).await;
                Ok(ms)
            },
        )
        .await;

        assert!(out.timed_out);
        assert_eq!(out.settled.len() + out.errors.len() + out.abandoned, 4);
        assert!(out.abandoned > 0);
    }

    #[tokio::test]
    async fn blocking_panic_becomes_item_error() {
        let res: Result<(), String> = run_blocking(|| panic!("kaboom")).await;
        let err = res.unwrap_err();
        assert!(err.contains("panicked"), "unexpected error: {err}");
    }
}
