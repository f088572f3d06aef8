//! Pool Shutdown
//!
//! Two entry points used at service teardown:
//!
//! - [`shutdown_gracefully`]: stop accepting work, wait up to the pool's
//!   graceful timeout (one minute by default) for submitted work, then
//!   cancel whatever is left.
//! - [`shutdown_immediately`]: cancel everything at once.
//!
//! Neither returns an error. An interrupt raised while waiting is treated
//! exactly like the timeout elapsing: it is re-raised on the caller's
//! [`Interrupt`] and the pool is forcibly terminated.

use crate::pool::interrupt::Interrupt;
use crate::pool::worker::{Interrupted, WorkerPool};
use tracing::{debug, info, warn};

/// Shuts `pool` down gracefully with no way to interrupt the wait.
pub async fn shutdown_gracefully(pool: &WorkerPool) {
    shutdown_gracefully_until(pool, &Interrupt::new()).await
}

/// Shuts `pool` down gracefully, escalating to forced shutdown if the
/// graceful timeout elapses or `interrupt` is raised during the wait.
///
/// Calling this on a pool that already terminated returns immediately.
pub async fn shutdown_gracefully_until(pool: &WorkerPool, interrupt: &Interrupt) {
    if pool.is_terminated() {
        debug!(pool = %pool.config().name, "Pool already terminated");
        return;
    }

    pool.shutdown();

    let timeout = pool.config().graceful_timeout;
    match pool.await_termination(timeout, interrupt).await {
        Ok(true) => {
            info!(pool = %pool.config().name, "Worker pool terminated gracefully");
        }
        Ok(false) => {
            warn!(
                pool = %pool.config().name,
                timeout_ms = timeout.as_millis(),
                outstanding = pool.outstanding(),
                "Graceful shutdown timed out, cancelling remaining work"
            );
            pool.shutdown_now();
        }
        Err(Interrupted) => {
            interrupt.raise();
            warn!(
                pool = %pool.config().name,
                outstanding = pool.outstanding(),
                "Interrupted during graceful shutdown, cancelling remaining work"
            );
            pool.shutdown_now();
        }
    }
}

/// Cancels all queued and running work on `pool` without waiting.
pub fn shutdown_immediately(pool: &WorkerPool) {
    let cancelled = pool.shutdown_now();
    debug!(pool = %pool.config().name, cancelled = cancelled, "Immediate shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::worker::{PoolConfig, PoolState, GRACEFUL_SHUTDOWN_TIMEOUT};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_test::assert_ok;

    fn default_pool() -> WorkerPool {
        WorkerPool::new(PoolConfig {
            name: "teardown".to_string(),
            workers: 2,
            ..Default::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_completes_all_work() {
        let pool = default_pool();
        let done = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..10 {
            let done = Arc::clone(&done);
            handles.push(assert_ok!(pool.submit(async move {
                tokio::time::sleep(Duration::from_millis(10 * i)).await;
                done.fetch_add(1, Ordering::SeqCst);
            })));
        }

        shutdown_gracefully(&pool).await;

        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(pool.state(), PoolState::Terminated);
        for handle in handles {
            assert!(handle.await.is_ok());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_forces_stuck_work_after_bound() {
        let pool = default_pool();
        let stuck = assert_ok!(pool.submit(std::future::pending::<()>()));

        let start = Instant::now();
        shutdown_gracefully(&pool).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= GRACEFUL_SHUTDOWN_TIMEOUT);
        assert!(elapsed < GRACEFUL_SHUTDOWN_TIMEOUT + Duration::from_secs(1));
        assert_eq!(pool.state(), PoolState::ForceTerminated);
        assert!(stuck.await.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_forced_path_discards_queued_work() {
        let pool = WorkerPool::new(PoolConfig {
            workers: 1,
            graceful_timeout: Duration::from_secs(5),
            ..Default::default()
        });
        let ran = Arc::new(AtomicUsize::new(0));

        let _stuck = assert_ok!(pool.submit(std::future::pending::<()>()));
        let queued = {
            let ran = Arc::clone(&ran);
            assert_ok!(pool.submit(async move {
                ran.fetch_add(1, Ordering::SeqCst);
            }))
        };

        shutdown_gracefully(&pool).await;

        assert!(queued.await.unwrap_err().is_cancelled());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(pool.state(), PoolState::ForceTerminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_escalates_and_is_reasserted() {
        let pool = default_pool();
        let stuck = assert_ok!(pool.submit(std::future::pending::<()>()));

        let interrupt = Interrupt::new();
        {
            let interrupt = interrupt.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                interrupt.raise();
            });
        }

        let start = Instant::now();
        shutdown_gracefully_until(&pool, &interrupt).await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(interrupt.is_raised());
        assert_eq!(pool.state(), PoolState::ForceTerminated);
        assert!(stuck.await.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_interrupted_caller_forces_at_once() {
        let pool = default_pool();
        let _stuck = assert_ok!(pool.submit(std::future::pending::<()>()));

        let interrupt = Interrupt::new();
        interrupt.raise();

        let start = Instant::now();
        shutdown_gracefully_until(&pool, &interrupt).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(interrupt.is_raised());
        assert_eq!(pool.state(), PoolState::ForceTerminated);
    }

    #[tokio::test]
    async fn test_immediate_returns_promptly() {
        let pool = default_pool();
        let handle = assert_ok!(pool.submit(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }));

        let start = std::time::Instant::now();
        shutdown_immediately(&pool);
        assert!(start.elapsed() < Duration::from_secs(1));

        assert_eq!(pool.state(), PoolState::ForceTerminated);
        assert!(handle.await.unwrap_err().is_cancelled());

        let err = pool.submit(async {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_shutdown_is_noop() {
        let pool = default_pool();
        let _stuck = assert_ok!(pool.submit(std::future::pending::<()>()));

        shutdown_gracefully(&pool).await;
        assert_eq!(pool.state(), PoolState::ForceTerminated);

        let start = Instant::now();
        shutdown_gracefully(&pool).await;
        shutdown_immediately(&pool);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(pool.state(), PoolState::ForceTerminated);

        let pool = default_pool();
        shutdown_immediately(&pool);
        shutdown_immediately(&pool);
        shutdown_gracefully(&pool).await;
        assert_eq!(pool.state(), PoolState::ForceTerminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_on_idle_pool_terminates() {
        let pool = default_pool();
        let start = Instant::now();
        shutdown_gracefully(&pool).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(pool.state(), PoolState::Terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_graceful_calls_share_bound() {
        let pool = default_pool();
        let _stuck = assert_ok!(pool.submit(std::future::pending::<()>()));

        let start = Instant::now();
        tokio::join!(shutdown_gracefully(&pool), shutdown_gracefully(&pool));

        assert!(start.elapsed() < GRACEFUL_SHUTDOWN_TIMEOUT + Duration::from_secs(1));
        assert_eq!(pool.state(), PoolState::ForceTerminated);
    }
}
