//! Worker Pool Module
//!
//! The I/O dispatch layer runs per-connection work on a [`WorkerPool`] and
//! tears it down through one of two paths.
//!
//! ## Shutdown Paths
//!
//! ```text
//! shutdown_gracefully(pool)
//!        │
//!        ▼
//!   stop accepting work
//!        │
//!        ▼
//!   wait ≤ 1 minute ──── all work done ─────> Terminated
//!        │
//!        ├── timeout elapsed ──┐
//!        │                     ├──> cancel queued + running ──> ForceTerminated
//!        └── interrupted ──────┘    (interrupt re-raised)
//!
//! shutdown_immediately(pool) ──> cancel queued + running ──> ForceTerminated
//! ```
//!
//! ## Example
//!
//! ```
//! use tcp_native::pool::{shutdown_gracefully, PoolConfig, PoolState, WorkerPool};
//!
//! # tokio_test::block_on(async {
//! let pool = WorkerPool::new(PoolConfig::default());
//! let handle = pool.submit(async { 1 + 1 }).unwrap();
//! assert_eq!(handle.await.unwrap(), 2);
//!
//! shutdown_gracefully(&pool).await;
//! assert_eq!(pool.state(), PoolState::Terminated);
//! assert!(pool.submit(async {}).is_err());
//! # });
//! ```

pub mod interrupt;
pub mod shutdown;
pub mod worker;

// Re-export commonly used types
pub use interrupt::Interrupt;
pub use shutdown::{shutdown_gracefully, shutdown_gracefully_until, shutdown_immediately};
pub use worker::{Interrupted, PoolConfig, PoolState, WorkerPool, GRACEFUL_SHUTDOWN_TIMEOUT};
