//! # tcp-native - Support Layer for a TCP Service Runtime
//!
//! This crate sits between a raw, asynchronously accepted TCP channel and the
//! request/response machinery of a service. It reconciles three lifecycles
//! that do not agree on timing: channel acceptance, worker-pool shutdown and
//! per-read payload extraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Accept / dispatch loop (not in this crate)              │
//! └──────┬──────────────────────┬───────────────────────┬───────────────────┘
//!        │ per connection       │ per completed read    │ at teardown
//!        ▼                      ▼                       ▼
//! ┌──────────────┐      ┌──────────────┐      ┌───────────────────┐
//! │   session    │      │    buffer    │      │       pool        │
//! │              │      │              │      │                   │
//! │ ServiceRecord│      │ ReadBuffer   │      │ WorkerPool        │
//! │  ──> Session │      │  ──> Bytes   │      │  graceful/forced  │
//! └──────────────┘      └──────────────┘      └───────────────────┘
//!        │                      │                       │
//!        └──────────────────────┼───────────────────────┘
//!                               ▼
//!                       ┌──────────────┐
//!                       │    error     │
//!                       │  TcpError    │
//!                       └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tcp_native::buffer::ReadBuffer;
//! use tcp_native::pool::{shutdown_gracefully, PoolConfig, WorkerPool};
//! use tcp_native::session::{create_session, ServiceRecord};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = WorkerPool::new(PoolConfig::default());
//!     let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
//!
//!     let (stream, _) = listener.accept().await.unwrap();
//!     let record = Arc::new(ServiceRecord::with_channel(stream));
//!     let session = create_session(&record);
//!
//!     pool.submit(async move {
//!         let mut buffer = ReadBuffer::default();
//!         // read into `buffer`, then hand `buffer.take_written()` upstream
//!     })
//!     .unwrap();
//!
//!     shutdown_gracefully(&pool).await;
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`session`]: Session façade over a possibly not-yet-bound channel
//! - [`buffer`]: Exact-length payload extraction from read buffers
//! - [`pool`]: Worker pool with graceful-then-forced shutdown
//! - [`error`]: Closed, module-scoped error taxonomy

pub mod buffer;
pub mod error;
pub mod pool;
pub mod session;

// Re-export commonly used types for convenience
pub use buffer::{compact, ReadBuffer};
pub use error::{make_error, ErrorKind, TcpError, TcpResult};
pub use pool::{
    shutdown_gracefully, shutdown_gracefully_until, shutdown_immediately, Interrupt, PoolConfig,
    PoolState, WorkerPool,
};
pub use session::{create_session, ConnectionId, ConnectionSession, NativeChannel, ServiceRecord};

/// Version of tcp-native
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
