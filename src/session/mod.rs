//! Connection Session Module
//!
//! This module builds the [`ConnectionSession`] façade handed to the layers
//! above the accept loop, one per accepted connection.
//!
//! ## Deferred Binding
//!
//! ```text
//! 1. Transport accepts the connection
//!        │
//!        ▼
//! 2. User accept hook runs ──── may fail before the channel is attached
//!        │
//!        ▼
//! 3. create_session(&record)
//!        │
//!        ├── channel attached ──> session bound: id + endpoints + channel
//!        │
//!        └── no channel ───────> session unbound: every field unset
//! ```
//!
//! A session is always produced. Endpoint identity lives in a single
//! optional binding, so it is either fully present or fully absent; higher
//! layers check [`ConnectionSession::is_bound`] (or match on the `Option`
//! accessors) before doing I/O.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tcp_native::session::{create_session, ServiceRecord};
//!
//! let record: Arc<ServiceRecord> = Arc::new(ServiceRecord::new());
//! let session = create_session(&record);
//!
//! assert!(!session.is_bound());
//! assert_eq!(session.remote_port(), None);
//! ```

pub mod factory;

// Re-export commonly used types
pub use factory::{
    create_session, ConnectionId, ConnectionSession, Endpoints, NativeChannel, ServiceRecord,
};
