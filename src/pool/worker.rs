//! Worker Pool
//!
//! A bounded pool of tokio tasks owned by the I/O dispatch layer. At most
//! `workers` submitted futures run at once; the rest wait for a permit and
//! count as queued-but-unstarted.
//!
//! ## State Machine
//!
//! ```text
//!            shutdown()                 last task done
//! Running ─────────────> Draining ─────────────────────> Terminated
//!    │                       │
//!    │ shutdown_now()        │ shutdown_now()
//!    └───────────────────────┴─────────────────────────> ForceTerminated
//! ```
//!
//! Every transition happens under the registry lock, so a submission racing
//! with shutdown either lands before the transition (and is drained or
//! cancelled with the rest) or is rejected.

use crate::error::{ErrorKind, TcpError, TcpResult};
use crate::pool::interrupt::Interrupt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{watch, Semaphore};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, trace};

/// Upper bound on the graceful phase of shutdown (1 minute)
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Name used in log output
    pub name: String,

    /// Maximum number of tasks running at once (default: available parallelism)
    pub workers: usize,

    /// How long graceful shutdown waits before forcing (default: 1 minute)
    pub graceful_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "tcp-workers".to_string(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            graceful_timeout: GRACEFUL_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Lifecycle state of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Accepting and running work
    Running,
    /// No longer accepting work; waiting for submitted work to finish
    Draining,
    /// All submitted work finished
    Terminated,
    /// Remaining work was cancelled
    ForceTerminated,
}

impl PoolState {
    /// Returns true for `Terminated` and `ForceTerminated`.
    pub fn is_terminal(self) -> bool {
        matches!(self, PoolState::Terminated | PoolState::ForceTerminated)
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Terminated => "terminated",
            PoolState::ForceTerminated => "force-terminated",
        };
        f.write_str(s)
    }
}

/// The wait for termination was cut short by an [`Interrupt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted while awaiting pool termination")]
pub struct Interrupted;

struct Registry {
    state: PoolState,
    next_id: u64,
    /// Submitted work that has not yet finished or been dropped. The
    /// handle is `None` for the moment between reservation and spawn.
    tasks: HashMap<u64, Option<AbortHandle>>,
}

struct Shared {
    config: PoolConfig,
    registry: Mutex<Registry>,
    /// Published copy of `Registry::state` for waiters
    state_tx: watch::Sender<PoolState>,
    permits: Arc<Semaphore>,
}

impl Shared {
    /// Must be called with the registry lock held.
    fn transition(&self, registry: &mut Registry, next: PoolState) {
        debug!(pool = %self.config.name, from = %registry.state, to = %next, "Pool state changed");
        registry.state = next;
        self.state_tx.send_replace(next);
    }

    fn finish(&self, id: u64) {
        let mut registry = self.registry.lock();
        registry.tasks.remove(&id);
        if registry.tasks.is_empty() && registry.state == PoolState::Draining {
            self.transition(&mut registry, PoolState::Terminated);
        }
    }
}

/// Removes a task from the registry when its future completes or is dropped
/// (which is what aborting does).
struct WorkGuard {
    shared: Arc<Shared>,
    id: u64,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        self.shared.finish(self.id);
    }
}

/// A cloneable handle to a bounded pool of tokio tasks.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Creates a running pool.
    pub fn new(config: PoolConfig) -> Self {
        let workers = config.workers.max(1);
        let (state_tx, _) = watch::channel(PoolState::Running);

        info!(pool = %config.name, workers = workers, "Worker pool started");

        Self {
            shared: Arc::new(Shared {
                config,
                registry: Mutex::new(Registry {
                    state: PoolState::Running,
                    next_id: 0,
                    tasks: HashMap::new(),
                }),
                state_tx,
                permits: Arc::new(Semaphore::new(workers)),
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn state(&self) -> PoolState {
        self.shared.registry.lock().state
    }

    /// Returns true once the pool no longer accepts work.
    pub fn is_shutdown(&self) -> bool {
        self.state() != PoolState::Running
    }

    pub fn is_terminated(&self) -> bool {
        self.state().is_terminal()
    }

    /// Number of submitted tasks that have not finished yet, queued or
    /// running.
    pub fn outstanding(&self) -> usize {
        self.shared.registry.lock().tasks.len()
    }

    /// Submits work to the pool.
    ///
    /// Fails with [`ErrorKind::Rejected`] once shutdown has begun, and with
    /// [`ErrorKind::Generic`] when called outside a tokio runtime.
    pub fn submit<F>(&self, work: F) -> TcpResult<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| TcpError::generic(e.to_string()))?;

        let mut registry = self.shared.registry.lock();
        if registry.state != PoolState::Running {
            return Err(TcpError::new(
                ErrorKind::Rejected,
                format!(
                    "worker pool '{}' is {} and no longer accepts work",
                    self.shared.config.name, registry.state
                ),
            ));
        }

        let id = registry.next_id;
        registry.next_id += 1;
        // Reserved before spawning so the task counts as outstanding at once
        registry.tasks.insert(id, None);
        drop(registry);

        let guard = WorkGuard {
            shared: Arc::clone(&self.shared),
            id,
        };
        let permits = Arc::clone(&self.shared.permits);
        let handle = runtime.spawn(async move {
            let _guard = guard;
            let _permit = permits.acquire_owned().await;
            work.await
        });

        let cancelled_meanwhile = {
            let mut registry = self.shared.registry.lock();
            match registry.tasks.get_mut(&id) {
                Some(slot) => {
                    *slot = Some(handle.abort_handle());
                    false
                }
                // Either already finished, or drained by shutdown_now
                None => registry.state == PoolState::ForceTerminated,
            }
        };
        if cancelled_meanwhile {
            handle.abort();
        }

        trace!(pool = %self.shared.config.name, task = id, "Work submitted");
        Ok(handle)
    }

    /// Stops accepting new work. Already-submitted work keeps running.
    ///
    /// Returns true if this call ended the `Running` state. A pool with no
    /// outstanding work goes straight to `Terminated`.
    pub fn shutdown(&self) -> bool {
        let mut registry = self.shared.registry.lock();
        if registry.state != PoolState::Running {
            return false;
        }

        info!(
            pool = %self.shared.config.name,
            outstanding = registry.tasks.len(),
            "Worker pool shutting down"
        );
        let next = if registry.tasks.is_empty() {
            PoolState::Terminated
        } else {
            PoolState::Draining
        };
        self.shared.transition(&mut registry, next);
        true
    }

    /// Cancels all queued and running work and stops accepting new work.
    ///
    /// Returns how many tasks were cancelled. Does not wait for the
    /// cancelled tasks to unwind. A no-op on a pool that already terminated.
    pub fn shutdown_now(&self) -> usize {
        let handles: Vec<Option<AbortHandle>> = {
            let mut registry = self.shared.registry.lock();
            if registry.state.is_terminal() {
                return 0;
            }
            self.shared.transition(&mut registry, PoolState::ForceTerminated);
            registry.tasks.drain().map(|(_, handle)| handle).collect()
        };

        // Aborting outside the lock: a cancelled task's guard takes it on drop
        for handle in handles.iter().flatten() {
            handle.abort();
        }

        info!(
            pool = %self.shared.config.name,
            cancelled = handles.len(),
            "Worker pool forcibly terminated"
        );
        handles.len()
    }

    /// Waits until the pool reaches a terminal state, for at most `timeout`.
    ///
    /// Returns `Ok(true)` if it terminated and `Ok(false)` if the timeout
    /// elapsed first. If `interrupt` is raised before or during the wait,
    /// the flag is cleared and `Err(Interrupted)` is returned.
    pub async fn await_termination(
        &self,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        if interrupt.take() {
            return Err(Interrupted);
        }

        let mut state_rx = self.shared.state_tx.subscribe();
        let terminated = async move {
            // The sender lives in `Shared`, which this pool keeps alive
            state_rx.wait_for(|state| state.is_terminal()).await.is_ok()
        };

        tokio::select! {
            result = tokio::time::timeout(timeout, terminated) => Ok(result.unwrap_or(false)),
            _ = interrupt.raised() => {
                interrupt.take();
                Err(Interrupted)
            }
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.shared.registry.lock();
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.config.name)
            .field("state", &registry.state)
            .field("outstanding", &registry.tasks.len())
            .finish()
    }
}
