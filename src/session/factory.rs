//! Connection Session Factory
//!
//! A [`ServiceRecord`] is owned by the service runtime: it couples a channel
//! (attached once the accept hook completes) with the per-connection
//! resources. [`create_session`] turns a record into the façade higher
//! layers use.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// A connected network endpoint whose socket identity can be queried.
pub trait NativeChannel: Send + Sync + 'static {
    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

impl NativeChannel for TcpStream {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }
}

impl NativeChannel for std::net::TcpStream {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        std::net::TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        std::net::TcpStream::peer_addr(self)
    }
}

/// A named per-connection resource.
pub type Resource = Arc<dyn Any + Send + Sync>;

/// The service runtime's record for one connection.
pub struct ServiceRecord<C = TcpStream> {
    /// Attached by the accept hook, with the id it was given; absent until then
    channel: RwLock<Option<(Arc<C>, ConnectionId)>>,

    /// Resources registered for this connection, by name
    resources: HashMap<String, Resource>,
}

impl<C> ServiceRecord<C> {
    /// Creates a record with no channel attached yet.
    pub fn new() -> Self {
        Self {
            channel: RwLock::new(None),
            resources: HashMap::new(),
        }
    }

    /// Creates a record with `channel` already attached.
    pub fn with_channel(channel: C) -> Self {
        Self {
            channel: RwLock::new(Some((Arc::new(channel), ConnectionId::next()))),
            resources: HashMap::new(),
        }
    }

    /// Registers a resource under `name`, replacing any previous one.
    pub fn with_resource<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.resources.insert(name.into(), Arc::new(value));
        self
    }

    /// Looks up a resource by name and type.
    pub fn resource<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let resource = self.resources.get(name)?;
        Arc::clone(resource).downcast::<T>().ok()
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Attaches the accepted channel under a fresh [`ConnectionId`],
    /// returning the one it replaces.
    pub fn attach_channel(&self, channel: C) -> Option<Arc<C>> {
        let attached = (Arc::new(channel), ConnectionId::next());
        self.channel.write().replace(attached).map(|(old, _)| old)
    }

    /// Detaches the channel, e.g. when the connection's resources are
    /// released. Sessions already created keep their own handle.
    pub fn detach_channel(&self) -> Option<Arc<C>> {
        self.channel.write().take().map(|(channel, _)| channel)
    }

    /// Returns a handle to the attached channel, if any.
    pub fn channel(&self) -> Option<Arc<C>> {
        self.bound_channel().map(|(channel, _)| channel)
    }

    /// The attached channel together with its id, read in one step.
    fn bound_channel(&self) -> Option<(Arc<C>, ConnectionId)> {
        self.channel.read().clone()
    }

    pub fn has_channel(&self) -> bool {
        self.channel.read().is_some()
    }
}

impl<C> Default for ServiceRecord<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ServiceRecord<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRecord")
            .field("has_channel", &self.has_channel())
            .field("resources", &self.resource_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Opaque identifier assigned when a channel is attached to a record.
///
/// Every session built from the same attachment sees the same id. Ids are
/// never reused within a process, even after the connection is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Local and remote socket identity, captured together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoints {
    local: SocketAddr,
    remote: SocketAddr,
}

impl Endpoints {
    fn read<C: NativeChannel + ?Sized>(channel: &C) -> io::Result<Self> {
        Ok(Self {
            local: channel.local_addr()?,
            remote: channel.peer_addr()?,
        })
    }

    pub fn local(&self) -> SocketAddr {
        self.local
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }
}

struct Binding<C> {
    channel: Arc<C>,
    id: ConnectionId,
    endpoints: Endpoints,
}

impl<C> Clone for Binding<C> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
            id: self.id,
            endpoints: self.endpoints,
        }
    }
}

/// The façade representing one accepted connection.
///
/// Endpoint identity is fixed at construction. If no channel was available
/// then, every endpoint accessor returns `None`, together with
/// [`id`](ConnectionSession::id) and [`channel`](ConnectionSession::channel).
pub struct ConnectionSession<C = TcpStream> {
    service: Arc<ServiceRecord<C>>,
    binding: Option<Binding<C>>,
}

impl<C: NativeChannel> ConnectionSession<C> {
    /// Builds a session over `service`, binding its channel if one is
    /// attached. Never fails.
    pub fn new(service: Arc<ServiceRecord<C>>) -> Self {
        let binding = match service.bound_channel() {
            Some((channel, id)) => match Endpoints::read(channel.as_ref()) {
                Ok(endpoints) => {
                    trace!(
                        id = %id,
                        local = %endpoints.local,
                        remote = %endpoints.remote,
                        "Session bound to channel"
                    );
                    Some(Binding {
                        channel,
                        id,
                        endpoints,
                    })
                }
                Err(e) => {
                    debug!(error = %e, "Socket identity unavailable, session left unbound");
                    None
                }
            },
            None => {
                trace!("No channel attached, session left unbound");
                None
            }
        };

        Self { service, binding }
    }
}

impl<C> ConnectionSession<C> {
    /// The service record this session was created from.
    pub fn service(&self) -> &Arc<ServiceRecord<C>> {
        &self.service
    }

    /// The bound channel, for I/O by higher layers.
    pub fn channel(&self) -> Option<&Arc<C>> {
        self.binding.as_ref().map(|b| &b.channel)
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn id(&self) -> Option<ConnectionId> {
        self.binding.as_ref().map(|b| b.id)
    }

    pub fn endpoints(&self) -> Option<Endpoints> {
        self.binding.as_ref().map(|b| b.endpoints)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.endpoints().map(|e| e.local)
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.endpoints().map(|e| e.remote)
    }

    pub fn local_address(&self) -> Option<IpAddr> {
        self.local_addr().map(|a| a.ip())
    }

    pub fn local_port(&self) -> Option<u16> {
        self.local_addr().map(|a| a.port())
    }

    pub fn remote_address(&self) -> Option<IpAddr> {
        self.remote_addr().map(|a| a.ip())
    }

    pub fn remote_port(&self) -> Option<u16> {
        self.remote_addr().map(|a| a.port())
    }
}

impl<C> Clone for ConnectionSession<C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            binding: self.binding.clone(),
        }
    }
}

impl<C> fmt::Debug for ConnectionSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("id", &self.id())
            .field("endpoints", &self.endpoints())
            .finish()
    }
}

/// Creates the session façade for `service`.
///
/// Reads only already-accepted socket metadata; performs no other I/O.
pub fn create_session<C: NativeChannel>(service: &Arc<ServiceRecord<C>>) -> ConnectionSession<C> {
    ConnectionSession::new(Arc::clone(service))
}
