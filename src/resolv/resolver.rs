//! The resolver.

use super::conf::ResolvConf;
use super::context::Resolution;
use super::error::ResolveError;
use super::hosts::Hosts;
use super::lookup::FoundHosts;
use super::manager::QueryContextManager;
use super::servers::ServerList;
use super::transport::{Inbound, SecurityHook, Transport};
use super::udp::UdpTransport;
use crate::base::iana::Rtype;
use crate::base::message::Message;
use crate::base::name::Name;
use crate::cache::{AuthoritativeServerCache, Cache, Config};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{fmt, io};
use tokio::task::JoinHandle;
use tracing::debug;

//------------ Resolver ------------------------------------------------------

/// An iterative DNS resolver with a cache.
///
/// The resolver sends its queries to the configured servers and follows
/// referrals to the servers of closer zones. Everything learned along the
/// way is kept in a cache shared by all lookups.
///
/// A resolver doesn’t do any I/O itself but uses a [`Transport`]. The
/// transport delivers responses through the [`Inbound`] handle available
/// via [`inbound`][Self::inbound]. The easiest way to get a resolver that
/// uses UDP is [`ResolverBuilder::build_udp`].
///
/// Values can be cloned cheaply as they keep all information behind an
/// arc. All clones share one cache.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

/// Everything a resolver needs.
pub(crate) struct ResolverInner {
    pub conf: ResolvConf,
    pub servers: ServerList,
    pub hosts: Hosts,
    pub cache: Cache,
    pub auth: AuthoritativeServerCache,
    pub manager: Arc<QueryContextManager>,
    pub transport: Arc<dyn Transport>,
    pub hook: Option<Arc<dyn SecurityHook>>,
    pub closed: AtomicBool,

    /// The receive loop if the resolver started one.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Resolver {
    /// Returns a builder for a resolver using `conf`.
    #[must_use]
    pub fn builder(conf: ResolvConf) -> ResolverBuilder {
        ResolverBuilder::new(conf)
    }

    /// Creates a resolver using the system’s configuration and UDP.
    pub async fn system_default() -> Result<Self, io::Error> {
        ResolverBuilder::new(ResolvConf::system_default())
            .hosts(Hosts::system_default())
            .build_udp()
            .await
    }

    /// Returns the configuration.
    #[must_use]
    pub fn conf(&self) -> &ResolvConf {
        &self.inner.conf
    }

    /// Returns the handle for delivering responses to the resolver.
    #[must_use]
    pub fn inbound(&self) -> Inbound {
        Inbound::new(self.inner.manager.clone(), self.inner.hook.clone())
    }

    /// Returns the cache.
    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    /// Returns the cache of delegations.
    #[must_use]
    pub fn auth_cache(&self) -> &AuthoritativeServerCache {
        &self.inner.auth
    }

    /// Returns whether the resolver has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }
}

/// # Lookups
///
impl Resolver {
    /// Resolves the addresses of a host.
    ///
    /// `hostname` may be an IP address which is returned right away, an
    /// absolute domain name, or a relative one which is expanded using the
    /// search list. The hosts table is consulted before asking the network.
    ///
    /// The addresses are grouped by address family in the order given by
    /// the configured address preference.
    pub async fn lookup_host(
        &self,
        hostname: &str,
    ) -> Result<FoundHosts, ResolveError> {
        let resolution = Resolution::new(&self.inner);
        match resolution.lookup_host(hostname).await {
            Ok(found) => Ok(found),
            Err(err) => {
                debug!("resolving {} failed: {}", hostname, err);
                Err(ResolveError::new(
                    hostname,
                    resolution.attempts(),
                    resolution.budget(),
                    err,
                ))
            }
        }
    }

    /// Asks the configured servers a single question.
    ///
    /// The response is added to the cache. Responses other than NOERROR
    /// and NXDOMAIN cause the next server to be tried.
    pub async fn query(
        &self,
        qname: &Name,
        qtype: Rtype,
    ) -> Result<Message, ResolveError> {
        let resolution = Resolution::new(&self.inner);
        resolution.query(qname, qtype).await.map_err(|err| {
            ResolveError::new(
                qname.to_string(),
                resolution.attempts(),
                resolution.budget(),
                err,
            )
        })
    }

    /// Closes the resolver.
    ///
    /// All outstanding queries fail and no new ones are sent. Both caches
    /// are cleared and the receive loop, if any, is stopped.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::Relaxed) {
            return;
        }
        debug!("closing resolver");
        self.inner.manager.clear();
        self.inner.cache.clear();
        self.inner.auth.clear();
        if let Some(task) = self.inner.task.lock().take() {
            task.abort()
        }
    }
}

//--- Debug

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("conf", &self.inner.conf)
            .field("closed", &self.is_closed())
            .finish()
    }
}

//------------ ResolverBuilder -----------------------------------------------

/// A builder for a [`Resolver`].
#[derive(Clone)]
pub struct ResolverBuilder {
    conf: ResolvConf,
    hosts: Hosts,
    hook: Option<Arc<dyn SecurityHook>>,
    cache_config: Config,
}

impl ResolverBuilder {
    /// Creates a builder using the given configuration.
    ///
    /// The configuration is finalized so that it has at least one server.
    #[must_use]
    pub fn new(mut conf: ResolvConf) -> Self {
        conf.finalize();
        ResolverBuilder {
            conf,
            hosts: Hosts::new(),
            hook: None,
            cache_config: Config::default(),
        }
    }

    /// Sets the hosts table consulted before any query.
    #[must_use]
    pub fn hosts(mut self, hosts: Hosts) -> Self {
        self.hosts = hosts;
        self
    }

    /// Sets a hook for signing queries and verifying responses.
    #[must_use]
    pub fn security_hook(mut self, hook: impl SecurityHook) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Sets the configuration of the cache.
    #[must_use]
    pub fn cache_config(mut self, config: Config) -> Self {
        self.cache_config = config;
        self
    }

    /// Returns a mutable reference to the resolver configuration.
    pub fn conf_mut(&mut self) -> &mut ResolvConf {
        &mut self.conf
    }

    /// Builds a resolver that sends its queries via `transport`.
    ///
    /// The transport needs to deliver responses to
    /// [`Resolver::inbound`].
    pub fn build(self, transport: impl Transport) -> Resolver {
        self.build_arc(Arc::new(transport))
    }

    /// Builds a resolver using a shared transport.
    pub fn build_arc(self, transport: Arc<dyn Transport>) -> Resolver {
        Resolver {
            inner: Arc::new(ResolverInner {
                servers: ServerList::new(self.conf.servers().to_vec()),
                conf: self.conf,
                hosts: self.hosts,
                cache: Cache::with_config(self.cache_config),
                auth: AuthoritativeServerCache::with_time_config(
                    self.cache_config,
                    Default::default(),
                ),
                manager: Arc::new(QueryContextManager::new()),
                transport,
                hook: self.hook,
                closed: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        }
    }

    /// Builds a resolver using UDP.
    ///
    /// Binds the sockets and spawns the receive loop onto the current
    /// runtime. The loop ends when the resolver is closed.
    pub async fn build_udp(self) -> Result<Resolver, io::Error> {
        let transport = Arc::new(UdpTransport::bind().await?);
        let resolver = self.build_arc(transport.clone());
        let task = tokio::spawn(transport.run(resolver.inbound()));
        *resolver.inner.task.lock() = Some(task);
        Ok(resolver)
    }
}

//--- Debug

impl fmt::Debug for ResolverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResolverBuilder")
            .field("conf", &self.conf)
            .field("hosts", &self.hosts)
            .field("hook", &self.hook.is_some())
            .field("cache_config", &self.cache_config)
            .finish()
    }
}
