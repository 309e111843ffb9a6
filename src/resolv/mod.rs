//! An asynchronous iterative resolver using tokio.
//!
//! The main type is [`Resolver`]. It is created from a [`ResolvConf`]
//! through a [`ResolverBuilder`] and resolves host names into addresses
//! via [`Resolver::lookup_host`] or sends single questions via
//! [`Resolver::query`].
//!
//! Every lookup is bounded by a query budget. All queries of a lookup,
//! whether for search suffixes, aliases, or referrals, count against it,
//! so a lookup always ends. Each query has its own timeout and a query
//! that fails or times out is retried with the next server.
//!
//! The resolver itself does no I/O. Queries go out via a [`Transport`]
//! and responses come back through an [`Inbound`] handle. The
//! [`UdpTransport`] provides this via UDP. Outstanding queries are tracked
//! by a [`QueryContextManager`] which allocates the message IDs and
//! matches responses to queries.

pub use self::conf::{AddrPreference, ResolvConf};
pub use self::error::{Error, ResolveError};
pub use self::hosts::Hosts;
pub use self::lookup::FoundHosts;
pub use self::manager::QueryContextManager;
pub use self::query::{QueryContext, QueryState};
pub use self::resolver::{Resolver, ResolverBuilder};
pub use self::transport::{Inbound, SecurityHook, Transport};
pub use self::udp::UdpTransport;

pub mod conf;
mod context;
pub mod error;
pub mod hosts;
pub mod lookup;
mod manager;
mod query;
mod resolver;
mod servers;
mod transport;
mod udp;
