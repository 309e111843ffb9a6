//! The seams between the resolver and the network.
//!
//! The resolver doesn’t do any I/O itself. Queries are handed to a
//! [`Transport`] and responses are fed back through an [`Inbound`] handle
//! which decodes them and passes them on to the query waiting for them.
//! Signing and verification of messages can be plugged in via a
//! [`SecurityHook`].

use super::error::Error;
use super::manager::QueryContextManager;
use crate::base::message::Message;
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

//------------ Transport -----------------------------------------------------

/// A way to send queries to servers.
///
/// Sending is fire and forget. The transport must deliver any responses
/// it receives to the [`Inbound`] handle of the resolver.
pub trait Transport: Send + Sync + 'static {
    /// Sends the wire format message `data` to `dest`.
    ///
    /// The returned future resolves once the message has been written.
    fn send(
        &self,
        dest: SocketAddr,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), io::Error>> + Send + '_>>;
}

//------------ SecurityHook --------------------------------------------------

/// Signing of queries and verification of responses.
///
/// This is where transaction security such as TSIG would be added. Both
/// methods default to letting messages pass unchanged.
pub trait SecurityHook: Send + Sync + 'static {
    /// Processes the encoded query before it is sent to `dest`.
    fn sign(&self, dest: SocketAddr, query: Bytes) -> Bytes {
        let _ = dest;
        query
    }

    /// Checks a response received from `source`.
    ///
    /// The response has already been matched to its query. `data` is the
    /// response as received. Returns whether the response is acceptable. A
    /// rejected response fails the query with [`Error::Rejected`].
    fn verify(&self, source: SocketAddr, response: &Message, data: &[u8]) -> bool {
        let _ = (source, response, data);
        true
    }
}

//------------ Inbound -------------------------------------------------------

/// The handle for delivering received responses.
///
/// A transport hands each datagram it receives to
/// [`deliver`][Self::deliver] together with the address it came from.
#[derive(Clone)]
pub struct Inbound {
    manager: Arc<QueryContextManager>,
    hook: Option<Arc<dyn SecurityHook>>,
}

impl Inbound {
    pub(crate) fn new(
        manager: Arc<QueryContextManager>,
        hook: Option<Arc<dyn SecurityHook>>,
    ) -> Self {
        Inbound { manager, hook }
    }

    /// Delivers a response received from `source`.
    ///
    /// The response is decoded and handed to the outstanding query with
    /// the response’s ID for `source`. Returns an error if the response
    /// can’t be decoded or if there is no such query. In both cases, the
    /// response is dropped. This is never fatal for the transport.
    pub fn deliver(&self, source: SocketAddr, data: &[u8]) -> Result<(), Error> {
        let message = match Message::from_octets(data) {
            Ok(message) => message,
            Err(err) => {
                debug!("dropping malformed message from {}: {}", source, err);
                return Err(Error::MalformedWire(err));
            }
        };
        if let Err(err) = message.check_response() {
            debug!("dropping message from {}: {}", source, err);
            return Err(Error::MalformedWire(err.into()));
        }
        self.manager
            .finish(source, message, data, self.hook.as_deref())
    }
}

//--- Debug

impl std::fmt::Debug for Inbound {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Inbound")
            .field("manager", &self.manager)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
