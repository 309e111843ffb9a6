//! Tracking outstanding queries.

use super::error::Error;
use super::transport::SecurityHook;
use crate::base::message::Message;
use crate::base::question::Question;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// The sending half for the result of a query.
pub(crate) type ReplySender = oneshot::Sender<Result<Message, Error>>;

/// The receiving half for the result of a query.
pub(crate) type ReplyReceiver = oneshot::Receiver<Result<Message, Error>>;

//------------ QueryContextManager -------------------------------------------

/// The index of all outstanding queries.
///
/// Each outstanding query is registered under the address of the server it
/// was sent to and its message ID. Only one query can be registered for
/// each pair. IDs are allocated starting at a random value and probing
/// linearly for a free one.
#[derive(Debug)]
pub struct QueryContextManager {
    inner: Mutex<Inner>,
}

/// The lockable part of the manager.
struct Inner {
    /// The outstanding queries.
    queries: HashMap<(SocketAddr, u16), Pending>,

    /// The source of random IDs.
    rng: StdRng,

    /// The next registration serial.
    serial: u64,
}

/// An outstanding query.
struct Pending {
    /// The question asked.
    question: Question,

    /// Where to send the result to.
    tx: ReplySender,

    /// Identifies this registration.
    serial: u64,
}

impl QueryContextManager {
    /// Creates a new manager without any outstanding queries.
    #[must_use]
    pub fn new() -> Self {
        QueryContextManager {
            inner: Mutex::new(Inner {
                queries: HashMap::new(),
                rng: StdRng::from_entropy(),
                serial: 0,
            }),
        }
    }

    /// Registers a query for `question` to be sent to `dest`.
    ///
    /// Returns the allocated message ID and the serial of the registration.
    /// Fails if all IDs for `dest` are in use.
    pub(crate) fn add(
        &self,
        dest: SocketAddr,
        question: Question,
        tx: ReplySender,
    ) -> Result<(u16, u64), Error> {
        let mut inner = self.inner.lock();
        let start: u16 = inner.rng.gen();
        let mut id = start;
        while inner.queries.contains_key(&(dest, id)) {
            id = id.wrapping_add(1);
            if id == start {
                warn!("all query IDs for {} in use", dest);
                return Err(Error::TooManyOutstanding);
            }
        }
        inner.serial += 1;
        let serial = inner.serial;
        inner.queries.insert(
            (dest, id),
            Pending {
                question,
                tx,
                serial,
            },
        );
        trace!("registered query {} for {}", id, dest);
        Ok((id, serial))
    }

    /// Returns the question of the query registered for `dest` and `id`.
    #[must_use]
    pub fn get(&self, dest: SocketAddr, id: u16) -> Option<Question> {
        self.inner
            .lock()
            .queries
            .get(&(dest, id))
            .map(|pending| pending.question.clone())
    }

    /// Removes the query registered for `dest` and `id`.
    ///
    /// The query will fail as cancelled. Returns whether there was such a
    /// query.
    pub fn remove(&self, dest: SocketAddr, id: u16) -> bool {
        self.inner.lock().queries.remove(&(dest, id)).is_some()
    }

    /// Removes a registration if it is still the one with `serial`.
    pub(crate) fn release(&self, dest: SocketAddr, id: u16, serial: u64) {
        let mut inner = self.inner.lock();
        if inner
            .queries
            .get(&(dest, id))
            .is_some_and(|pending| pending.serial == serial)
        {
            inner.queries.remove(&(dest, id));
        }
    }

    /// Returns the number of outstanding queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().queries.len()
    }

    /// Returns whether there are no outstanding queries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queries.is_empty()
    }

    /// Removes all queries.
    ///
    /// All outstanding queries fail as cancelled.
    pub fn clear(&self) {
        self.inner.lock().queries.clear()
    }

    /// Hands a response received from `source` to its query.
    ///
    /// If the question of the response differs from that of the query,
    /// the response is ignored and the query keeps waiting. If `hook`
    /// rejects the response, the query fails.
    pub(crate) fn finish(
        &self,
        source: SocketAddr,
        response: Message,
        data: &[u8],
        hook: Option<&dyn SecurityHook>,
    ) -> Result<(), Error> {
        let id = response.header().id();
        let mut inner = self.inner.lock();
        let pending = match inner.queries.get(&(source, id)) {
            Some(pending) => pending,
            None => {
                debug!("response from {} with unknown ID {}", source, id);
                return Err(Error::UnknownQueryId);
            }
        };
        if !response.is_answer_to(&pending.question) {
            debug!(
                "response {} from {} does not match question {}",
                id, source, pending.question
            );
            return Ok(());
        }
        let accepted =
            hook.map_or(true, |hook| hook.verify(source, &response, data));
        let pending = match inner.queries.remove(&(source, id)) {
            Some(pending) => pending,
            None => return Err(Error::UnknownQueryId),
        };
        drop(inner);
        let res = if accepted {
            trace!("response {} from {} delivered", id, source);
            Ok(response)
        } else {
            debug!("response {} from {} rejected", id, source);
            Err(Error::Rejected)
        };
        // The receiver may have given up already.
        let _ = pending.tx.send(res);
        Ok(())
    }
}

impl Default for QueryContextManager {
    fn default() -> Self {
        Self::new()
    }
}

//--- Debug

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("queries", &self.queries.len())
            .finish()
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Rtype;
    use crate::base::message::Section;
    use crate::base::name::Name;

    fn question(s: &str) -> Question {
        Question::new_in(s.parse::<Name>().unwrap(), Rtype::A)
    }

    fn server() -> SocketAddr {
        SocketAddr::from(([192, 0, 2, 53], 53))
    }

    fn response(id: u16, question: Question) -> Message {
        let query = Message::query(question, id, true);
        Message::answer_for(&query)
    }

    #[test]
    fn ids_are_unique() {
        let manager = QueryContextManager::new();
        let mut ids = std::collections::HashSet::new();
        let mut receivers = Vec::new();
        for _ in 0..100 {
            let (tx, rx) = oneshot::channel();
            let (id, _) = manager
                .add(server(), question("www.example.com."), tx)
                .unwrap();
            assert!(ids.insert(id));
            receivers.push(rx);
        }
        assert_eq!(manager.len(), 100);

        // The same IDs may be used for another server.
        let other = SocketAddr::from(([192, 0, 2, 54], 53));
        let (tx, _rx) = oneshot::channel();
        manager.add(other, question("www.example.com."), tx).unwrap();
        assert_eq!(manager.len(), 101);
    }

    /// Registers queries for `dest` under all IDs except `free`.
    fn occupy_all_but(manager: &QueryContextManager, dest: SocketAddr, free: u16) {
        let mut inner = manager.inner.lock();
        for id in (0..=u16::MAX).filter(|&id| id != free) {
            let (tx, _) = oneshot::channel();
            inner.queries.insert(
                (dest, id),
                Pending {
                    question: question("www.example.com."),
                    tx,
                    serial: 0,
                },
            );
        }
    }

    #[test]
    fn ids_probe_past_used() {
        let manager = QueryContextManager::new();
        occupy_all_but(&manager, server(), 0x1234);

        let (tx, _rx) = oneshot::channel();
        let (id, _) = manager
            .add(server(), question("www.example.org."), tx)
            .unwrap();
        assert_eq!(id, 0x1234);
        assert_eq!(manager.get(server(), id), Some(question("www.example.org.")));

        let (tx, _rx) = oneshot::channel();
        assert!(matches!(
            manager.add(server(), question("www.example.net."), tx),
            Err(Error::TooManyOutstanding)
        ));
        assert_eq!(manager.len(), 0x10000);

        // Other servers have their own IDs.
        let other = SocketAddr::from(([192, 0, 2, 54], 53));
        let (tx, _rx) = oneshot::channel();
        manager.add(other, question("www.example.net."), tx).unwrap();

        // A removed ID becomes available again.
        assert!(manager.remove(server(), 0x0042));
        let (tx, _rx) = oneshot::channel();
        let (id, _) = manager
            .add(server(), question("www.example.net."), tx)
            .unwrap();
        assert_eq!(id, 0x0042);
    }

    #[test]
    fn finish() {
        let manager = QueryContextManager::new();
        let (tx, mut rx) = oneshot::channel();
        let (id, _) = manager
            .add(server(), question("www.example.com."), tx)
            .unwrap();
        assert_eq!(manager.get(server(), id), Some(question("www.example.com.")));

        // Wrong source.
        let other = SocketAddr::from(([192, 0, 2, 54], 53));
        let msg = response(id, question("www.example.com."));
        assert!(matches!(
            manager.finish(other, msg.clone(), &[], None),
            Err(Error::UnknownQueryId)
        ));

        // Wrong question is ignored.
        let wrong = response(id, question("www.example.org."));
        manager.finish(server(), wrong, &[], None).unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.len(), 1);

        manager.finish(server(), msg.clone(), &[], None).unwrap();
        assert_eq!(rx.try_recv().unwrap().unwrap(), msg);
        assert!(manager.is_empty());
        assert!(matches!(
            manager.finish(server(), msg, &[], None),
            Err(Error::UnknownQueryId)
        ));
    }

    #[test]
    fn hook_rejects() {
        struct Reject;

        impl SecurityHook for Reject {
            fn verify(&self, _: SocketAddr, msg: &Message, _: &[u8]) -> bool {
                !msg.section(Section::Answer).is_empty()
            }
        }

        let manager = QueryContextManager::new();
        let (tx, mut rx) = oneshot::channel();
        let (id, _) = manager
            .add(server(), question("www.example.com."), tx)
            .unwrap();
        let msg = response(id, question("www.example.com."));
        manager.finish(server(), msg, &[], Some(&Reject)).unwrap();
        assert!(matches!(rx.try_recv().unwrap(), Err(Error::Rejected)));
    }

    #[test]
    fn release_checks_serial() {
        let manager = QueryContextManager::new();
        let (tx, _rx) = oneshot::channel();
        let (id, serial) = manager
            .add(server(), question("www.example.com."), tx)
            .unwrap();
        manager.release(server(), id, serial + 1);
        assert_eq!(manager.len(), 1);
        manager.release(server(), id, serial);
        assert!(manager.is_empty());
    }
}
