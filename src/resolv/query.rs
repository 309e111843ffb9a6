//! A single query in flight.

use super::error::Error;
use super::manager::{QueryContextManager, ReplyReceiver};
use super::transport::{SecurityHook, Transport};
use crate::base::message::Message;
use crate::base::question::Question;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace};

//------------ QueryState ----------------------------------------------------

/// The state of a query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryState {
    /// The query has been registered but not sent yet.
    Created,

    /// The query is being written.
    Writing,

    /// The query has been sent and the timer is running.
    AwaitingResponse,

    /// A matching response has arrived.
    Succeeded,

    /// No response arrived in time.
    TimedOut,

    /// Sending failed or the response was rejected.
    TransportFailed,

    /// The query was removed before a response arrived.
    Cancelled,
}

impl QueryState {
    /// Returns whether the query has been settled.
    #[must_use]
    pub fn is_settled(self) -> bool {
        !matches!(
            self,
            QueryState::Created
                | QueryState::Writing
                | QueryState::AwaitingResponse
        )
    }
}

//------------ QueryContext --------------------------------------------------

/// One query sent to one server.
///
/// Creating a context registers the query with the
/// [`QueryContextManager`] which allocates its message ID. The
/// registration is released when the context is settled or dropped. This
/// is the only way an ID becomes free again.
#[derive(Debug)]
pub struct QueryContext {
    manager: Arc<QueryContextManager>,
    dest: SocketAddr,
    id: u16,
    serial: u64,
    question: Question,
    state: QueryState,
    rx: Option<ReplyReceiver>,
}

impl QueryContext {
    /// Registers a new query for `question` to `dest`.
    pub fn new(
        manager: Arc<QueryContextManager>,
        dest: SocketAddr,
        question: Question,
    ) -> Result<Self, Error> {
        let (tx, rx) = oneshot::channel();
        let (id, serial) = manager.add(dest, question.clone(), tx)?;
        Ok(QueryContext {
            manager,
            dest,
            id,
            serial,
            question,
            state: QueryState::Created,
            rx: Some(rx),
        })
    }

    /// Returns the message ID of the query.
    #[must_use]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Returns the address of the server.
    #[must_use]
    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Returns the question.
    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Returns the current state of the query.
    #[must_use]
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Sends the query and waits for the response.
    ///
    /// The timer of `timeout` starts once the query has been written.
    ///
    /// # Panics
    ///
    /// The method panics if called a second time.
    pub async fn query(
        &mut self,
        transport: &dyn Transport,
        hook: Option<&dyn SecurityHook>,
        timeout: Duration,
    ) -> Result<Message, Error> {
        let rx = self.rx.take().expect("query run twice");
        let mut data =
            Message::query(self.question.clone(), self.id, true).to_vec();
        if let Some(hook) = hook {
            data = hook.sign(self.dest, data);
        }

        self.state = QueryState::Writing;
        trace!("sending query {} for {} to {}", self.id, self.question, self.dest);
        if let Err(err) = transport.send(self.dest, data).await {
            debug!("sending query to {} failed: {}", self.dest, err);
            return self.settle(QueryState::TransportFailed, Err(err.into()));
        }

        self.state = QueryState::AwaitingResponse;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(response))) => {
                self.settle(QueryState::Succeeded, Ok(response))
            }
            Ok(Ok(Err(err))) => self.settle(QueryState::TransportFailed, Err(err)),
            Ok(Err(_)) => {
                self.settle(QueryState::Cancelled, Err(Error::Cancelled))
            }
            Err(_) => {
                debug!("query {} to {} timed out", self.id, self.dest);
                self.settle(QueryState::TimedOut, Err(Error::Timeout))
            }
        }
    }

    /// Moves to a final state and releases the registration.
    fn settle(
        &mut self,
        state: QueryState,
        res: Result<Message, Error>,
    ) -> Result<Message, Error> {
        self.state = state;
        self.manager.release(self.dest, self.id, self.serial);
        res
    }
}

//--- Drop

impl Drop for QueryContext {
    fn drop(&mut self) {
        if !self.state.is_settled() {
            trace!("releasing unsettled query {} to {}", self.id, self.dest);
            self.manager.release(self.dest, self.id, self.serial);
        }
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Rtype;
    use crate::base::name::Name;
    use crate::resolv::transport::Inbound;
    use bytes::Bytes;
    use std::future::Future;
    use std::io;
    use std::pin::Pin;

    /// Answers every query right away, or never, or fails.
    struct Echo {
        inbound: Inbound,
        mode: Mode,
    }

    #[derive(Clone, Copy)]
    enum Mode {
        Answer,
        Silent,
        Fail,
    }

    impl Transport for Echo {
        fn send(
            &self,
            dest: SocketAddr,
            data: Bytes,
        ) -> Pin<Box<dyn Future<Output = Result<(), io::Error>> + Send + '_>>
        {
            Box::pin(async move {
                match self.mode {
                    Mode::Answer => {
                        let query = Message::from_octets(&data).unwrap();
                        let answer = Message::answer_for(&query).to_vec();
                        self.inbound.deliver(dest, &answer).unwrap();
                        Ok(())
                    }
                    Mode::Silent => Ok(()),
                    Mode::Fail => Err(io::ErrorKind::ConnectionRefused.into()),
                }
            })
        }
    }

    fn setup(mode: Mode) -> (Arc<QueryContextManager>, Echo) {
        let manager = Arc::new(QueryContextManager::new());
        let inbound = Inbound::new(manager.clone(), None);
        (manager, Echo { inbound, mode })
    }

    fn context(manager: &Arc<QueryContextManager>) -> QueryContext {
        QueryContext::new(
            manager.clone(),
            SocketAddr::from(([192, 0, 2, 1], 53)),
            Question::new_in("www.example.com.".parse::<Name>().unwrap(), Rtype::A),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds() {
        let (manager, echo) = setup(Mode::Answer);
        let mut query = context(&manager);
        assert_eq!(query.state(), QueryState::Created);
        let response = query
            .query(&echo, None, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.header().id(), query.id());
        assert_eq!(query.state(), QueryState::Succeeded);
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn times_out() {
        let (manager, echo) = setup(Mode::Silent);
        let mut query = context(&manager);
        let err = query
            .query(&echo, None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert_eq!(query.state(), QueryState::TimedOut);
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_fails() {
        let (manager, echo) = setup(Mode::Fail);
        let mut query = context(&manager);
        let err = query
            .query(&echo, None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(query.state(), QueryState::TransportFailed);
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_by_manager() {
        let (manager, echo) = setup(Mode::Silent);
        let mut query = context(&manager);
        let id = query.id();
        let dest = query.dest();
        let fut = query.query(&echo, None, Duration::from_secs(1));
        tokio::pin!(fut);
        assert!(futures_util::poll!(fut.as_mut()).is_pending());
        assert!(manager.remove(dest, id));
        assert!(matches!(fut.await, Err(Error::Cancelled)));
    }

    #[test]
    fn drop_releases() {
        let (manager, _) = setup(Mode::Silent);
        let query = context(&manager);
        assert_eq!(manager.len(), 1);
        drop(query);
        assert!(manager.is_empty());
    }
}
