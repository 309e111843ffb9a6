//! A scripted network for resolver tests.
#![allow(dead_code)]

use bytes::Bytes;
use domain_resolver::base::iana::{Class, Rcode, Rtype};
use domain_resolver::base::message::{Message, Section};
use domain_resolver::base::name::Name;
use domain_resolver::base::question::Question;
use domain_resolver::base::record::{Record, RecordData, Soa};
use domain_resolver::resolv::{AddrPreference, Inbound, ResolvConf, Transport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

//------------ Reply ---------------------------------------------------------

/// What a scripted server does with a query.
pub enum Reply {
    /// Responds right away.
    Answer(Message),

    /// Responds after some time.
    Delayed(Duration, Message),

    /// Never responds.
    Drop,

    /// Sending the query fails.
    Fail,
}

/// A scripted server.
pub type Handler = Arc<dyn Fn(&Message) -> Reply + Send + Sync>;

//------------ MockTransport -------------------------------------------------

/// A transport answering from scripted servers.
///
/// Queries to addresses without a handler are dropped.
#[derive(Default)]
pub struct MockTransport {
    handlers: Mutex<HashMap<SocketAddr, Handler>>,
    inbound: OnceLock<Inbound>,
    queries: Mutex<Vec<(SocketAddr, Question)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Installs the handler for `addr`.
    pub fn handle(
        &self,
        addr: SocketAddr,
        handler: impl Fn(&Message) -> Reply + Send + Sync + 'static,
    ) {
        self.handlers.lock().insert(addr, Arc::new(handler));
    }

    /// Sets where responses go.
    pub fn connect(&self, inbound: Inbound) {
        assert!(self.inbound.set(inbound).is_ok(), "connected twice");
    }

    /// Returns the number of queries sent so far.
    pub fn count(&self) -> usize {
        self.queries.lock().len()
    }

    /// Returns all queries sent so far.
    pub fn queries(&self) -> Vec<(SocketAddr, Question)> {
        self.queries.lock().clone()
    }

    /// Returns the query names in the order they were sent.
    pub fn qnames(&self) -> Vec<String> {
        self.queries
            .lock()
            .iter()
            .map(|(_, question)| question.qname().to_string())
            .collect()
    }

    fn deliver(&self, source: SocketAddr, response: &Message) {
        let inbound = self.inbound.get().expect("transport not connected");
        // The query may have given up already.
        let _ = inbound.deliver(source, &response.to_vec());
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        dest: SocketAddr,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), io::Error>> + Send + '_>> {
        Box::pin(async move {
            let query = Message::from_octets(&data).expect("bad query");
            let question = query.first_question().expect("no question").clone();
            self.queries.lock().push((dest, question));
            let handler = self.handlers.lock().get(&dest).cloned();
            let reply = match handler {
                Some(handler) => handler(&query),
                None => Reply::Drop,
            };
            match reply {
                Reply::Answer(response) => self.deliver(dest, &response),
                Reply::Delayed(delay, response) => {
                    let inbound =
                        self.inbound.get().expect("transport not connected").clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = inbound.deliver(dest, &response.to_vec());
                    });
                }
                Reply::Drop => {}
                Reply::Fail => {
                    return Err(io::ErrorKind::ConnectionRefused.into())
                }
            }
            Ok(())
        })
    }
}

//------------ Helpers -------------------------------------------------------

/// Sends log output to the test harness, filtered by `RUST_LOG`.
pub fn init_logging() {
    // Only the first test in a binary gets to install the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn name(s: &str) -> Name {
    s.parse().unwrap()
}

/// Returns the address of test server `n`.
pub fn server(n: u8) -> SocketAddr {
    SocketAddr::from(([192, 0, 2, n], 53))
}

/// Returns a configuration using the given servers once each.
pub fn conf(servers: &[SocketAddr]) -> ResolvConf {
    let mut conf = ResolvConf::new();
    for addr in servers {
        conf.add_server(*addr);
    }
    conf.set_attempts(1);
    conf.set_timeout(Duration::from_secs(1));
    conf.set_addr_preference(AddrPreference::Ipv4Only);
    conf
}

pub fn record(owner: &str, data: RecordData) -> Record {
    Record::new(name(owner), Class::IN, 300, data)
}

pub fn a(owner: &str, addr: &str) -> Record {
    match addr.parse::<IpAddr>().unwrap() {
        IpAddr::V4(addr) => record(owner, RecordData::A(addr)),
        IpAddr::V6(addr) => record(owner, RecordData::Aaaa(addr)),
    }
}

pub fn cname(owner: &str, target: &str) -> Record {
    record(owner, RecordData::Cname(name(target)))
}

pub fn ns(owner: &str, target: &str) -> Record {
    record(owner, RecordData::Ns(name(target)))
}

pub fn soa(zone: &str) -> Record {
    record(
        zone,
        RecordData::Soa(Soa {
            mname: name(&format!("ns.{}", zone)),
            rname: name(&format!("hostmaster.{}", zone)),
            serial: 1,
            refresh: 3600,
            retry: 600,
            expire: 86400,
            minimum: 60,
        }),
    )
}

/// Creates a response to `query` with the given sections.
pub fn respond(
    query: &Message,
    answer: Vec<Record>,
    authority: Vec<Record>,
    additional: Vec<Record>,
) -> Message {
    let mut res = Message::answer_for(query);
    for record in answer {
        res.push(Section::Answer, record)
    }
    for record in authority {
        res.push(Section::Authority, record)
    }
    for record in additional {
        res.push(Section::Additional, record)
    }
    res
}

/// Creates a response with the given code and nothing else.
pub fn rcode(query: &Message, rcode: Rcode) -> Message {
    let mut res = Message::answer_for(query);
    res.header_mut().set_rcode(rcode);
    res
}

/// Creates a negative response from the server of `zone`.
pub fn nxdomain(query: &Message, zone: &str) -> Message {
    let mut res = respond(query, vec![], vec![soa(zone)], vec![]);
    res.header_mut().set_rcode(Rcode::NXDOMAIN);
    res
}

/// Creates a response stating there is no data of the queried type.
pub fn nodata(query: &Message, zone: &str) -> Message {
    respond(query, vec![], vec![soa(zone)], vec![])
}

/// Returns the question name and type of a query.
pub fn asked(query: &Message) -> (String, Rtype) {
    let question = query.first_question().unwrap();
    (question.qname().to_string(), question.qtype())
}
