//! The resolution of a single host name.
//!
//! A [`Resolution`] is created for every call into the resolver. It owns
//! the query budget of the call and drives one or more passes. A pass
//! resolves a single name and record type. It is an explicit state machine
//! that only suspends while waiting for a single query to finish. Every
//! query takes one unit from the shared budget, so a resolution always
//! terminates.

use super::error::Error;
use super::lookup::FoundHosts;
use super::query::QueryContext;
use super::resolver::ResolverInner;
use super::servers::{Budget, ServerStream};
use crate::base::iana::{Rcode, Rtype};
use crate::base::message::{Message, Section};
use crate::base::name::Name;
use crate::base::question::Question;
use crate::base::record::{RecordData, Rrset};
use crate::cache::{Credibility, Lookup};
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::vec::Vec;
use tracing::{debug, trace, warn};

//------------ Module Configuration ------------------------------------------

/// How many aliases are followed within the cache.
const MAX_CACHED_ALIASES: usize = 16;

/// How deep resolving the addresses of name servers may nest.
const MAX_GLUE_DEPTH: u8 = 1;

//------------ Resolution ----------------------------------------------------

/// The state of one call into the resolver.
pub(crate) struct Resolution<'a> {
    /// The resolver we work for.
    resolver: &'a ResolverInner,

    /// The queries we may still send.
    budget: Budget,

    /// Whether the bare CNAME query has been tried already.
    cname_fallback: AtomicBool,

    /// Whether an alias has been chased already.
    chased: AtomicBool,
}

impl<'a> Resolution<'a> {
    pub fn new(resolver: &'a ResolverInner) -> Self {
        Resolution {
            resolver,
            budget: Budget::new(resolver.conf.query_budget()),
            cname_fallback: AtomicBool::new(false),
            chased: AtomicBool::new(false),
        }
    }

    /// Returns the number of queries sent so far.
    pub fn attempts(&self) -> u32 {
        self.budget.used()
    }

    /// Returns the query budget.
    pub fn budget(&self) -> u32 {
        self.budget.total()
    }
}

/// # Search Expansion
///
impl<'a> Resolution<'a> {
    /// Resolves the addresses for a host name.
    ///
    /// An absolute host name or a relative one with at least as many dots
    /// as configured via `ndots` is resolved as is. Otherwise, each suffix
    /// of the search list is appended in turn until one of them resolves.
    pub async fn lookup_host(&self, hostname: &str) -> Result<FoundHosts, Error> {
        if let Ok(addr) = IpAddr::from_str(hostname) {
            return Ok(FoundHosts::new(Name::root(), vec![addr]));
        }
        let name = Name::from_str(hostname)?;
        let conf = &self.resolver.conf;
        let dots = name.label_count().saturating_sub(1);
        if name.is_absolute() || dots >= conf.ndots() {
            let name = Name::concatenate(&name, &Name::root())?;
            return self.lookup_absolute(&name).await;
        }

        let root = [Name::root()];
        let search = if conf.search().is_empty() {
            &root[..]
        } else {
            conf.search()
        };
        let mut last_err = None;
        for suffix in search {
            let candidate = match Name::concatenate(&name, suffix) {
                Ok(candidate) => candidate,
                Err(err) => {
                    debug!("skipping search suffix {}: {}", suffix, err);
                    last_err = Some(Error::from(err));
                    continue;
                }
            };
            trace!("trying search candidate {}", candidate);
            match self.lookup_absolute(&candidate).await {
                Ok(found) => return Ok(found),
                Err(err @ (Error::QueryBudgetExhausted | Error::Cancelled)) => {
                    return Err(err)
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(Error::SearchDomainsExhausted(Box::new(
            last_err.unwrap_or(Error::NoServers),
        )))
    }

    /// Resolves the addresses of an absolute name.
    ///
    /// Consults the hosts table first. If the name can’t be resolved, makes
    /// one last attempt at finding an alias via a CNAME query.
    async fn lookup_absolute(&self, name: &Name) -> Result<FoundHosts, Error> {
        if let Some(addrs) = self.resolver.hosts.lookup_host(name) {
            debug!("{} found in hosts table", name);
            return Ok(FoundHosts::new(name.clone(), addrs.to_vec()));
        }
        let err = match self.resolve_addrs(name).await {
            Ok(found) => return Ok(found),
            Err(err) => err,
        };
        if matches!(
            err,
            Error::QueryBudgetExhausted | Error::Cancelled | Error::NxDomain
        ) || self.cname_fallback.swap(true, Ordering::Relaxed)
        {
            return Err(err);
        }
        debug!("trying CNAME fallback for {}", name);
        let target = match self.run_pass(name.clone(), Rtype::CNAME, 0).await {
            Ok(answer) => answer
                .rrsets
                .iter()
                .flat_map(|rrset| rrset.data())
                .find_map(RecordData::alias_target)
                .cloned(),
            Err(_) => None,
        };
        match target {
            Some(target) if target != *name => self.resolve_addrs(&target).await,
            _ => Err(err),
        }
    }

    /// Runs the address passes for `name`.
    ///
    /// The passes for all address families run concurrently. As soon as the
    /// preferred family has been resolved, all passes that can’t finish
    /// right away are abandoned.
    async fn resolve_addrs(&self, name: &Name) -> Result<FoundHosts, Error> {
        let preference = self.resolver.conf.addr_preference();
        let mut passes: FuturesUnordered<_> = preference
            .rtypes()
            .iter()
            .map(|&rtype| {
                self.run_pass(name.clone(), rtype, 0)
                    .map(move |res| (rtype, res))
            })
            .collect();

        let mut results = Vec::new();
        while let Some((rtype, res)) = passes.next().await {
            let done = rtype == preference.preferred() && res.is_ok();
            results.push((rtype, res));
            if done {
                while let Some(Some(item)) = passes.next().now_or_never() {
                    results.push(item);
                }
                break;
            }
        }
        drop(passes);

        let mut canonical = None;
        let mut addrs = Vec::new();
        let mut first_err = None;
        for &rtype in preference.rtypes() {
            match results.iter().find(|item| item.0 == rtype) {
                Some((_, Ok(answer))) => {
                    canonical.get_or_insert_with(|| answer.canonical.clone());
                    addrs.extend(answer.addrs());
                }
                Some((_, Err(err))) => {
                    if first_err.is_none()
                        || matches!(
                            err,
                            Error::QueryBudgetExhausted | Error::Cancelled
                        )
                    {
                        first_err = Some(err.clone())
                    }
                }
                None => {}
            }
        }
        match canonical {
            Some(canonical) if !addrs.is_empty() => {
                Ok(FoundHosts::new(canonical, addrs))
            }
            _ => Err(first_err.unwrap_or(Error::NoMatchingRecord)),
        }
    }
}

/// # Passes
///
impl<'a> Resolution<'a> {
    /// Resolves the records of type `qtype` for `qname`.
    ///
    /// `depth` is the nesting level of resolving name server addresses.
    fn run_pass(
        &self,
        qname: Name,
        qtype: Rtype,
        depth: u8,
    ) -> BoxFuture<'_, Result<Answer, Error>> {
        self.pass(qname, qtype, depth).boxed()
    }

    async fn pass(
        &self,
        qname: Name,
        qtype: Rtype,
        depth: u8,
    ) -> Result<Answer, Error> {
        let mut last_err = None;
        let mut state = match self.from_cache(qname, qtype) {
            Cached::Hit(res) => State::Done(res),
            Cached::Miss(qname) => self.start(qname),
        };
        loop {
            state = match state {
                State::Querying {
                    qname,
                    mut servers,
                    zone,
                } => {
                    let server = match servers.next() {
                        Some(server) => server,
                        None => {
                            return Err(last_err.unwrap_or(Error::NoServers))
                        }
                    };
                    match self.ask(server, &qname, qtype).await {
                        Ok(response) => self.process(
                            &response,
                            Step {
                                qname,
                                qtype,
                                server,
                                servers,
                                zone,
                            },
                            &mut last_err,
                        ),
                        Err(err) if err.is_retryable() => {
                            last_err = Some(err);
                            State::Querying {
                                qname,
                                servers,
                                zone,
                            }
                        }
                        Err(err) => State::Done(Err(err)),
                    }
                }
                State::Chasing {
                    target,
                    server,
                    servers,
                    zone,
                } => {
                    let target = match self.from_cache(target, qtype) {
                        Cached::Hit(res) => return res,
                        Cached::Miss(target) => target,
                    };
                    debug!("chasing alias {} at {}", target, server);
                    match self.ask(server, &target, qtype).await {
                        Ok(response) => self.process(
                            &response,
                            Step {
                                qname: target,
                                qtype,
                                server,
                                servers,
                                zone,
                            },
                            &mut last_err,
                        ),
                        Err(err) if err.is_retryable() => {
                            last_err = Some(err);
                            State::Querying {
                                qname: target,
                                servers,
                                zone,
                            }
                        }
                        Err(err) => State::Done(Err(err)),
                    }
                }
                State::Redirected {
                    qname,
                    zone,
                    ns,
                    glue,
                } => {
                    let addrs = self.delegation(&ns, glue, depth).await;
                    if addrs.is_empty() {
                        debug!("no usable servers for {}", zone);
                        State::Done(Err(last_err
                            .take()
                            .unwrap_or(Error::NoServers)))
                    } else {
                        State::Querying {
                            qname,
                            servers: ServerStream::once(addrs),
                            zone,
                        }
                    }
                }
                State::Done(res) => return res,
            }
        }
    }

    /// Returns the initial state for asking the network about `qname`.
    ///
    /// If the servers for an enclosing zone are known from an earlier
    /// referral, these are used. Otherwise the configured servers are.
    fn start(&self, qname: Name) -> State {
        let resolver = self.resolver;
        match resolver.auth.servers_for(&qname, resolver.conf.port()) {
            Some((zone, addrs)) => {
                trace!("using cached servers for {} to resolve {}", zone, qname);
                State::Querying {
                    qname,
                    servers: ServerStream::once(addrs),
                    zone,
                }
            }
            None => State::Querying {
                qname,
                servers: resolver
                    .servers
                    .stream(resolver.conf.attempts(), resolver.conf.rotate()),
                zone: Name::root(),
            },
        }
    }

    /// Checks what the cache knows about `qname` and `qtype`.
    ///
    /// Aliases known to the cache are followed. If nothing useful is known
    /// about the final name, returns that name.
    fn from_cache(&self, mut qname: Name, qtype: Rtype) -> Cached {
        let cache = &self.resolver.cache;
        for _ in 0..MAX_CACHED_ALIASES {
            match cache.lookup(&qname, qtype, Credibility::NORMAL) {
                Lookup::Successful(rrsets) => {
                    trace!("cache hit for {} {}", qname, qtype);
                    return Cached::Hit(Ok(Answer {
                        canonical: qname,
                        rrsets,
                    }));
                }
                Lookup::NxDomain => return Cached::Hit(Err(Error::NxDomain)),
                Lookup::NxRrset => {
                    return Cached::Hit(Err(Error::NoMatchingRecord))
                }
                Lookup::Cname(rrset) => {
                    match rrset.data().iter().find_map(RecordData::alias_target)
                    {
                        Some(target) => qname = target.clone(),
                        None => break,
                    }
                }
                Lookup::Dname(rrset) => {
                    let rewritten = match *rrset.first() {
                        RecordData::Dname(ref target) => {
                            qname.from_dname(rrset.owner(), target)
                        }
                        _ => Ok(None),
                    };
                    match rewritten {
                        Ok(Some(name)) => qname = name,
                        _ => break,
                    }
                }
                Lookup::Delegation(_) | Lookup::Unknown => break,
            }
        }
        Cached::Miss(qname)
    }

    /// Sends one query and waits for the response.
    ///
    /// Takes one query from the budget. Usable responses are added to the
    /// cache.
    async fn ask(
        &self,
        server: SocketAddr,
        qname: &Name,
        qtype: Rtype,
    ) -> Result<Message, Error> {
        let resolver = self.resolver;
        if resolver.closed.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        if !self.budget.take() {
            debug!("query budget exhausted before asking for {} {}", qname, qtype);
            return Err(Error::QueryBudgetExhausted);
        }
        let question = Question::new_in(qname.clone(), qtype);
        let mut query =
            QueryContext::new(resolver.manager.clone(), server, question)?;
        let response = query
            .query(
                resolver.transport.as_ref(),
                resolver.hook.as_deref(),
                resolver.conf.timeout(),
            )
            .await?;
        let rcode = response.rcode();
        if rcode != Rcode::NOERROR && rcode != Rcode::NXDOMAIN {
            debug!("{} answered {} for {} {}", server, rcode, qname, qtype);
            return Err(Error::ServerFailure(rcode));
        }
        resolver.cache.add_message(&response);
        Ok(response)
    }

    /// Decides what to do next based on a response.
    fn process(
        &self,
        response: &Message,
        step: Step,
        last_err: &mut Option<Error>,
    ) -> State {
        match classify(response, &step.qname, step.qtype) {
            Outcome::Answer(answer) => {
                trace!("{} {} resolved", step.qname, step.qtype);
                State::Done(Ok(answer))
            }
            Outcome::NxDomain => State::Done(Err(Error::NxDomain)),
            Outcome::NoData => State::Done(Err(Error::NoMatchingRecord)),
            Outcome::Alias(target) => {
                if self.chased.swap(true, Ordering::Relaxed) {
                    debug!("not chasing second alias {}", target);
                    return State::Done(Err(Error::NoMatchingRecord));
                }
                State::Chasing {
                    target,
                    server: step.server,
                    servers: step.servers,
                    zone: step.zone,
                }
            }
            Outcome::Referral { zone, ns, glue } => {
                if zone == step.zone || !zone.is_subdomain_of(&step.zone) {
                    warn!(
                        "lame referral to {} from {} for zone {}",
                        zone, step.server, step.zone
                    );
                    *last_err = Some(Error::ServerFailure(response.rcode()));
                    return State::Querying {
                        qname: step.qname,
                        servers: step.servers,
                        zone: step.zone,
                    };
                }
                debug!("{} redirects {} to {}", step.server, step.qname, zone);
                State::Redirected {
                    qname: step.qname,
                    zone,
                    ns,
                    glue,
                }
            }
        }
    }

    /// Determines the server addresses for a delegation.
    ///
    /// Uses the glue where present and resolves the names of the other
    /// servers unless that would nest too deeply. The delegation is added
    /// to the authoritative server cache.
    async fn delegation(
        &self,
        ns: &Rrset,
        mut glue: Vec<Rrset>,
        depth: u8,
    ) -> Vec<SocketAddr> {
        let port = self.resolver.conf.port();
        if depth < MAX_GLUE_DEPTH {
            let bare: Vec<Name> = ns
                .data()
                .iter()
                .filter_map(RecordData::additional_name)
                .filter(|name| !glue.iter().any(|rrset| rrset.owner() == *name))
                .cloned()
                .collect();
            for name in bare {
                for &rtype in self.resolver.conf.addr_preference().rtypes() {
                    trace!("resolving server address {} {}", name, rtype);
                    match self.run_pass(name.clone(), rtype, depth + 1).await {
                        Ok(answer) => glue.extend(
                            answer
                                .rrsets
                                .into_iter()
                                .filter(|rrset| rrset.rtype().is_address())
                                .map(|mut rrset| {
                                    rrset.set_owner(name.clone());
                                    rrset
                                }),
                        ),
                        Err(Error::QueryBudgetExhausted) => break,
                        Err(err) => {
                            debug!("cannot resolve server {}: {}", name, err)
                        }
                    }
                }
            }
        }
        self.resolver.auth.add_delegation(ns, &glue);
        let preference = self.resolver.conf.addr_preference().rtypes();
        glue.iter()
            .filter(|rrset| preference.contains(&rrset.rtype()))
            .flat_map(|rrset| rrset.data())
            .filter_map(RecordData::addr)
            .map(|addr| SocketAddr::new(addr, port))
            .collect()
    }
}

/// # Raw Queries
///
impl<'a> Resolution<'a> {
    /// Sends a single question to the configured servers.
    ///
    /// Returns the first response with a response code of NOERROR or
    /// NXDOMAIN.
    pub async fn query(&self, qname: &Name, qtype: Rtype) -> Result<Message, Error> {
        let resolver = self.resolver;
        let qname = &Name::concatenate(qname, &Name::root())?;
        let mut last_err = None;
        for server in resolver
            .servers
            .stream(resolver.conf.attempts(), resolver.conf.rotate())
        {
            match self.ask(server, qname, qtype).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() => last_err = Some(err),
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or(Error::NoServers))
    }
}

//------------ State ---------------------------------------------------------

/// The state of a pass.
enum State {
    /// Asking the servers in `servers` for `qname`.
    ///
    /// The servers are those for `zone`.
    Querying {
        qname: Name,
        servers: ServerStream,
        zone: Name,
    },

    /// Following an alias to `target` at the server that returned it.
    Chasing {
        target: Name,
        server: SocketAddr,
        servers: ServerStream,
        zone: Name,
    },

    /// Moving on to the servers of `zone` given by a referral.
    Redirected {
        qname: Name,
        zone: Name,
        ns: Rrset,
        glue: Vec<Rrset>,
    },

    /// The pass has finished.
    Done(Result<Answer, Error>),
}

/// What was asked where.
struct Step {
    qname: Name,
    qtype: Rtype,
    server: SocketAddr,
    servers: ServerStream,
    zone: Name,
}

/// The result of consulting the cache.
enum Cached {
    /// The cache has the final answer.
    Hit(Result<Answer, Error>),

    /// The network needs to be asked for this name.
    Miss(Name),
}

//------------ Answer --------------------------------------------------------

/// The records found by a pass.
#[derive(Clone, Debug)]
pub(crate) struct Answer {
    /// The name that actually carries the records.
    pub canonical: Name,

    /// The record sets.
    pub rrsets: Vec<Rrset>,
}

impl Answer {
    /// Returns the addresses contained in the answer.
    pub fn addrs(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.rrsets
            .iter()
            .flat_map(|rrset| rrset.data())
            .filter_map(RecordData::addr)
    }
}

//------------ Outcome -------------------------------------------------------

/// What a response means for the question.
#[derive(Debug)]
enum Outcome {
    /// The response contains the records.
    Answer(Answer),

    /// The response only shows that the name is an alias for this name.
    Alias(Name),

    /// The response refers to the servers of a closer zone.
    Referral {
        zone: Name,
        ns: Rrset,
        glue: Vec<Rrset>,
    },

    /// The name does not exist.
    NxDomain,

    /// The name exists but has no records of the type.
    NoData,
}

/// Classifies a response to the question for `qname` and `qtype`.
///
/// Aliases in the answer section are followed down to the name actually
/// carrying the records. Names are compared ignoring case.
fn classify(response: &Message, qname: &Name, qtype: Rtype) -> Outcome {
    let answer = response.rrsets(Section::Answer);
    let mut curname = qname.clone();
    for _ in 0..=answer.len() {
        let rrsets: Vec<Rrset> = answer
            .iter()
            .filter(|rrset| rrset.rtype() == qtype && *rrset.owner() == curname)
            .cloned()
            .collect();
        if !rrsets.is_empty() {
            return Outcome::Answer(Answer {
                canonical: curname,
                rrsets,
            });
        }
        match alias_step(&answer, &curname) {
            Some(next) => curname = next,
            None => break,
        }
    }

    if response.rcode() == Rcode::NXDOMAIN {
        return Outcome::NxDomain;
    }
    if curname != *qname {
        return Outcome::Alias(curname);
    }

    let authority = response.rrsets(Section::Authority);
    if authority.iter().any(|rrset| rrset.rtype() == Rtype::SOA) {
        return Outcome::NoData;
    }
    let ns = authority
        .into_iter()
        .filter(|rrset| {
            rrset.rtype() == Rtype::NS && curname.is_subdomain_of(rrset.owner())
        })
        .max_by_key(|rrset| rrset.owner().label_count());
    match ns {
        Some(ns) if answer.is_empty() => {
            let targets: Vec<&Name> = ns
                .data()
                .iter()
                .filter_map(RecordData::additional_name)
                .collect();
            let glue = response
                .rrsets(Section::Additional)
                .into_iter()
                .filter(|rrset| {
                    rrset.rtype().is_address()
                        && targets.contains(&rrset.owner())
                })
                .collect();
            Outcome::Referral {
                zone: ns.owner().clone(),
                ns,
                glue,
            }
        }
        _ => Outcome::NoData,
    }
}

/// Returns the name `name` is aliased to by the answer section.
fn alias_step(answer: &[Rrset], name: &Name) -> Option<Name> {
    for rrset in answer {
        match *rrset.first() {
            RecordData::Cname(ref target) if rrset.owner() == name => {
                return Some(target.clone())
            }
            RecordData::Dname(ref target) => {
                if let Ok(Some(res)) = name.from_dname(rrset.owner(), target) {
                    return Some(res);
                }
            }
            _ => {}
        }
    }
    None
}

//============ Testing =======================================================
