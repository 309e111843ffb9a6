//! A credibility-ranked record cache.
//!
//! The [`Cache`] keeps record sets and negative answers keyed by domain name
//! and record type. Each piece of data is tagged with a [`Credibility`]
//! derived from where it was learned. Data is only ever replaced by data
//! that is at least as credible. Data of equal credibility is merged when
//! added record by record and replaced when added as a complete set.
//!
//! All data expires after its TTL, capped by the configured maxima. Expired
//! data is never actively swept. It is dropped when it is encountered by a
//! later read or write. The number of names is bounded. Once the bound is
//! exceeded, the least recently used names are dropped together with all
//! their data.
//!
//! Reading from the cache happens through [`Cache::lookup`] which
//! classifies what the cache knows about a name and type in a [`Lookup`].
//! Responses are added wholesale through [`Cache::add_message`].
//!
//! The [`AuthoritativeServerCache`] is a specialised cache that only keeps
//! delegations learned from referrals.
//!
//! Time is taken from a [`Clock`]. By default, this is the
//! [`SystemClock`], tests can use a [`FakeClock`][crate::utils::clock::FakeClock]
//! instead.

pub use self::authoritative::AuthoritativeServerCache;
pub use self::config::Config;
pub use self::credibility::Credibility;
pub use self::entry::{CacheEntry, NXDOMAIN_TYPE};

use crate::base::iana::{Rcode, Rtype};
use crate::base::message::{Message, Section};
use crate::base::name::Name;
use crate::base::record::{Record, RecordData, Rrset};
use crate::utils::clock::{Clock, SystemClock};
use lru::LruCache;
use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};
use std::collections::HashSet;
use std::time::Duration;
use std::vec::Vec;
use tracing::{debug, trace};

mod authoritative;
mod config;
mod credibility;
mod entry;

//------------ Cache ---------------------------------------------------------

/// A cache for DNS data.
///
/// The cache can be shared between tasks and threads. A single lock covers
/// the whole name index, so operations on different names are serialized
/// just like operations on the same name. Each operation holds the lock for
/// its whole duration, which makes adding a message atomic. No operation
/// awaits anything, so the lock is only ever held briefly.
pub struct Cache<C: Clock = SystemClock> {
    /// The data and the configuration.
    inner: Mutex<Inner>,

    /// The clock for expiring data.
    clock: C,
}

/// The entries kept for one name.
///
/// Each record type appears at most once, whether positive or negative.
type Entries = SmallVec<[CacheEntry; 2]>;

/// The lockable part of a cache.
struct Inner {
    /// The entries by name in order of recent use.
    names: LruCache<Name, Entries>,

    /// The current configuration.
    config: Config,
}

impl Cache {
    /// Creates a new cache with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new cache with the given configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self::with_time_config(config, SystemClock::new())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Cache<C> {
    /// Creates a new cache using the given clock.
    #[must_use]
    pub fn new_with_time(clock: C) -> Self {
        Self::with_time_config(Config::default(), clock)
    }

    /// Creates a new cache with the given configuration and clock.
    #[must_use]
    pub fn with_time_config(config: Config, clock: C) -> Self {
        Cache {
            inner: Mutex::new(Inner {
                names: LruCache::unbounded(),
                config,
            }),
            clock,
        }
    }
}

/// # Adding Data
///
impl<C: Clock> Cache<C> {
    /// Adds a single record.
    ///
    /// If there is already data of higher credibility for the record’s
    /// owner and type, the record is ignored. If there is a record set of
    /// the same credibility, the record is added to it. Otherwise, a new set
    /// is created for the record, replacing any existing data.
    ///
    /// # Panics
    ///
    /// The method panics if the record’s type is a query-only type.
    pub fn add_record(&self, record: &Record, credibility: Credibility) {
        let now = self.clock.now();
        self.inner.lock().add_record(record, credibility, now)
    }

    /// Adds a record set.
    ///
    /// If there is already data of higher credibility for the set’s owner
    /// and type, the set is ignored. Otherwise it replaces any existing
    /// data. A set with a TTL of zero is not stored but still removes
    /// existing data of lower or equal credibility.
    ///
    /// # Panics
    ///
    /// The method panics if the set’s type is a query-only type.
    pub fn add_rrset(&self, rrset: &Rrset, credibility: Credibility) {
        let now = self.clock.now();
        self.inner.lock().add_rrset(rrset, credibility, now)
    }

    /// Adds the knowledge that `name` has no data of type `qtype`.
    ///
    /// If `qtype` is [`NXDOMAIN_TYPE`], the name doesn’t exist at all. The
    /// TTL of the entry is the smaller of the TTL of the SOA record and its
    /// minimum field. Without an SOA record, the TTL is zero. The same
    /// credibility rules as for [`add_rrset`][Self::add_rrset] apply.
    ///
    /// # Panics
    ///
    /// The method panics if `soa` is not an SOA record.
    pub fn add_negative(
        &self,
        name: &Name,
        qtype: Rtype,
        soa: Option<&Record>,
        credibility: Credibility,
    ) {
        let ttl = soa.map(|soa| match *soa.data() {
            RecordData::Soa(ref data) => soa.ttl().min(data.minimum),
            _ => panic!("negative entry with non-SOA record"),
        });
        let now = self.clock.now();
        self.inner
            .lock()
            .add_negative(name, qtype, ttl.unwrap_or(0), credibility, now)
    }

    /// Adds all the relevant data of a response.
    ///
    /// Returns what a lookup for the question of the response would now
    /// produce.
    pub fn add_message(&self, message: &Message) -> Lookup {
        let now = self.clock.now();
        self.inner.lock().add_message(message, now)
    }
}

/// # Reading Data
///
impl<C: Clock> Cache<C> {
    /// Looks up what the cache knows about `name` and `rtype`.
    ///
    /// Only data of at least `min_credibility` is considered. See [`Lookup`]
    /// for the possible outcomes.
    ///
    /// # Panics
    ///
    /// The method panics if `name` is relative.
    pub fn lookup(
        &self,
        name: &Name,
        rtype: Rtype,
        min_credibility: Credibility,
    ) -> Lookup {
        let now = self.clock.now();
        self.inner.lock().lookup(name, rtype, min_credibility, now)
    }

    /// Returns the record sets for `name` and `rtype` if they are cached.
    ///
    /// This is a shortcut for a lookup at normal credibility.
    pub fn find_records(&self, name: &Name, rtype: Rtype) -> Option<Vec<Rrset>> {
        match self.lookup(name, rtype, Credibility::NORMAL) {
            Lookup::Successful(rrsets) => Some(rrsets),
            _ => None,
        }
    }

    /// Returns the number of names currently in the cache.
    ///
    /// This includes names with only expired data.
    pub fn len(&self) -> usize {
        self.inner.lock().names.len()
    }

    /// Returns whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().names.is_empty()
    }
}

/// # Administration
///
impl<C: Clock> Cache<C> {
    /// Removes all data for `name`.
    pub fn flush_name(&self, name: &Name) {
        self.inner.lock().names.pop(name);
    }

    /// Removes the data for `name` and `rtype`.
    pub fn flush_set(&self, name: &Name, rtype: Rtype) {
        self.inner.lock().remove(name, rtype)
    }

    /// Removes all data.
    pub fn clear(&self) {
        self.inner.lock().names.clear()
    }

    /// Returns the current configuration.
    pub fn config(&self) -> Config {
        self.inner.lock().config
    }

    /// Sets the maximum number of names.
    ///
    /// Excess names are only dropped on the next access.
    pub fn set_max_entries(&self, value: usize) {
        self.inner.lock().config.set_max_entries(value)
    }

    /// Sets the maximum time positive data is cached.
    ///
    /// Only affects data added afterwards.
    pub fn set_max_cache(&self, value: Duration) {
        self.inner.lock().config.set_max_cache(value)
    }

    /// Sets the maximum time negative data is cached.
    ///
    /// Only affects data added afterwards.
    pub fn set_max_ncache(&self, value: Duration) {
        self.inner.lock().config.set_max_ncache(value)
    }
}

//--- Debug

impl<C: Clock> std::fmt::Debug for Cache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Cache")
            .field("names", &inner.names.len())
            .field("config", &inner.config)
            .finish()
    }
}

//------------ Inner ---------------------------------------------------------

impl Inner {
    /// Returns the live entry for `name` and `rtype`.
    ///
    /// Drops the entry if it has expired. Marks the name as used.
    fn entry(
        &mut self,
        name: &Name,
        rtype: Rtype,
        now: Duration,
    ) -> Option<&mut CacheEntry> {
        let (idx, expired) = {
            let entries = self.names.get_mut(name)?;
            let idx = entries.iter().position(|item| item.rtype() == rtype)?;
            (idx, entries[idx].is_expired(now))
        };
        if expired {
            trace!("cache: {} {} expired", name, rtype);
            self.remove_at(name, idx);
            return None;
        }
        self.names.peek_mut(name).map(|entries| &mut entries[idx])
    }

    /// Returns the live entry if it is at least `min_credibility`.
    fn get(
        &mut self,
        name: &Name,
        rtype: Rtype,
        min_credibility: Credibility,
        now: Duration,
    ) -> Option<&CacheEntry> {
        self.entry(name, rtype, now)
            .map(|entry| &*entry)
            .filter(|entry| entry.credibility() >= min_credibility)
    }

    /// Returns a live record set if it is at least `min_credibility`.
    fn positive(
        &mut self,
        name: &Name,
        rtype: Rtype,
        min_credibility: Credibility,
        now: Duration,
    ) -> Option<Rrset> {
        self.get(name, rtype, min_credibility, now)
            .and_then(|entry| entry.rrset_at(now))
    }

    /// Stores an entry, replacing one of the same type.
    fn insert(&mut self, name: &Name, entry: CacheEntry) {
        match self.names.get_mut(name) {
            Some(entries) => {
                match entries.iter_mut().find(|item| item.rtype() == entry.rtype())
                {
                    Some(item) => *item = entry,
                    None => entries.push(entry),
                }
            }
            None => {
                self.names.put(name.clone(), smallvec![entry]);
            }
        }
        self.evict();
    }

    /// Removes the entry for `name` and `rtype`.
    fn remove(&mut self, name: &Name, rtype: Rtype) {
        let idx = self.names.peek(name).and_then(|entries| {
            entries.iter().position(|item| item.rtype() == rtype)
        });
        if let Some(idx) = idx {
            self.remove_at(name, idx)
        }
    }

    /// Removes an entry by index, dropping the name if it becomes empty.
    fn remove_at(&mut self, name: &Name, idx: usize) {
        let empty = match self.names.peek_mut(name) {
            Some(entries) => {
                entries.remove(idx);
                entries.is_empty()
            }
            None => false,
        };
        if empty {
            self.names.pop(name);
        }
    }

    /// Drops the least recently used names until the limit is kept.
    fn evict(&mut self) {
        while self.names.len() > self.config.max_entries() {
            if let Some((name, _)) = self.names.pop_lru() {
                debug!("cache: evicting {}", name);
            }
        }
    }

    fn add_record(
        &mut self,
        record: &Record,
        credibility: Credibility,
        now: Duration,
    ) {
        let rtype = record.rtype();
        assert!(!rtype.is_query_only(), "caching query-only type {rtype}");
        let max_cache = self.config.max_cache();
        if let Some(entry) = self.entry(record.owner(), rtype, now) {
            if entry.credibility() > credibility {
                return;
            }
            if entry.credibility() == credibility && !entry.is_negative() {
                let rrset = Rrset::new(record.clone());
                entry.merge(&rrset, now, max_cache);
                return;
            }
        }
        self.add_rrset(&Rrset::new(record.clone()), credibility, now)
    }

    fn add_rrset(&mut self, rrset: &Rrset, credibility: Credibility, now: Duration) {
        let rtype = rrset.rtype();
        assert!(!rtype.is_query_only(), "caching query-only type {rtype}");
        let existing = self
            .entry(rrset.owner(), rtype, now)
            .map(|entry| entry.credibility());
        if let Some(existing) = existing {
            if existing > credibility {
                trace!(
                    "cache: keeping {} {} at {} over {}",
                    rrset.owner(),
                    rtype,
                    existing,
                    credibility
                );
                return;
            }
        }
        if rrset.ttl() == 0 {
            if existing.is_some() {
                self.remove(rrset.owner(), rtype);
            }
            return;
        }
        let max_cache = self.config.max_cache();
        self.insert(
            rrset.owner(),
            CacheEntry::positive(rrset.clone(), credibility, now, max_cache),
        );
    }

    fn add_negative(
        &mut self,
        name: &Name,
        qtype: Rtype,
        ttl: u32,
        credibility: Credibility,
        now: Duration,
    ) {
        assert!(name.is_absolute(), "relative name {} in cache", name);
        let existing = self.entry(name, qtype, now).map(|entry| entry.credibility());
        if let Some(existing) = existing {
            if existing > credibility {
                return;
            }
        }
        if ttl == 0 {
            if existing.is_some() {
                self.remove(name, qtype);
            }
            return;
        }
        let max_ncache = self.config.max_ncache();
        self.insert(
            name,
            CacheEntry::negative(qtype, ttl, credibility, now, max_ncache),
        );
    }

    fn lookup(
        &mut self,
        name: &Name,
        rtype: Rtype,
        min_credibility: Credibility,
        now: Duration,
    ) -> Lookup {
        assert!(name.is_absolute(), "relative name {} in cache", name);
        self.evict();
        for (i, tname) in name.iter_suffixes().enumerate() {
            let exact = i == 0;
            if !self.names.contains(&tname) {
                continue;
            }
            if exact && rtype == Rtype::ANY {
                let rrsets = self.collect(&tname, min_credibility, now);
                if !rrsets.is_empty() {
                    return Lookup::Successful(rrsets);
                }
            } else if exact {
                if let Some(entry) = self.get(&tname, rtype, min_credibility, now)
                {
                    return match entry.rrset_at(now) {
                        Some(rrset) => Lookup::Successful(vec![rrset]),
                        None => Lookup::NxRrset,
                    };
                }
                if let Some(rrset) =
                    self.positive(&tname, Rtype::CNAME, min_credibility, now)
                {
                    return Lookup::Cname(rrset);
                }
            } else if let Some(rrset) =
                self.positive(&tname, Rtype::DNAME, min_credibility, now)
            {
                return Lookup::Dname(rrset);
            }

            if let Some(rrset) =
                self.positive(&tname, Rtype::NS, min_credibility, now)
            {
                return Lookup::Delegation(rrset);
            }

            if exact
                && self
                    .get(&tname, NXDOMAIN_TYPE, min_credibility, now)
                    .is_some()
            {
                return Lookup::NxDomain;
            }
        }
        Lookup::Unknown
    }

    /// Returns all live record sets for a name.
    fn collect(
        &mut self,
        name: &Name,
        min_credibility: Credibility,
        now: Duration,
    ) -> Vec<Rrset> {
        let (res, empty) = match self.names.get_mut(name) {
            Some(entries) => {
                entries.retain(|entry| !entry.is_expired(now));
                let res = entries
                    .iter()
                    .filter(|entry| entry.credibility() >= min_credibility)
                    .filter_map(|entry| entry.rrset_at(now))
                    .collect();
                (res, entries.is_empty())
            }
            None => return Vec::new(),
        };
        if empty {
            self.names.pop(name);
        }
        res
    }

    fn add_message(&mut self, message: &Message, now: Duration) -> Lookup {
        let question = match message.first_question() {
            Some(question) => question,
            None => return Lookup::Unknown,
        };
        let rcode = message.rcode();
        if rcode != Rcode::NOERROR && rcode != Rcode::NXDOMAIN {
            return Lookup::Unknown;
        }
        let authoritative = message.header().aa();
        let qtype = question.qtype();
        let mut curname = question.qname().clone();
        let mut aliased = false;
        let mut completed = false;
        let mut response = None;
        let mut additional_names = HashSet::new();

        let credibility = Credibility::answer(authoritative);
        for rrset in message.rrsets(Section::Answer) {
            if rrset.class() != question.qclass() {
                continue;
            }
            let rtype = rrset.rtype();
            if rtype.is_query_only() {
                debug!("cache: ignoring {} record for {}", rtype, rrset.owner());
                continue;
            }
            if (rtype == qtype || qtype == Rtype::ANY)
                && *rrset.owner() == curname
            {
                self.add_rrset(&rrset, credibility, now);
                completed = true;
                mark_additional(&rrset, &mut additional_names);
                if !aliased {
                    match response {
                        Some(Lookup::Successful(ref mut rrsets)) => {
                            rrsets.push(rrset)
                        }
                        _ => response = Some(Lookup::Successful(vec![rrset])),
                    }
                }
            } else if rtype == Rtype::CNAME && *rrset.owner() == curname {
                self.add_rrset(&rrset, credibility, now);
                if let RecordData::Cname(ref target) = *rrset.first() {
                    curname = target.clone();
                }
                if !aliased {
                    response = Some(Lookup::Cname(rrset));
                }
                aliased = true;
            } else if rtype == Rtype::DNAME
                && *rrset.owner() != curname
                && curname.is_subdomain_of(rrset.owner())
            {
                self.add_rrset(&rrset, credibility, now);
                if let RecordData::Dname(ref target) = *rrset.first() {
                    match curname.from_dname(rrset.owner(), target) {
                        Ok(Some(name)) => curname = name,
                        Ok(None) => {}
                        Err(_) => break,
                    }
                }
                if !aliased {
                    response = Some(Lookup::Dname(rrset));
                }
                aliased = true;
            }
        }

        let mut soa = None;
        let mut ns = None;
        for rrset in message.rrsets(Section::Authority) {
            if !curname.is_subdomain_of(rrset.owner()) {
                continue;
            }
            if rrset.rtype() == Rtype::SOA {
                soa = Some(rrset)
            } else if rrset.rtype() == Rtype::NS {
                ns = Some(rrset)
            }
        }

        let credibility = Credibility::authority(authoritative);
        if !completed {
            let nxdomain = rcode == Rcode::NXDOMAIN;
            match ns {
                Some(ns) if !nxdomain && soa.is_none() => {
                    trace!("cache: referral to {}", ns.owner());
                    self.add_rrset(&ns, credibility, now);
                    mark_additional(&ns, &mut additional_names);
                    if response.is_none() {
                        response = Some(Lookup::Delegation(ns));
                    }
                }
                _ => {
                    let ttl = soa.as_ref().map(negative_ttl).unwrap_or(0);
                    let cachetype = if nxdomain { NXDOMAIN_TYPE } else { qtype };
                    self.add_negative(&curname, cachetype, ttl, credibility, now);
                    if response.is_none() {
                        response = Some(if nxdomain {
                            Lookup::NxDomain
                        } else {
                            Lookup::NxRrset
                        });
                    }
                }
            }
        } else if let Some(ns) = ns {
            if rcode == Rcode::NOERROR {
                self.add_rrset(&ns, credibility, now);
                mark_additional(&ns, &mut additional_names);
            }
        }

        let credibility = Credibility::additional(authoritative);
        for rrset in message.rrsets(Section::Additional) {
            if rrset.rtype().is_address()
                && additional_names.contains(rrset.owner())
            {
                self.add_rrset(&rrset, credibility, now);
            }
        }

        response.unwrap_or(Lookup::Unknown)
    }
}

/// Remembers the names whose addresses may be cached from the additional
/// section.
fn mark_additional(rrset: &Rrset, names: &mut HashSet<Name>) {
    for data in rrset.data() {
        if let Some(name) = data.additional_name() {
            names.insert(name.clone());
        }
    }
}

/// Returns the TTL for negative data from an SOA record set.
fn negative_ttl(soa: &Rrset) -> u32 {
    match *soa.first() {
        RecordData::Soa(ref data) => soa.ttl().min(data.minimum),
        _ => soa.ttl(),
    }
}

//------------ Lookup --------------------------------------------------------

/// What the cache knows about a name and type.
///
/// More specific names always take precedence over less specific ones.
/// For the name itself, data of the requested type takes precedence over
/// a CNAME which takes precedence over an NS record set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Lookup {
    /// Nothing useful is known.
    Unknown,

    /// The name does not exist.
    NxDomain,

    /// The name exists but has no data of the requested type.
    NxRrset,

    /// The closest known ancestor delegates to these name servers.
    Delegation(Rrset),

    /// The name is an alias.
    Cname(Rrset),

    /// An ancestor of the name aliases its whole subtree.
    Dname(Rrset),

    /// The requested data.
    ///
    /// For ANY queries, this contains all known sets for the name.
    Successful(Vec<Rrset>),
}

impl Lookup {
    /// Returns whether this is a positive answer.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        matches!(*self, Lookup::Successful(_))
    }

    /// Returns whether this is a negative answer.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        matches!(*self, Lookup::NxDomain | Lookup::NxRrset)
    }

    /// Returns the answer record sets for a successful lookup.
    #[must_use]
    pub fn answers(&self) -> Option<&[Rrset]> {
        match *self {
            Lookup::Successful(ref rrsets) => Some(rrsets),
            _ => None,
        }
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Class;
    use crate::base::question::Question;
    use crate::base::record::Soa;
    use crate::utils::clock::FakeClock;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn a(owner: &str, ttl: u32, addr: [u8; 4]) -> Record {
        Record::new(name(owner), Class::IN, ttl, RecordData::A(addr.into()))
    }

    fn ns(owner: &str, ttl: u32, target: &str) -> Record {
        Record::new(name(owner), Class::IN, ttl, RecordData::Ns(name(target)))
    }

    fn cname(owner: &str, target: &str) -> Record {
        Record::new(name(owner), Class::IN, 300, RecordData::Cname(name(target)))
    }

    fn soa(owner: &str, ttl: u32, minimum: u32) -> Record {
        Record::new(
            name(owner),
            Class::IN,
            ttl,
            RecordData::Soa(Soa {
                mname: name("ns.example.com."),
                rname: name("hostmaster.example.com."),
                serial: 2024010101,
                refresh: 7200,
                retry: 3600,
                expire: 1209600,
                minimum,
            }),
        )
    }

    fn response(qname: &str, qtype: Rtype, aa: bool) -> Message {
        let query =
            Message::query(Question::new_in(name(qname), qtype), 17, true);
        let mut res = Message::answer_for(&query);
        res.header_mut().set_aa(aa);
        res
    }

    fn cache() -> (Cache<FakeClock>, FakeClock) {
        let clock = FakeClock::new();
        (Cache::new_with_time(clock.clone()), clock)
    }

    fn addrs(lookup: &Lookup) -> Vec<Ipv4Addr> {
        lookup
            .answers()
            .unwrap()
            .iter()
            .flat_map(|rrset| rrset.data().iter())
            .filter_map(|data| match *data {
                RecordData::A(addr) => Some(addr),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn message_answer_expires() {
        let (cache, clock) = cache();
        let mut msg = response("www.example.com.", Rtype::A, false);
        msg.push(Section::Answer, a("www.example.com.", 300, [93, 184, 216, 34]));
        assert!(cache.add_message(&msg).is_successful());

        let res = cache.lookup(&name("www.example.com."), Rtype::A, Credibility::NORMAL);
        assert_eq!(addrs(&res), [Ipv4Addr::new(93, 184, 216, 34)]);

        clock.adjust_time(Duration::from_secs(301));
        assert_eq!(
            cache.lookup(&name("www.example.com."), Rtype::A, Credibility::NORMAL),
            Lookup::Unknown
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn negative_expires() {
        let (cache, clock) = cache();
        let nx = name("nx.example.com.");
        cache.add_negative(
            &nx,
            Rtype::A,
            Some(&soa("example.com.", 3600, 60)),
            Credibility::AuthAuthority,
        );
        assert_eq!(cache.lookup(&nx, Rtype::A, Credibility::NORMAL), Lookup::NxRrset);
        clock.adjust_time(Duration::from_secs(61));
        assert_eq!(cache.lookup(&nx, Rtype::A, Credibility::NORMAL), Lookup::Unknown);
    }

    #[test]
    fn negative_without_soa_is_not_stored() {
        let (cache, _) = cache();
        let nx = name("nx.example.com.");
        cache.add_negative(&nx, Rtype::A, None, Credibility::AuthAuthority);
        assert_eq!(cache.lookup(&nx, Rtype::A, Credibility::NORMAL), Lookup::Unknown);
    }

    #[test]
    fn ttl_capped_by_max_cache() {
        let (cache, clock) = cache();
        cache.set_max_cache(Duration::from_secs(100));
        cache.add_record(&a("www.example.com.", 300, [192, 0, 2, 1]), Credibility::AuthAnswer);
        clock.adjust_time(Duration::from_secs(99));
        let res = cache.lookup(&name("www.example.com."), Rtype::A, Credibility::NORMAL);
        assert_eq!(res.answers().unwrap()[0].ttl(), 1);
        clock.adjust_time(Duration::from_secs(1));
        assert_eq!(
            cache.lookup(&name("www.example.com."), Rtype::A, Credibility::NORMAL),
            Lookup::Unknown
        );
    }

    #[test]
    fn credibility_ordering() {
        let (cache, _) = cache();
        let www = name("www.example.com.");
        cache.add_record(&a("www.example.com.", 300, [192, 0, 2, 1]), Credibility::NonAuthAnswer);
        cache.add_record(&a("www.example.com.", 300, [192, 0, 2, 2]), Credibility::AuthAnswer);
        // Higher credibility replaces wholesale.
        assert_eq!(
            addrs(&cache.lookup(&www, Rtype::A, Credibility::NORMAL)),
            [Ipv4Addr::new(192, 0, 2, 2)]
        );

        // Lower credibility is ignored.
        cache.add_rrset(
            &Rrset::new(a("www.example.com.", 300, [192, 0, 2, 3])),
            Credibility::NonAuthAuthority,
        );
        assert_eq!(
            addrs(&cache.lookup(&www, Rtype::A, Credibility::NORMAL)),
            [Ipv4Addr::new(192, 0, 2, 2)]
        );

        // Equal credibility merges records.
        cache.add_record(&a("www.example.com.", 300, [192, 0, 2, 4]), Credibility::AuthAnswer);
        assert_eq!(
            addrs(&cache.lookup(&www, Rtype::A, Credibility::NORMAL)),
            [Ipv4Addr::new(192, 0, 2, 2), Ipv4Addr::new(192, 0, 2, 4)]
        );

        // Data below the minimum credibility isn’t returned.
        assert_eq!(
            cache.lookup(&www, Rtype::A, Credibility::AuthAuthority),
            Lookup::Unknown
        );
    }

    #[test]
    fn zero_ttl_invalidates() {
        let (cache, _) = cache();
        let www = name("www.example.com.");
        cache.add_record(&a("www.example.com.", 300, [192, 0, 2, 1]), Credibility::NonAuthAnswer);
        cache.add_rrset(
            &Rrset::new(a("www.example.com.", 0, [192, 0, 2, 2])),
            Credibility::NonAuthAdditional,
        );
        assert!(cache.lookup(&www, Rtype::A, Credibility::NORMAL).is_successful());
        cache.add_rrset(
            &Rrset::new(a("www.example.com.", 0, [192, 0, 2, 2])),
            Credibility::NonAuthAnswer,
        );
        assert_eq!(cache.lookup(&www, Rtype::A, Credibility::NORMAL), Lookup::Unknown);
    }

    #[test]
    fn negative_exclusivity() {
        let (cache, _) = cache();
        let www = name("www.example.com.");
        let soa = soa("example.com.", 3600, 600);
        let cred = Credibility::AuthAuthority;

        cache.add_negative(&www, Rtype::A, Some(&soa), cred);
        cache.add_rrset(&Rrset::new(a("www.example.com.", 300, [192, 0, 2, 1])), cred);
        assert!(cache.lookup(&www, Rtype::A, Credibility::NORMAL).is_successful());

        cache.add_negative(&www, Rtype::A, Some(&soa), cred);
        assert_eq!(cache.lookup(&www, Rtype::A, Credibility::NORMAL), Lookup::NxRrset);
    }

    #[test]
    fn lookup_precedence() {
        let (cache, _) = cache();
        let cred = Credibility::AuthAnswer;
        cache.add_record(&ns("example.com.", 3600, "ns.example.com."), cred);
        cache.add_record(&cname("www.example.com.", "web.example.com."), cred);
        cache.add_record(
            &Record::new(
                name("alias.example.com."),
                Class::IN,
                300,
                RecordData::Dname(name("example.net.")),
            ),
            cred,
        );
        cache.add_negative(
            &name("nx.example.com."),
            NXDOMAIN_TYPE,
            Some(&soa("example.com.", 3600, 600)),
            cred,
        );

        let lookup = |s: &str| cache.lookup(&name(s), Rtype::A, Credibility::NORMAL);
        assert!(matches!(lookup("www.example.com."), Lookup::Cname(_)));
        assert!(matches!(lookup("a.alias.example.com."), Lookup::Dname(_)));
        assert!(matches!(lookup("other.example.com."), Lookup::Delegation(_)));
        assert_eq!(lookup("nx.example.com."), Lookup::NxDomain);
        assert_eq!(lookup("www.example.org."), Lookup::Unknown);
        assert!(matches!(
            cache.lookup(&name("www.example.com."), Rtype::CNAME, Credibility::NORMAL),
            Lookup::Successful(_)
        ));
    }

    #[test]
    fn lookup_any() {
        let (cache, _) = cache();
        let cred = Credibility::AuthAnswer;
        cache.add_record(&a("example.com.", 300, [192, 0, 2, 1]), cred);
        cache.add_record(&ns("example.com.", 300, "ns.example.com."), cred);
        let res = cache.lookup(&name("example.com."), Rtype::ANY, Credibility::NORMAL);
        assert_eq!(res.answers().unwrap().len(), 2);
    }

    #[test]
    fn message_cname_chain() {
        let (cache, _) = cache();
        let mut msg = response("www.example.com.", Rtype::A, true);
        msg.push(Section::Answer, cname("www.example.com.", "web.example.com."));
        msg.push(Section::Answer, cname("web.example.com.", "host.example.net."));
        msg.push(Section::Answer, a("host.example.net.", 300, [192, 0, 2, 7]));
        assert!(matches!(cache.add_message(&msg), Lookup::Cname(_)));
        assert!(matches!(
            cache.lookup(&name("web.example.com."), Rtype::A, Credibility::NORMAL),
            Lookup::Cname(_)
        ));
        assert_eq!(
            addrs(&cache.lookup(&name("host.example.net."), Rtype::A, Credibility::NORMAL)),
            [Ipv4Addr::new(192, 0, 2, 7)]
        );
    }

    #[test]
    fn message_dname() {
        let (cache, _) = cache();
        let mut msg = response("www.example.com.", Rtype::A, true);
        msg.push(
            Section::Answer,
            Record::new(
                name("example.com."),
                Class::IN,
                300,
                RecordData::Dname(name("example.net.")),
            ),
        );
        msg.push(Section::Answer, cname("www.example.com.", "www.example.net."));
        msg.push(Section::Answer, a("www.example.net.", 300, [192, 0, 2, 8]));
        assert!(matches!(cache.add_message(&msg), Lookup::Dname(_)));
        assert!(cache
            .lookup(&name("www.example.net."), Rtype::A, Credibility::NORMAL)
            .is_successful());
    }

    #[test]
    fn message_dname_at_qname() {
        let (cache, _) = cache();
        let mut msg = response("alias.example.com.", Rtype::A, true);
        msg.push(
            Section::Answer,
            Record::new(
                name("alias.example.com."),
                Class::IN,
                300,
                RecordData::Dname(name("example.net.")),
            ),
        );
        msg.push(Section::Answer, a("alias.example.com.", 300, [192, 0, 2, 9]));
        let res = cache.add_message(&msg);
        assert_eq!(addrs(&res), [Ipv4Addr::new(192, 0, 2, 9)]);
        assert_eq!(
            res,
            cache.lookup(&name("alias.example.com."), Rtype::A, Credibility::NORMAL)
        );
    }

    #[test]
    fn message_with_meta_records() {
        let (cache, _) = cache();
        let mut msg = response("www.example.com.", Rtype::ANY, true);
        msg.push(
            Section::Answer,
            Record::new(
                name("www.example.com."),
                Class::IN,
                0,
                RecordData::Unknown {
                    rtype: Rtype::TSIG,
                    data: bytes::Bytes::from_static(b"\x00\x01\x02\x03"),
                },
            ),
        );
        msg.push(Section::Answer, a("www.example.com.", 300, [192, 0, 2, 10]));
        let msg = Message::from_octets(&msg.to_vec()).unwrap();
        assert_eq!(msg.section(Section::Answer)[0].rtype(), Rtype::TSIG);

        let res = cache.add_message(&msg);
        assert_eq!(res.answers().unwrap().len(), 1);
        assert_eq!(addrs(&res), [Ipv4Addr::new(192, 0, 2, 10)]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn message_referral() {
        let (cache, _) = cache();
        let mut msg = response("www.example.com.", Rtype::A, false);
        msg.push(Section::Authority, ns("example.com.", 3600, "ns1.example.com."));
        msg.push(Section::Additional, a("ns1.example.com.", 3600, [192, 0, 2, 53]));
        msg.push(Section::Additional, a("unrelated.example.com.", 3600, [192, 0, 2, 54]));
        match cache.add_message(&msg) {
            Lookup::Delegation(rrset) => assert_eq!(*rrset.owner(), name("example.com.")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(cache
            .lookup(&name("ns1.example.com."), Rtype::A, Credibility::NonAuthAdditional)
            .is_successful());
        assert!(!cache
            .lookup(&name("unrelated.example.com."), Rtype::A, Credibility::NonAuthAdditional)
            .is_successful());
    }

    #[test]
    fn message_negative() {
        let (cache, _) = cache();
        let mut msg = response("nx.example.com.", Rtype::A, true);
        msg.header_mut().set_rcode(Rcode::NXDOMAIN);
        msg.push(Section::Authority, soa("example.com.", 3600, 300));
        assert_eq!(cache.add_message(&msg), Lookup::NxDomain);
        assert_eq!(
            cache.lookup(&name("nx.example.com."), Rtype::AAAA, Credibility::NORMAL),
            Lookup::NxDomain
        );

        let mut msg = response("www.example.com.", Rtype::AAAA, true);
        msg.push(Section::Authority, soa("example.com.", 3600, 300));
        assert_eq!(cache.add_message(&msg), Lookup::NxRrset);

        let mut msg = response("www.example.com.", Rtype::A, true);
        msg.header_mut().set_rcode(Rcode::SERVFAIL);
        assert_eq!(cache.add_message(&msg), Lookup::Unknown);
    }

    #[test]
    fn lru_eviction() {
        let (cache, _) = cache();
        cache.set_max_entries(2);
        let cred = Credibility::AuthAnswer;
        cache.add_record(&a("a.example.", 300, [192, 0, 2, 1]), cred);
        cache.add_record(&a("b.example.", 300, [192, 0, 2, 2]), cred);
        assert!(cache.lookup(&name("a.example."), Rtype::A, cred).is_successful());
        cache.add_record(&a("c.example.", 300, [192, 0, 2, 3]), cred);
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&name("a.example."), Rtype::A, cred).is_successful());
        assert_eq!(cache.lookup(&name("b.example."), Rtype::A, cred), Lookup::Unknown);

        cache.set_max_entries(1);
        assert_eq!(cache.len(), 2);
        cache.lookup(&name("c.example."), Rtype::A, cred);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn flush() {
        let (cache, _) = cache();
        let cred = Credibility::AuthAnswer;
        cache.add_record(&a("example.com.", 300, [192, 0, 2, 1]), cred);
        cache.add_record(&ns("example.com.", 300, "ns.example.com."), cred);
        cache.flush_set(&name("example.com."), Rtype::A);
        assert!(matches!(
            cache.lookup(&name("example.com."), Rtype::A, cred),
            Lookup::Delegation(_)
        ));
        cache.flush_name(&name("example.com."));
        assert!(cache.is_empty());
    }

    #[test]
    fn shared_between_threads() {
        let (cache, _) = cache();
        let cache = std::sync::Arc::new(cache);
        let workers: Vec<_> = (0..4u8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..50u8 {
                        let owner = format!("host{}.example.com.", j);
                        cache.add_record(
                            &a(&owner, 300, [192, 0, i, j]),
                            Credibility::AuthAnswer,
                        );
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
        for j in 0..50u8 {
            let owner = name(&format!("host{}.example.com.", j));
            let res = cache.lookup(&owner, Rtype::A, Credibility::NORMAL);
            assert_eq!(addrs(&res).len(), 4);
        }
    }

    #[test]
    #[should_panic]
    fn relative_lookup() {
        let (cache, _) = cache();
        cache.lookup(&name("www.example"), Rtype::A, Credibility::NORMAL);
    }
}
