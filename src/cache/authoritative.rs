//! A cache of delegations.

use super::{Cache, Config, Credibility, Lookup};
use crate::base::iana::Rtype;
use crate::base::name::Name;
use crate::base::record::{RecordData, Rrset};
use crate::utils::clock::{Clock, SystemClock};
use std::net::SocketAddr;
use std::vec::Vec;
use tracing::debug;

//------------ AuthoritativeServerCache --------------------------------------

/// A cache for the name servers of zones learned from referrals.
///
/// The cache keeps the NS record sets of delegated zones as hints and the
/// addresses of the name servers as glue. It never keeps data for the root
/// zone. The servers for the root are always the configured ones.
#[derive(Debug)]
pub struct AuthoritativeServerCache<C: Clock = SystemClock> {
    cache: Cache<C>,
}

impl AuthoritativeServerCache {
    #[must_use]
    pub fn new() -> Self {
        AuthoritativeServerCache { cache: Cache::new() }
    }
}

impl Default for AuthoritativeServerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> AuthoritativeServerCache<C> {
    /// Creates a new cache with the given configuration and clock.
    #[must_use]
    pub fn with_time_config(config: Config, clock: C) -> Self {
        AuthoritativeServerCache {
            cache: Cache::with_time_config(config, clock),
        }
    }

    /// Adds a delegation.
    ///
    /// The NS record set `ns` is stored as a hint. Of the address record
    /// sets in `glue`, only those for the name servers listed in `ns` are
    /// kept. Returns whether the delegation was stored. This is not the
    /// case for delegations of the root zone.
    pub fn add_delegation(&self, ns: &Rrset, glue: &[Rrset]) -> bool {
        if ns.owner().is_root() {
            debug!("not caching delegation for the root zone");
            return false;
        }
        assert_eq!(ns.rtype(), Rtype::NS, "delegation without NS records");
        self.cache.add_rrset(ns, Credibility::Hint);
        for rrset in glue {
            if !rrset.rtype().is_address() {
                continue;
            }
            let listed = ns
                .data()
                .iter()
                .filter_map(RecordData::additional_name)
                .any(|target| target == rrset.owner());
            if listed {
                self.cache.add_rrset(rrset, Credibility::Glue);
            }
        }
        true
    }

    /// Returns the servers of the closest enclosing zone of `name`.
    ///
    /// Walks the ancestors of `name` from the top-level domain inward and
    /// returns the deepest zone for which server addresses are known
    /// together with these addresses using `port`. The root zone is never
    /// served.
    pub fn servers_for(
        &self,
        name: &Name,
        port: u16,
    ) -> Option<(Name, Vec<SocketAddr>)> {
        let mut zones: Vec<Name> =
            name.iter_suffixes().filter(|zone| !zone.is_root()).collect();
        zones.reverse();
        let mut res = None;
        for zone in zones {
            let addrs = self.zone_servers(&zone, port);
            if !addrs.is_empty() {
                res = Some((zone, addrs))
            }
        }
        res
    }

    /// Returns the known server addresses for exactly `zone`.
    fn zone_servers(&self, zone: &Name, port: u16) -> Vec<SocketAddr> {
        let ns = match self.cache.lookup(zone, Rtype::NS, Credibility::Hint) {
            Lookup::Successful(rrsets) => rrsets,
            _ => return Vec::new(),
        };
        let mut res = Vec::new();
        for target in ns
            .iter()
            .flat_map(|rrset| rrset.data())
            .filter_map(RecordData::additional_name)
        {
            for rtype in [Rtype::A, Rtype::AAAA] {
                if let Lookup::Successful(rrsets) =
                    self.cache.lookup(target, rtype, Credibility::Glue)
                {
                    res.extend(
                        rrsets
                            .iter()
                            .flat_map(|rrset| rrset.data())
                            .filter_map(RecordData::addr)
                            .map(|addr| SocketAddr::new(addr, port)),
                    );
                }
            }
        }
        res
    }

    /// Removes all data.
    pub fn clear(&self) {
        self.cache.clear()
    }

    /// Returns whether no delegations are known.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Class;
    use crate::base::record::Record;
    use crate::utils::clock::FakeClock;
    use std::time::Duration;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn ns(owner: &str, target: &str) -> Rrset {
        Rrset::new(Record::new(
            name(owner),
            Class::IN,
            3600,
            RecordData::Ns(name(target)),
        ))
    }

    fn glue(owner: &str, addr: [u8; 4]) -> Rrset {
        Rrset::new(Record::new(
            name(owner),
            Class::IN,
            3600,
            RecordData::A(addr.into()),
        ))
    }

    #[test]
    fn deepest_zone_wins() {
        let clock = FakeClock::new();
        let cache =
            AuthoritativeServerCache::with_time_config(Config::new(), clock.clone());
        assert!(cache.add_delegation(
            &ns("com.", "a.gtld.net."),
            &[glue("a.gtld.net.", [192, 0, 2, 1])]
        ));
        assert!(cache.add_delegation(
            &ns("example.com.", "ns.example.com."),
            &[
                glue("ns.example.com.", [192, 0, 2, 53]),
                glue("evil.example.org.", [192, 0, 2, 66]),
            ]
        ));

        let (zone, addrs) =
            cache.servers_for(&name("www.example.com."), 53).unwrap();
        assert_eq!(zone, name("example.com."));
        assert_eq!(addrs, vec![SocketAddr::from(([192, 0, 2, 53], 53))]);

        let (zone, _) = cache.servers_for(&name("www.other.com."), 53).unwrap();
        assert_eq!(zone, name("com."));
        assert!(cache.servers_for(&name("www.example.org."), 53).is_none());

        clock.adjust_time(Duration::from_secs(3600));
        assert!(cache.servers_for(&name("www.example.com."), 53).is_none());
    }

    #[test]
    fn no_root_and_no_glue() {
        let cache = AuthoritativeServerCache::new();
        assert!(!cache.add_delegation(
            &ns(".", "a.root-servers.net."),
            &[glue("a.root-servers.net.", [198, 41, 0, 4])]
        ));
        assert!(cache.is_empty());

        assert!(cache.add_delegation(&ns("example.com.", "ns.example.net."), &[]));
        assert!(cache.servers_for(&name("www.example.com."), 53).is_none());
    }
}
