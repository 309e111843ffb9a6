//! The result of looking up host names.

use crate::base::name::Name;
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::slice;
use std::vec::Vec;

//------------ FoundHosts ----------------------------------------------------

/// The result of a host name lookup.
///
/// Since the lookup may determine that the host name is in fact an alias
/// for another name, the value also contains the canonical name. The
/// addresses are grouped by address family in the order of the configured
/// preference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FoundHosts {
    canonical: Name,
    addrs: Vec<IpAddr>,
}

impl FoundHosts {
    pub(crate) fn new(canonical: Name, addrs: Vec<IpAddr>) -> Self {
        FoundHosts { canonical, addrs }
    }

    /// Returns whether no addresses were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Returns the number of addresses found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    /// Returns a reference to the canonical name for the host.
    #[must_use]
    pub fn canonical_name(&self) -> &Name {
        &self.canonical
    }

    /// Returns an iterator over the IP addresses returned by the lookup.
    #[must_use]
    pub fn iter(&self) -> FoundHostsIter {
        FoundHostsIter(self.addrs.iter())
    }

    /// Returns an iterator over socket addresses gained from the lookup.
    ///
    /// The socket addresses are gained by combining the IP addresses with
    /// `port`. The returned iterator implements `ToSocketAddrs` and thus
    /// can be used where `std::net` wants addresses right away.
    #[must_use]
    pub fn port_iter(&self, port: u16) -> FoundHostsSocketIter {
        FoundHostsSocketIter(self.addrs.iter(), port)
    }
}

impl<'a> IntoIterator for &'a FoundHosts {
    type Item = IpAddr;
    type IntoIter = FoundHostsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//------------ FoundHostsIter ------------------------------------------------

/// An iterator over the IP addresses returned by a host lookup.
#[derive(Clone, Debug)]
pub struct FoundHostsIter<'a>(slice::Iter<'a, IpAddr>);

impl<'a> Iterator for FoundHostsIter<'a> {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        self.0.next().copied()
    }
}

//------------ FoundHostsSocketIter ------------------------------------------

/// An iterator over socket addresses derived from a host lookup.
#[derive(Clone, Debug)]
pub struct FoundHostsSocketIter<'a>(slice::Iter<'a, IpAddr>, u16);

impl<'a> Iterator for FoundHostsSocketIter<'a> {
    type Item = SocketAddr;

    fn next(&mut self) -> Option<SocketAddr> {
        self.0.next().map(|addr| SocketAddr::new(*addr, self.1))
    }
}

impl<'a> ToSocketAddrs for FoundHostsSocketIter<'a> {
    type Iter = Self;

    fn to_socket_addrs(&self) -> io::Result<Self> {
        Ok(self.clone())
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn iterators() {
        let found = FoundHosts::new(
            "www.example.com.".parse().unwrap(),
            vec!["192.0.2.1".parse().unwrap(), "2001:db8::1".parse().unwrap()],
        );
        assert_eq!(found.len(), 2);
        assert_eq!(found.iter().count(), 2);
        assert_eq!(
            found.port_iter(443).to_socket_addrs().unwrap().next(),
            Some(SocketAddr::from(([192, 0, 2, 1], 443)))
        );
        assert_eq!(
            (&found).into_iter().last(),
            Some("2001:db8::1".parse::<IpAddr>().unwrap())
        );
    }
}
