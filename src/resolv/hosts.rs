//! Static host table
//!
//! The host table is consulted before any query is sent. It is normally
//! read from the system’s `/etc/hosts`.

use crate::base::name::{Name, NameError};
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::net::{self, IpAddr};
use std::path::Path;
use std::str::FromStr;
use std::vec::Vec;
use std::{error, fmt, fs};

//------------ Hosts --------------------------------------------------------

/// A table of static host to address mappings.
///
/// All names are kept as absolute names. A name may map to any number of
/// addresses, each address maps back to the canonical name it was first
/// listed with.
#[derive(Clone, Debug, Default)]
pub struct Hosts {
    forward: HashMap<Name, Vec<IpAddr>>,
    reverse: HashMap<IpAddr, Name>,
}

/// # Creation and Manipulation
///
impl Hosts {
    /// Creates a new, empty host table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default hosts table for this system.
    ///
    /// This currently only works for Unix-y systems. Elsewhere, or if the
    /// file can’t be read, the table is empty.
    #[must_use]
    pub fn system_default() -> Self {
        let mut res = Hosts::new();
        if let Err(err) = res.parse_file("/etc/hosts") {
            tracing::debug!("cannot read /etc/hosts: {}", err);
        }
        res
    }

    /// Adds a host to IP mapping.
    ///
    /// Relative names are taken relative to the root.
    pub fn add_forward(&mut self, name: Name, addr: IpAddr) {
        let addrs = self.forward.entry(absolute(name)).or_default();
        if !addrs.contains(&addr) {
            addrs.push(addr)
        }
    }

    /// Adds an IP to host mapping.
    ///
    /// Existing mappings for the address are kept.
    pub fn add_reverse(&mut self, addr: IpAddr, name: Name) {
        self.reverse.entry(addr).or_insert_with(|| absolute(name));
    }

    /// Returns whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// # Lookups
///
impl Hosts {
    /// Looks up the addresses of a host.
    ///
    /// The addresses are returned in the order they were added.
    #[must_use]
    pub fn lookup_host(&self, name: &Name) -> Option<&[IpAddr]> {
        self.forward.get(name).map(Vec::as_slice)
    }

    /// Looks up the hostname of an address.
    #[must_use]
    pub fn lookup_addr(&self, addr: IpAddr) -> Option<&Name> {
        self.reverse.get(&addr)
    }
}

/// # Parsing Hosts File
///
impl Hosts {
    /// Adds the hosts listed in a file.
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let mut file = fs::File::open(path)?;
        self.parse(&mut file)
    }

    /// Reads hosts from a reader and adds them.
    ///
    /// The format is that of the /etc/hosts file. Lines that can’t be
    /// parsed are skipped.
    pub fn parse<R: io::Read>(&mut self, reader: &mut R) -> Result<(), Error> {
        for line in io::BufReader::new(reader).lines() {
            let line = line?;
            if let Err(err) = self.parse_line(&line) {
                tracing::debug!("skipping hosts line {:?}: {}", line, err);
            }
        }
        Ok(())
    }

    /// Parses a single line.
    fn parse_line(&mut self, line: &str) -> Result<(), Error> {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let mut words = line.split_whitespace();
        let addr = match words.next() {
            Some(addr) => IpAddr::from_str(addr)?,
            None => return Ok(()),
        };

        let cname = words.next().ok_or(Error::ParseError)?;
        let cname = Name::from_str(cname)?;
        self.add_forward(cname.clone(), addr);
        self.add_reverse(addr, cname);

        for name in words {
            self.add_forward(Name::from_str(name)?, addr);
        }
        Ok(())
    }
}

/// Makes a name absolute by appending the root if necessary.
fn absolute(name: Name) -> Name {
    if name.is_absolute() {
        name
    } else {
        Name::concatenate(&name, &Name::root()).unwrap_or(name)
    }
}

//------------ Error ---------------------------------------------------------

/// An error happened while reading a hosts file.
#[derive(Debug)]
pub enum Error {
    /// A line was malformed.
    ParseError,

    /// Something happend while reading.
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

impl From<NameError> for Error {
    fn from(_: NameError) -> Error {
        Error::ParseError
    }
}

impl From<net::AddrParseError> for Error {
    fn from(_: net::AddrParseError) -> Error {
        Error::ParseError
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::ParseError => f.write_str("error parsing hosts file"),
            Error::Io(ref err) => fmt::Display::fmt(err, f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::ParseError => None,
            Error::Io(ref err) => Some(err),
        }
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn parse_hosts() {
        let mut hosts = Hosts::new();
        let data = "127.0.0.1 localhost # loopback\n\
                    ::1       localhost ip6-localhost\n\
                    \n\
                    # 192.0.2.9 commented.example\n\
                    192.0.2.1 host.example.com. host alias\n\
                    not-an-address foo\n\
                    192.0.2.2\n";
        hosts.parse(&mut Cursor::new(data)).unwrap();

        assert_eq!(
            hosts.lookup_host(&name("localhost.")).unwrap(),
            &["127.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse().unwrap()]
        );
        assert_eq!(
            hosts.lookup_host(&name("ALIAS.")).unwrap(),
            &["192.0.2.1".parse::<IpAddr>().unwrap()]
        );
        assert!(hosts.lookup_host(&name("commented.example.")).is_none());
        assert!(hosts.lookup_host(&name("foo.")).is_none());
        assert_eq!(
            hosts.lookup_addr("192.0.2.1".parse().unwrap()),
            Some(&name("host.example.com."))
        );
        assert_eq!(
            hosts.lookup_addr("::1".parse().unwrap()),
            Some(&name("localhost."))
        );
    }
}
