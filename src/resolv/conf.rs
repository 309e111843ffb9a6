//! Resolver configuration
//!
//! The configuration is modeled along the lines of glibc’s resolver and is
//! normally read from the system’s `/etc/resolv.conf`. In addition to the
//! options glibc knows, it contains a limit on the number of queries a
//! single resolution may issue and a preference for address families.

use crate::base::iana::Rtype;
use crate::base::name::{Name, NameError};
use crate::utils::config::DefMinMax;
use std::io::{self, BufRead, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::{self, FromStr, SplitWhitespace};
use std::time::Duration;
use std::vec::Vec;
use std::{error, fmt, fs};

//------------ Module Configuration ------------------------------------------

/// The port name servers listen on unless configured otherwise.
const DEFAULT_PORT: u16 = 53;

/// Number of dots before an initial absolute query is made.
const NDOTS: DefMinMax<usize> = DefMinMax::new(1, 0, 15);

/// Timeout to wait for a single response.
const TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(5),
    Duration::from_millis(1),
    Duration::from_secs(60),
);

/// How many times the list of servers is tried.
const ATTEMPTS: DefMinMax<usize> = DefMinMax::new(2, 1, 5);

/// Maximum number of queries a single resolution may issue.
const QUERY_BUDGET: DefMinMax<u32> = DefMinMax::new(8, 1, 64);

//------------ ResolvConf ----------------------------------------------------

/// Resolver configuration.
///
/// This type collects all information necessary to configure how a
/// resolver talks to the DNS: the name servers to query, the search list
/// for relative names, and a number of options.
///
/// You can create a new, empty configuration via [`new`][Self::new] and
/// then either fill it in directly or parse a `resolv.conf` file into it
/// via [`parse`][Self::parse] or [`parse_file`][Self::parse_file].
/// Finally, [`finalize`][Self::finalize] makes sure the configuration is
/// usable.
///
/// The easiest way to get the system’s configuration, however, is
/// [`system_default`][Self::system_default]. It parses the configuration
/// file and falls back to a default configuration if that fails.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "kebab-case")
)]
pub struct ResolvConf {
    /// Addresses of the servers to query.
    servers: Vec<SocketAddr>,

    /// Search list for host-name lookup.
    search: Vec<Name>,

    /// Number of dots before an initial absolute query is made.
    ndots: usize,

    /// Timeout to wait for a single response.
    timeout: Duration,

    /// Number of times the list of servers is tried.
    attempts: usize,

    /// Whether to rotate through the servers for each query.
    rotate: bool,

    /// Maximum number of queries issued for a single resolution.
    query_budget: u32,

    /// Which address families to look up and in what order.
    addr_preference: AddrPreference,

    /// The port to use for servers learned from delegations.
    port: u16,
}

/// # Management
///
impl ResolvConf {
    /// Creates a new, empty configuration.
    ///
    /// Using an empty configuration will fail since it does not contain
    /// any name servers. Call [`finalize`][Self::finalize] to make it
    /// usable.
    #[must_use]
    pub fn new() -> Self {
        ResolvConf {
            servers: Vec::new(),
            search: Vec::new(),
            ndots: NDOTS.default(),
            timeout: TIMEOUT.default(),
            attempts: ATTEMPTS.default(),
            rotate: false,
            query_budget: QUERY_BUDGET.default(),
            addr_preference: AddrPreference::default(),
            port: DEFAULT_PORT,
        }
    }

    /// Finalizes the configuration for actual use.
    ///
    /// The function does two things. If `servers` is empty, it adds
    /// `127.0.0.1:53`. This is exactly what glibc does. If the search list
    /// is empty, it adds the root domain `"."`. This differs from what
    /// glibc does which considers the machine’s host name.
    pub fn finalize(&mut self) {
        if self.servers.is_empty() {
            self.servers.push(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                DEFAULT_PORT,
            ));
        }
        if self.search.is_empty() {
            self.search.push(Name::root())
        }
    }

    /// Creates a default configuration for this system.
    ///
    /// This currently only works for Unix-y systems. Elsewhere, it returns
    /// the finalized empty configuration.
    #[must_use]
    pub fn system_default() -> Self {
        let mut res = ResolvConf::new();
        if let Err(err) = res.parse_file("/etc/resolv.conf") {
            tracing::debug!("cannot read /etc/resolv.conf: {}", err);
        }
        res.finalize();
        res
    }
}

/// # Access to Settings
///
impl ResolvConf {
    /// Returns the addresses of the configured servers.
    #[must_use]
    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    /// Adds a server to the end of the server list.
    pub fn add_server(&mut self, addr: SocketAddr) {
        self.servers.push(addr)
    }

    /// Returns the search list.
    #[must_use]
    pub fn search(&self) -> &[Name] {
        &self.search
    }

    /// Adds a name to the end of the search list.
    ///
    /// Relative names are made absolute by appending the root.
    pub fn push_search(&mut self, name: Name) {
        if name.is_absolute() {
            self.search.push(name)
        } else if let Ok(name) = Name::concatenate(&name, &Name::root()) {
            self.search.push(name)
        }
    }

    /// Returns the number of dots before a name is first tried as is.
    #[must_use]
    pub fn ndots(&self) -> usize {
        self.ndots
    }

    /// Sets the number of dots before a name is first tried as is.
    ///
    /// The default is 1, the maximum 15.
    pub fn set_ndots(&mut self, value: usize) {
        self.ndots = NDOTS.limit_logged("ndots", value)
    }

    /// Returns the time to wait for a response to a single query.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the time to wait for a response to a single query.
    ///
    /// The default is five seconds. The value is kept between one
    /// millisecond and one minute.
    pub fn set_timeout(&mut self, value: Duration) {
        self.timeout = TIMEOUT.limit_logged("timeout", value)
    }

    /// Returns how many times the server list is tried.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Sets how many times the server list is tried.
    ///
    /// The default is 2, allowed values are 1 to 5.
    pub fn set_attempts(&mut self, value: usize) {
        self.attempts = ATTEMPTS.limit_logged("attempts", value)
    }

    /// Returns whether queries rotate through the server list.
    #[must_use]
    pub fn rotate(&self) -> bool {
        self.rotate
    }

    /// Sets whether queries rotate through the server list.
    ///
    /// If set, each resolution starts with the server after the one the
    /// previous resolution started with.
    pub fn set_rotate(&mut self, value: bool) {
        self.rotate = value
    }

    /// Returns the maximum number of queries for a single resolution.
    #[must_use]
    pub fn query_budget(&self) -> u32 {
        self.query_budget
    }

    /// Sets the maximum number of queries for a single resolution.
    ///
    /// The budget is shared by all names tried from the search list, all
    /// redirects, and all alias chases. The default is 8, allowed values
    /// are 1 to 64.
    pub fn set_query_budget(&mut self, value: u32) {
        self.query_budget = QUERY_BUDGET.limit_logged("budget", value)
    }

    /// Returns the address family preference.
    #[must_use]
    pub fn addr_preference(&self) -> AddrPreference {
        self.addr_preference
    }

    /// Sets the address family preference.
    pub fn set_addr_preference(&mut self, value: AddrPreference) {
        self.addr_preference = value
    }

    /// Returns the port used for servers learned from delegations.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Sets the port used for servers learned from delegations.
    ///
    /// The default is 53.
    pub fn set_port(&mut self, value: u16) {
        self.port = value
    }
}

/// # Parsing Configuration File
///
impl ResolvConf {
    /// Parses the configuration from a file.
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let mut file = fs::File::open(path)?;
        self.parse(&mut file)
    }

    /// Parses the configuration from a reader.
    ///
    /// The format is that of the /etc/resolv.conf file.
    pub fn parse<R: Read>(&mut self, reader: &mut R) -> Result<(), Error> {
        for line in io::BufReader::new(reader).lines() {
            let line = line?;
            let line = line.trim_end();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#')
            {
                continue;
            }

            let mut words = line.split_whitespace();
            let keyword = words.next();
            match keyword {
                Some("nameserver") => self.parse_nameserver(words)?,
                Some("domain") => self.parse_domain(words)?,
                Some("search") => self.parse_search(words)?,
                Some("sortlist") => {}
                Some("options") => self.parse_options(words)?,
                _ => return Err(Error::ParseError),
            }
        }
        Ok(())
    }

    fn parse_nameserver(&mut self, mut words: SplitWhitespace) -> Result<(), Error> {
        let word = next_word(&mut words)?;
        let addr = match IpAddr::from_str(word) {
            Ok(addr) => SocketAddr::new(addr, DEFAULT_PORT),
            Err(_) => SocketAddr::from_str(word).map_err(|_| Error::ParseError)?,
        };
        self.servers.push(addr);
        no_more_words(words)
    }

    fn parse_domain(&mut self, mut words: SplitWhitespace) -> Result<(), Error> {
        let domain = Name::from_str(next_word(&mut words)?)?;
        self.search.clear();
        self.push_search(domain);
        no_more_words(words)
    }

    fn parse_search(&mut self, words: SplitWhitespace) -> Result<(), Error> {
        self.search.clear();
        for word in words {
            self.push_search(Name::from_str(word)?);
        }
        Ok(())
    }

    fn parse_options(&mut self, words: SplitWhitespace) -> Result<(), Error> {
        for word in words {
            match split_arg(word)? {
                ("ndots", Some(n)) => self.set_ndots(n),
                ("timeout", Some(n)) => {
                    self.set_timeout(Duration::from_secs(n as u64))
                }
                ("attempts", Some(n)) => self.set_attempts(n),
                ("rotate", None) => self.set_rotate(true),
                ("budget", Some(n)) => {
                    self.set_query_budget(u32::try_from(n).unwrap_or(u32::MAX))
                }
                ("inet6", None) => {
                    self.set_addr_preference(AddrPreference::Ipv6Preferred)
                }
                // Ignore unknown or misformated options.
                _ => {}
            }
        }
        Ok(())
    }
}

//--- Default

impl Default for ResolvConf {
    fn default() -> Self {
        Self::new()
    }
}

//--- Display

impl fmt::Display for ResolvConf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for server in &self.servers {
            if server.port() == DEFAULT_PORT {
                writeln!(f, "nameserver {}", server.ip())?;
            } else {
                writeln!(f, "nameserver {}", server)?;
            }
        }
        match self.search.as_slice() {
            [] => {}
            [domain] => writeln!(f, "domain {}", domain)?,
            search => {
                f.write_str("search")?;
                for name in search {
                    write!(f, " {}", name)?;
                }
                f.write_str("\n")?;
            }
        }

        // Collect options so we only print them if there are any non-default
        // ones.
        let mut options = Vec::new();
        if self.ndots != NDOTS.default() {
            options.push(format!("ndots:{}", self.ndots));
        }
        if self.timeout != TIMEOUT.default() {
            // This ignores fractional seconds.
            options.push(format!("timeout:{}", self.timeout.as_secs()));
        }
        if self.attempts != ATTEMPTS.default() {
            options.push(format!("attempts:{}", self.attempts));
        }
        if self.rotate {
            options.push("rotate".into());
        }
        if self.query_budget != QUERY_BUDGET.default() {
            options.push(format!("budget:{}", self.query_budget));
        }
        if self.addr_preference == AddrPreference::Ipv6Preferred {
            options.push("inet6".into());
        }
        if !options.is_empty() {
            f.write_str("options")?;
            for option in options {
                write!(f, " {}", option)?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

//------------ AddrPreference ------------------------------------------------

/// Which address families are looked up and in what order.
///
/// The order determines both the order in which addresses are returned
/// and which family a resolution may finish early on.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum AddrPreference {
    /// Only look up IPv4 addresses.
    Ipv4Only,

    /// Only look up IPv6 addresses.
    Ipv6Only,

    /// Look up both, IPv4 addresses first.
    #[default]
    Ipv4Preferred,

    /// Look up both, IPv6 addresses first.
    Ipv6Preferred,
}

impl AddrPreference {
    /// Returns the record types to query in order of preference.
    #[must_use]
    pub fn rtypes(self) -> &'static [Rtype] {
        match self {
            AddrPreference::Ipv4Only => &[Rtype::A],
            AddrPreference::Ipv6Only => &[Rtype::AAAA],
            AddrPreference::Ipv4Preferred => &[Rtype::A, Rtype::AAAA],
            AddrPreference::Ipv6Preferred => &[Rtype::AAAA, Rtype::A],
        }
    }

    /// Returns the record type of the preferred family.
    #[must_use]
    pub fn preferred(self) -> Rtype {
        self.rtypes()[0]
    }
}

//------------ Private Helpers -----------------------------------------------
//
// These are here to wrap stuff into Results.

/// Returns a reference to the next word or an error.
fn next_word<'a>(words: &'a mut str::SplitWhitespace) -> Result<&'a str, Error> {
    words.next().ok_or(Error::ParseError)
}

/// Returns nothing but errors out if there are words left.
fn no_more_words(mut words: str::SplitWhitespace) -> Result<(), Error> {
    match words.next() {
        Some(..) => Err(Error::ParseError),
        None => Ok(()),
    }
}

/// Splits the name and argument from an option with arguments.
///
/// These options consist of a name followed by a colon followed by a
/// value, which so far is only `usize`, so we do that.
fn split_arg(s: &str) -> Result<(&str, Option<usize>), Error> {
    match s.find(':') {
        Some(idx) => {
            let (left, right) = s.split_at(idx);
            Ok((left, Some(right[1..].parse()?)))
        }
        None => Ok((s, None)),
    }
}

//------------ Error --------------------------------------------------------

/// The error that can happen when parsing `resolv.conf`.
#[derive(Debug)]
pub enum Error {
    /// The file is not a proper file.
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

impl From<std::num::ParseIntError> for Error {
    fn from(_: std::num::ParseIntError) -> Error {
        Error::ParseError
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::ParseError => f.write_str("error parsing configuration"),
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

//============ Testing ======================================================
