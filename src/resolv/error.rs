//! Error types for resolution.

use crate::base::iana::Rcode;
use crate::base::name::NameError;
use crate::base::wire::ParseError;
use std::string::String;
use std::sync::Arc;
use std::{error, fmt, io};

//------------ Error ---------------------------------------------------------

/// An error happened while resolving a name.
///
/// The variants fall into two groups. Some errors only concern the server
/// that was asked. The query is then tried with the next server. All other
/// errors end the resolution of the question. See
/// [`is_retryable`][Self::is_retryable].
#[derive(Clone, Debug)]
pub enum Error {
    /// A message could not be decoded.
    MalformedWire(ParseError),

    /// No response arrived in time.
    Timeout,

    /// Sending the query failed.
    Transport(Arc<io::Error>),

    /// The server answered with a response code other than NOERROR or
    /// NXDOMAIN.
    ServerFailure(Rcode),

    /// The security hook rejected the response.
    Rejected,

    /// The name does not exist.
    NxDomain,

    /// The name exists but there are no records of the requested type.
    NoMatchingRecord,

    /// The query budget was used up.
    QueryBudgetExhausted,

    /// None of the names derived from the search list could be resolved.
    ///
    /// Contains the error of the last name tried.
    SearchDomainsExhausted(Box<Error>),

    /// The name is not a valid domain name.
    Name(NameError),

    /// A response arrived for a query that isn’t outstanding.
    UnknownQueryId,

    /// There are no servers to send queries to.
    NoServers,

    /// All query IDs for a server are in use.
    TooManyOutstanding,

    /// The resolution was cancelled.
    Cancelled,
}

impl Error {
    /// Returns whether the query should be tried with the next server.
    ///
    /// Timeouts, transport errors, failure responses and rejected responses
    /// are specific to the server. All other errors are final for the
    /// question.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            *self,
            Error::Timeout
                | Error::Transport(_)
                | Error::ServerFailure(_)
                | Error::Rejected
        )
    }
}

//--- From

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(Arc::new(err))
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::MalformedWire(err)
    }
}

impl From<NameError> for Error {
    fn from(err: NameError) -> Self {
        Error::Name(err)
    }
}

//--- Display and Error

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MalformedWire(ref err) => {
                write!(f, "malformed message: {}", err)
            }
            Error::Timeout => f.write_str("query timed out"),
            Error::Transport(ref err) => write!(f, "transport error: {}", err),
            Error::ServerFailure(rcode) => {
                write!(f, "server responded with {}", rcode)
            }
            Error::Rejected => f.write_str("response rejected"),
            Error::NxDomain => f.write_str("domain name does not exist"),
            Error::NoMatchingRecord => {
                f.write_str("no matching record type found")
            }
            Error::QueryBudgetExhausted => f.write_str("query budget exhausted"),
            Error::SearchDomainsExhausted(ref err) => {
                write!(f, "search domain query failed: {}", err)
            }
            Error::Name(ref err) => write!(f, "invalid name: {}", err),
            Error::UnknownQueryId => f.write_str("unknown query ID"),
            Error::NoServers => f.write_str("no servers available"),
            Error::TooManyOutstanding => {
                f.write_str("too many outstanding queries")
            }
            Error::Cancelled => f.write_str("resolution cancelled"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::MalformedWire(ref err) => Some(err),
            Error::Transport(ref err) => Some(err.as_ref()),
            Error::SearchDomainsExhausted(ref err) => Some(err.as_ref()),
            Error::Name(ref err) => Some(err),
            _ => None,
        }
    }
}

//------------ ResolveError --------------------------------------------------

/// A resolution failed.
///
/// This wraps the [`Error`] that ended the resolution together with the
/// host name that was to be resolved and the number of queries issued.
#[derive(Clone, Debug)]
pub struct ResolveError {
    hostname: String,
    attempts: u32,
    budget: u32,
    error: Error,
}

impl ResolveError {
    pub(crate) fn new(
        hostname: impl Into<String>,
        attempts: u32,
        budget: u32,
        error: Error,
    ) -> Self {
        ResolveError {
            hostname: hostname.into(),
            attempts,
            budget,
            error,
        }
    }

    /// Returns the host name that was to be resolved.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the number of queries issued.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the query budget of the resolution.
    #[must_use]
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Returns the error that ended the resolution.
    #[must_use]
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Converts the value into the error that ended the resolution.
    #[must_use]
    pub fn into_error(self) -> Error {
        self.error
    }
}

//--- Display and Error

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "failed to resolve '{}' after {} of {} queries: {}",
            self.hostname, self.attempts, self.budget, self.error
        )
    }
}

impl error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn retryable() {
        assert!(Error::Timeout.is_retryable());
        assert!(Error::from(io::Error::from(io::ErrorKind::ConnectionRefused))
            .is_retryable());
        assert!(Error::ServerFailure(Rcode::SERVFAIL).is_retryable());
        assert!(!Error::NxDomain.is_retryable());
        assert!(!Error::MalformedWire(ParseError::ShortInput).is_retryable());
        assert!(!Error::QueryBudgetExhausted.is_retryable());
    }

    #[test]
    fn display() {
        let err = ResolveError::new(
            "www",
            3,
            8,
            Error::SearchDomainsExhausted(Box::new(Error::NxDomain)),
        );
        assert_eq!(
            err.to_string(),
            "failed to resolve 'www' after 3 of 8 queries: \
             search domain query failed: domain name does not exist"
        );
        assert!(error::Error::source(&err).is_some());
    }
}
