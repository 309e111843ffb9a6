//! A single question in a DNS message.
//!
//! This module defines the type [`Question`] which represents an entry in
//! the question section of a DNS message.

use super::iana::{Class, Rtype};
use super::name::{Compressor, Name};
use super::wire::ParseError;
use bytes::BytesMut;
use core::fmt;
use octseq::parse::Parser;

//------------ Question ------------------------------------------------------

/// A question in a DNS message.
///
/// In DNS, a question describes what is requested in a query. It consists
/// of three elements: a domain name, a record type, and a class. This type
/// is such a question.
///
/// Two questions are equal if their names are equal ignoring ASCII case
/// and their types and classes are identical.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    /// The domain name of the question.
    qname: Name,

    /// The record type of the question.
    qtype: Rtype,

    /// The class of the quesiton.
    qclass: Class,
}

/// # Creation and Conversion
///
impl Question {
    /// Creates a new question from its three components.
    #[must_use]
    pub fn new(qname: Name, qtype: Rtype, qclass: Class) -> Self {
        Question {
            qname,
            qtype,
            qclass,
        }
    }

    /// Creates a new question from a name and record type, assuming class IN.
    #[must_use]
    pub fn new_in(qname: Name, qtype: Rtype) -> Self {
        Question::new(qname, qtype, Class::IN)
    }
}

/// # Field Access
///
impl Question {
    /// Returns a reference to the domain name in the question.
    #[must_use]
    pub fn qname(&self) -> &Name {
        &self.qname
    }

    /// Returns the record type of the question.
    #[must_use]
    pub fn qtype(&self) -> Rtype {
        self.qtype
    }

    /// Returns the class of the question.
    #[must_use]
    pub fn qclass(&self) -> Class {
        self.qclass
    }
}

/// # Parsing and Composing
///
impl Question {
    /// Takes a question from the beginning of a parser.
    pub fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        Ok(Question::new(
            Name::from_wire(parser)?,
            Rtype::parse(parser)?,
            Class::parse(parser)?,
        ))
    }

    /// Appends the question to a message being composed.
    pub fn compose(&self, target: &mut BytesMut, compressor: &mut Compressor) {
        self.qname.to_wire(target, Some(compressor), false);
        self.qtype.compose(target);
        self.qclass.compose(target);
    }
}

//--- Display

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.qname, self.qclass, self.qtype)
    }
}
