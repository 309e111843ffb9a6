//! Basics.
//!
//! This module provides the fundamental types for working with DNS data:
//! domain names, the IANA-assigned parameters, and a message codec covering
//! the record types needed for resolving host names.
//!
//! In order to easily distinguish the process of creating and disecting
//! wire-format messages from other forms of representation conversion, we
//! use the term *parsing* for extracting data from a wire-format
//! representation and *composing* for producing such a representation.
//!
//! Both parsing and composing happen on buffers holding a complete DNS
//! message. This is necessary since domain names may be compressed by
//! referencing other parts of the message.
//!
//! The module contains these submodules:
//!
//! * [header] for the header of DNS messages,
//! * [iana] for IANA-assigned parameters such as record types,
//! * [message] for complete messages,
//! * [name] for domain names,
//! * [question] for questions,
//! * [record] for DNS resource records including record data, and
//! * [wire] for the error types of parsing.

pub use self::header::Header;
pub use self::iana::{Class, Rcode, Rtype};
pub use self::message::{Message, Section};
pub use self::name::{Name, NameError};
pub use self::question::Question;
pub use self::record::{Record, RecordData, Rrset, Soa};
pub use self::wire::ParseError;

pub mod header;
pub mod iana;
pub mod message;
pub mod name;
pub mod question;
pub mod record;
pub mod wire;
