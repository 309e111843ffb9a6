//! Resource records.
//!
//! This module defines [`Record`], a single resource record, its data
//! [`RecordData`], and [`Rrset`], a set of records sharing owner, type, and
//! class.
//!
//! Only the record types needed for resolving addresses are understood.
//! Data of all other types is kept as raw octets.

use super::iana::{Class, Rtype};
use super::name::{Compressor, Name};
use super::wire::{compose_len_prefixed, FormError, ParseError};
use bytes::{BufMut, Bytes, BytesMut};
use core::fmt;
use octseq::parse::Parser;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::vec::Vec;

//------------ Record --------------------------------------------------------

/// A DNS resource record.
///
/// A record has a three part key of a domain name called the *owner*, the
/// record type, and class. The record type is determined by the record
/// data. In addition, each record carries a time to live (TTL) in seconds
/// that says how long it may be cached.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Record {
    owner: Name,
    class: Class,
    ttl: u32,
    data: RecordData,
}

impl Record {
    /// Creates a new record from its parts.
    ///
    /// # Panics
    ///
    /// The function panics if `owner` is a relative name.
    #[must_use]
    pub fn new(owner: Name, class: Class, ttl: u32, data: RecordData) -> Self {
        assert!(owner.is_absolute(), "relative record owner {owner}");
        Record {
            owner,
            class,
            ttl,
            data,
        }
    }

    /// Returns a reference to the owner domain name.
    #[must_use]
    pub fn owner(&self) -> &Name {
        &self.owner
    }

    /// Returns the record type.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        self.data.rtype()
    }

    /// Returns the record class.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the record’s time-to-live in seconds.
    #[must_use]
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Sets the record’s time-to-live.
    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl
    }

    /// Return a reference to the record data.
    #[must_use]
    pub fn data(&self) -> &RecordData {
        &self.data
    }

    /// Converts the record into its record data.
    #[must_use]
    pub fn into_data(self) -> RecordData {
        self.data
    }
}

/// # Parsing and Composing
///
impl Record {
    /// Takes a record from the beginning of a parser.
    ///
    /// The parser must range over the complete message since the record
    /// data may contain compressed names.
    pub fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        let owner = Name::from_wire(parser)?;
        let rtype = Rtype::parse(parser)?;
        let class = Class::parse(parser)?;
        let ttl = parser.parse_u32_be()?;
        let rdlen = usize::from(parser.parse_u16_be()?);
        if parser.remaining() < rdlen {
            return Err(ParseError::ShortInput);
        }
        let start = parser.pos();
        let data = RecordData::parse(rtype, parser, rdlen)?;
        if parser.pos() - start != rdlen {
            return Err(FormError::new("trailing data in record").into());
        }
        Ok(Record {
            owner,
            class,
            ttl,
            data,
        })
    }

    /// Appends the record to a message being composed.
    pub fn compose(&self, target: &mut BytesMut, compressor: &mut Compressor) {
        self.owner.to_wire(target, Some(compressor), false);
        self.rtype().compose(target);
        self.class.compose(target);
        target.put_u32(self.ttl);
        compose_len_prefixed(target, |target| {
            self.data.compose(target, compressor)
        });
    }
}

//--- Display

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.owner,
            self.ttl,
            self.class,
            self.rtype(),
            self.data
        )
    }
}

//------------ RecordData ----------------------------------------------------

/// The data of a resource record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RecordData {
    /// An IPv4 host address.
    A(Ipv4Addr),

    /// An IPv6 host address.
    Aaaa(Ipv6Addr),

    /// An authoritative name server.
    Ns(Name),

    /// The canonical name for an alias.
    Cname(Name),

    /// The target of a subtree alias.
    Dname(Name),

    /// A domain name pointer.
    Ptr(Name),

    /// A mail exchange.
    Mx {
        preference: u16,
        exchange: Name,
    },

    /// The start of a zone of authority.
    Soa(Soa),

    /// Record data of any other type kept in its raw form.
    Unknown { rtype: Rtype, data: Bytes },
}

impl RecordData {
    /// Returns the record type of the data.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        match *self {
            RecordData::A(_) => Rtype::A,
            RecordData::Aaaa(_) => Rtype::AAAA,
            RecordData::Ns(_) => Rtype::NS,
            RecordData::Cname(_) => Rtype::CNAME,
            RecordData::Dname(_) => Rtype::DNAME,
            RecordData::Ptr(_) => Rtype::PTR,
            RecordData::Mx { .. } => Rtype::MX,
            RecordData::Soa(_) => Rtype::SOA,
            RecordData::Unknown { rtype, .. } => rtype,
        }
    }

    /// Returns the address for A and AAAA data.
    #[must_use]
    pub fn addr(&self) -> Option<IpAddr> {
        match *self {
            RecordData::A(addr) => Some(addr.into()),
            RecordData::Aaaa(addr) => Some(addr.into()),
            _ => None,
        }
    }

    /// Returns the target name of CNAME and DNAME data.
    #[must_use]
    pub fn alias_target(&self) -> Option<&Name> {
        match *self {
            RecordData::Cname(ref name) | RecordData::Dname(ref name) => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Returns the name whose addresses may accompany this data.
    ///
    /// These are the names for which address records in the additional
    /// section of a response are considered useful.
    #[must_use]
    pub fn additional_name(&self) -> Option<&Name> {
        match *self {
            RecordData::Ns(ref name) => Some(name),
            RecordData::Mx { ref exchange, .. } => Some(exchange),
            _ => None,
        }
    }

    /// Parses record data of the given type and length.
    pub fn parse(
        rtype: Rtype,
        parser: &mut Parser<'_, [u8]>,
        rdlen: usize,
    ) -> Result<Self, ParseError> {
        let res = match rtype {
            Rtype::A => {
                let mut buf = [0u8; 4];
                parser.parse_buf(&mut buf)?;
                RecordData::A(buf.into())
            }
            Rtype::AAAA => {
                let mut buf = [0u8; 16];
                parser.parse_buf(&mut buf)?;
                RecordData::Aaaa(buf.into())
            }
            Rtype::NS => RecordData::Ns(Name::from_wire(parser)?),
            Rtype::CNAME => RecordData::Cname(Name::from_wire(parser)?),
            Rtype::DNAME => RecordData::Dname(Name::from_wire(parser)?),
            Rtype::PTR => RecordData::Ptr(Name::from_wire(parser)?),
            Rtype::MX => RecordData::Mx {
                preference: parser.parse_u16_be()?,
                exchange: Name::from_wire(parser)?,
            },
            Rtype::SOA => RecordData::Soa(Soa::parse(parser)?),
            _ => {
                let data = Bytes::copy_from_slice(parser.peek(rdlen)?);
                parser.advance(rdlen)?;
                RecordData::Unknown { rtype, data }
            }
        };
        Ok(res)
    }

    /// Appends the wire format of the data without the length prefix.
    ///
    /// Names in DNAME data are never compressed.
    pub fn compose(&self, target: &mut BytesMut, compressor: &mut Compressor) {
        match *self {
            RecordData::A(addr) => target.put_slice(&addr.octets()),
            RecordData::Aaaa(addr) => target.put_slice(&addr.octets()),
            RecordData::Ns(ref name)
            | RecordData::Cname(ref name)
            | RecordData::Ptr(ref name) => {
                name.to_wire(target, Some(compressor), false)
            }
            RecordData::Dname(ref name) => name.compose(target),
            RecordData::Mx {
                preference,
                ref exchange,
            } => {
                target.put_u16(preference);
                exchange.to_wire(target, Some(compressor), false);
            }
            RecordData::Soa(ref soa) => soa.compose(target, compressor),
            RecordData::Unknown { ref data, .. } => target.put_slice(data),
        }
    }
}

//--- Display

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RecordData::A(addr) => fmt::Display::fmt(&addr, f),
            RecordData::Aaaa(addr) => fmt::Display::fmt(&addr, f),
            RecordData::Ns(ref name)
            | RecordData::Cname(ref name)
            | RecordData::Dname(ref name)
            | RecordData::Ptr(ref name) => fmt::Display::fmt(name, f),
            RecordData::Mx {
                preference,
                ref exchange,
            } => write!(f, "{} {}", preference, exchange),
            RecordData::Soa(ref soa) => fmt::Display::fmt(soa, f),
            RecordData::Unknown { ref data, .. } => {
                write!(f, "\\# {}", data.len())?;
                for ch in data.iter() {
                    write!(f, " {:02x}", ch)?;
                }
                Ok(())
            }
        }
    }
}

//------------ Soa -----------------------------------------------------------

/// Start of authority data.
///
/// Besides marking the top of a zone, the record is included in negative
/// responses. The smaller of its TTL and its `minimum` field determines how
/// long a negative answer may be cached.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Soa {
    fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        Ok(Soa {
            mname: Name::from_wire(parser)?,
            rname: Name::from_wire(parser)?,
            serial: parser.parse_u32_be()?,
            refresh: parser.parse_u32_be()?,
            retry: parser.parse_u32_be()?,
            expire: parser.parse_u32_be()?,
            minimum: parser.parse_u32_be()?,
        })
    }

    fn compose(&self, target: &mut BytesMut, compressor: &mut Compressor) {
        self.mname.to_wire(target, Some(compressor), false);
        self.rname.to_wire(target, Some(compressor), false);
        target.put_u32(self.serial);
        target.put_u32(self.refresh);
        target.put_u32(self.retry);
        target.put_u32(self.expire);
        target.put_u32(self.minimum);
    }
}

impl fmt::Display for Soa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname,
            self.rname,
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum
        )
    }
}

//------------ Rrset ---------------------------------------------------------

/// A set of records with the same owner, type, and class.
///
/// The records of a set share a single TTL. When records are added, the
/// TTL of the set becomes the smallest TTL seen. Duplicate data is only
/// kept once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rrset {
    owner: Name,
    rtype: Rtype,
    class: Class,
    ttl: u32,
    data: Vec<RecordData>,
}

impl Rrset {
    /// Creates a new set containing a single record.
    #[must_use]
    pub fn new(record: Record) -> Self {
        Rrset {
            rtype: record.rtype(),
            owner: record.owner,
            class: record.class,
            ttl: record.ttl,
            data: vec![record.data],
        }
    }

    /// Adds a record to the set.
    ///
    /// Returns `false` if the record doesn’t belong to the set.
    pub fn push(&mut self, record: Record) -> bool {
        if !self.belongs(&record) {
            return false;
        }
        self.ttl = self.ttl.min(record.ttl);
        if !self.data.contains(&record.data) {
            self.data.push(record.data)
        }
        true
    }

    /// Adds all records of `other` to `self`.
    ///
    /// The TTL of `self` becomes the smaller TTL of the two.
    pub fn merge(&mut self, other: &Rrset) {
        debug_assert!(
            self.owner == other.owner
                && self.rtype == other.rtype
                && self.class == other.class
        );
        self.ttl = self.ttl.min(other.ttl);
        for data in &other.data {
            if !self.data.contains(data) {
                self.data.push(data.clone())
            }
        }
    }

    /// Returns whether `record` belongs to the set.
    #[must_use]
    pub fn belongs(&self, record: &Record) -> bool {
        self.owner == record.owner
            && self.rtype == record.rtype()
            && self.class == record.class
    }

    #[must_use]
    pub fn owner(&self) -> &Name {
        &self.owner
    }

    /// Moves the set to a different owner.
    pub fn set_owner(&mut self, owner: Name) {
        self.owner = owner
    }

    #[must_use]
    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    #[must_use]
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl
    }

    /// Returns the data of all records in the set.
    #[must_use]
    pub fn data(&self) -> &[RecordData] {
        &self.data
    }

    /// Returns the data of the first record in the set.
    ///
    /// Since a set is never empty, this always succeeds.
    #[must_use]
    pub fn first(&self) -> &RecordData {
        &self.data[0]
    }

    /// Returns an iterator over the records of the set.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.data.iter().map(move |data| Record {
            owner: self.owner.clone(),
            class: self.class,
            ttl: self.ttl,
            data: data.clone(),
        })
    }
}

impl fmt::Display for Rrset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for record in self.records() {
            if first {
                first = false;
            } else {
                f.write_str("\n")?;
            }
            fmt::Display::fmt(&record, f)?;
        }
        Ok(())
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn rrset_push() {
        let owner = name("www.example.com.");
        let mut rrset = Rrset::new(Record::new(
            owner.clone(),
            Class::IN,
            300,
            RecordData::A(Ipv4Addr::new(192, 0, 2, 1)),
        ));
        assert!(rrset.push(Record::new(
            name("WWW.example.com."),
            Class::IN,
            60,
            RecordData::A(Ipv4Addr::new(192, 0, 2, 2)),
        )));
        assert!(rrset.push(Record::new(
            owner.clone(),
            Class::IN,
            600,
            RecordData::A(Ipv4Addr::new(192, 0, 2, 1)),
        )));
        assert!(!rrset.push(Record::new(
            owner,
            Class::IN,
            600,
            RecordData::Aaaa(Ipv6Addr::LOCALHOST),
        )));
        assert_eq!(rrset.ttl(), 60);
        assert_eq!(rrset.data().len(), 2);
        assert_eq!(rrset.records().count(), 2);
    }

    #[test]
    fn dname_is_not_compressed() {
        let mut buf = BytesMut::new();
        let mut compressor = Compressor::new();
        let owner = name("example.com.");
        owner.to_wire(&mut buf, Some(&mut compressor), false);
        let len = buf.len();
        RecordData::Dname(owner.clone()).compose(&mut buf, &mut compressor);
        assert_eq!(buf.len() - len, owner.wire_len());
        let len = buf.len();
        RecordData::Cname(owner).compose(&mut buf, &mut compressor);
        assert_eq!(buf.len() - len, 2);
    }

    #[test]
    fn parse_trailing_data() {
        // An A record with an rdlen of 5.
        let buf = b"\x00\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x05\xc0\x00\x02\x01\x00";
        let mut parser = Parser::from_ref(&buf[..]);
        assert!(Record::parse(&mut parser).is_err());
    }

    #[test]
    fn unknown_data() {
        let buf = b"\x00\x00\x10\x00\x01\x00\x00\x00\x3c\x00\x04\x03abc";
        let mut parser = Parser::from_ref(&buf[..]);
        let record = Record::parse(&mut parser).unwrap();
        assert_eq!(record.rtype(), Rtype::TXT);
        assert_eq!(record.ttl(), 60);
        assert_eq!(record.to_string(), ". 60 IN TXT \\# 4 03 61 62 63");
    }
}
