//! Uncompressed domain names.
//!
//! This is a private module. Its public types are re-exported by the parent.

use super::super::wire::{FormError, ParseError};
use super::compress::Compressor;
use bytes::{BufMut, Bytes, BytesMut};
use core::str::FromStr;
use core::{cmp, fmt, hash};
use octseq::parse::Parser;
use smallvec::SmallVec;

//------------ Name ----------------------------------------------------------

/// An uncompressed domain name.
///
/// The type keeps the labels of the name in wire-format encoding, i.e.,
/// each label prefixed by its length, without the final root label. Whether
/// the name is absolute, i.e., whether it is to be understood as ending in
/// the root label, is kept as a separate flag. The root name is the empty
/// absolute name. The empty relative name is displayed as `@`.
///
/// Names are immutable and cheap to clone since the octets are kept in a
/// reference counted [`Bytes`] value.
///
/// Comparison and hashing ignore ASCII case. Ordering follows the canonical
/// DNS ordering defined in [RFC 4034], i.e., names are compared label by
/// label starting at the root.
///
/// Only absolute names can appear in messages. Trying to encode a relative
/// name is a programming error and will panic.
///
/// [RFC 4034]: https://tools.ietf.org/html/rfc4034#section-6.1
#[derive(Clone)]
pub struct Name {
    /// The labels in wire format without the root label.
    octets: Bytes,

    /// Whether the name ends in the root label.
    absolute: bool,
}

impl Name {
    /// Domain names have a maximum length of 255 octets.
    pub const MAX_LEN: usize = 255;

    /// A name can have at most 128 labels, including the root label.
    pub const MAX_LABELS: usize = 128;

    /// A label can be at most 63 octets long.
    pub const MAX_LABEL_LEN: usize = 63;
}

/// # Creating Values
///
impl Name {
    /// Returns the root name.
    #[must_use]
    pub fn root() -> Self {
        Name {
            octets: Bytes::new(),
            absolute: true,
        }
    }

    /// Returns the empty relative name.
    #[must_use]
    pub fn empty() -> Self {
        Name {
            octets: Bytes::new(),
            absolute: false,
        }
    }

    /// Creates a name from a sequence of labels.
    ///
    /// The labels must not contain the root label. Whether the name is
    /// absolute is given via `absolute`.
    pub fn from_labels<'a, I>(
        labels: I,
        absolute: bool,
    ) -> Result<Self, NameError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut builder = NameBuilder::default();
        for label in labels {
            builder.push(label)?;
        }
        Ok(builder.finish(absolute))
    }

    /// Parses a name from its presentation format.
    ///
    /// A name ending in an unescaped dot is absolute. Otherwise, the name is
    /// relative and, if `origin` is given, appended to `origin`. The single
    /// character `@` denotes the origin itself or the empty name if there is
    /// no origin.
    ///
    /// Labels may contain escaped characters, either as `\c` for the
    /// character `c` or `\DDD` for the octet with the decimal value `DDD`.
    pub fn parse(s: &str, origin: Option<&Name>) -> Result<Self, NameError> {
        if s == "@" {
            return Ok(origin.cloned().unwrap_or_else(Name::empty));
        }
        if s == "." {
            return Ok(Name::root());
        }
        if s.is_empty() {
            return Err(NameError::EmptyLabel);
        }

        let mut builder = NameBuilder::default();
        let mut label = SmallVec::<[u8; 64]>::new();
        let mut absolute = false;
        let mut chars = s.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    builder.push(&label)?;
                    label.clear();
                    if chars.peek().is_none() {
                        absolute = true;
                    }
                }
                '\\' => {
                    let first = chars.next().ok_or(NameError::BadEscape)?;
                    if let Some(first) = first.to_digit(10) {
                        let second = chars
                            .next()
                            .and_then(|ch| ch.to_digit(10))
                            .ok_or(NameError::BadEscape)?;
                        let third = chars
                            .next()
                            .and_then(|ch| ch.to_digit(10))
                            .ok_or(NameError::BadEscape)?;
                        let value = first * 100 + second * 10 + third;
                        let value = u8::try_from(value)
                            .map_err(|_| NameError::BadEscape)?;
                        label.push(value);
                    } else {
                        let mut buf = [0u8; 4];
                        label.extend_from_slice(
                            first.encode_utf8(&mut buf).as_bytes(),
                        );
                    }
                }
                ch => {
                    let mut buf = [0u8; 4];
                    label.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
            if label.len() > Name::MAX_LABEL_LEN {
                return Err(NameError::LongLabel);
            }
        }
        if !absolute {
            builder.push(&label)?;
        }
        let name = builder.finish(absolute);
        match origin {
            Some(origin) if !absolute => Name::concatenate(&name, origin),
            _ => Ok(name),
        }
    }

    /// Takes a possibly compressed name from the beginning of a parser.
    ///
    /// The parser must range over the complete message so that compression
    /// pointers can be followed. Pointers must point strictly backwards
    /// which also rules out pointer loops.
    pub fn from_wire(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        let mut octets = BytesMut::new();

        // Phase One: No compression pointers have been found yet.
        let mut ptr = loop {
            match LabelType::parse(parser)? {
                LabelType::Normal(0) => {
                    return Ok(Name {
                        octets: octets.freeze(),
                        absolute: true,
                    });
                }
                LabelType::Normal(len) => {
                    Self::take_label(parser, len, &mut octets)?;
                }
                LabelType::Compressed(ptr) => break ptr,
            }
        };

        // Phase Two: Compression has occured.
        //
        // We continue on a copy of the parser since the original one has
        // reached the end of the name already.
        let mut parser = *parser;
        loop {
            if ptr + 2 >= parser.pos() {
                return Err(FormError::new("invalid compression pointer").into());
            }
            parser.seek(ptr)?;
            loop {
                match LabelType::parse(&mut parser)? {
                    LabelType::Normal(0) => {
                        return Ok(Name {
                            octets: octets.freeze(),
                            absolute: true,
                        });
                    }
                    LabelType::Normal(len) => {
                        Self::take_label(&mut parser, len, &mut octets)?;
                    }
                    LabelType::Compressed(new_ptr) => {
                        ptr = new_ptr;
                        break;
                    }
                }
            }
        }
    }

    /// Appends a label of `len` octets from `parser` to `octets`.
    fn take_label(
        parser: &mut Parser<'_, [u8]>,
        len: usize,
        octets: &mut BytesMut,
    ) -> Result<(), ParseError> {
        // One more for the root label.
        if octets.len() + len + 2 > Name::MAX_LEN {
            return Err(FormError::new("long domain name").into());
        }
        octets.put_u8(len as u8);
        octets.put_slice(parser.peek(len)?);
        parser.advance(len)?;
        Ok(())
    }
}

/// # Properties
///
impl Name {
    /// Returns whether the name is absolute.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Returns whether this is the root name.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.absolute && self.octets.is_empty()
    }

    /// Returns the length of the name in uncompressed wire format.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.octets.len() + usize::from(self.absolute)
    }

    /// Returns the number of labels, including the root label.
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.iter_labels().count() + usize::from(self.absolute)
    }

    /// Returns an iterator over the labels without the root label.
    pub fn iter_labels(&self) -> LabelIter<'_> {
        LabelIter {
            octets: self.octets.as_ref(),
        }
    }

    /// Returns the parent of the name.
    ///
    /// Returns `None` for the root and the empty name.
    #[must_use]
    pub fn parent(&self) -> Option<Name> {
        let first = *self.octets.first()? as usize;
        Some(Name {
            octets: self.octets.slice(first + 1..),
            absolute: self.absolute,
        })
    }

    /// Returns an iterator over the name and all its parents.
    ///
    /// For an absolute name, the last item is the root.
    pub fn iter_suffixes(&self) -> SuffixIter {
        SuffixIter {
            name: Some(self.clone()),
        }
    }

    /// Returns whether `self` is equal to or below `other`.
    #[must_use]
    pub fn is_subdomain_of(&self, other: &Name) -> bool {
        if self.absolute != other.absolute
            || self.octets.len() < other.octets.len()
        {
            return false;
        }
        let start = self.octets.len() - other.octets.len();
        self.is_label_start(start)
            && self.octets[start..].eq_ignore_ascii_case(&other.octets)
    }

    /// Returns whether `index` is the start of a label.
    fn is_label_start(&self, index: usize) -> bool {
        let mut pos = 0;
        while pos < index {
            pos += self.octets[pos] as usize + 1;
        }
        pos == index
    }
}

/// # Deriving Names
///
impl Name {
    /// Returns `self` relative to `origin`.
    ///
    /// If `self` isn’t a subdomain of `origin`, returns `self` unchanged.
    #[must_use]
    pub fn relativize(&self, origin: &Name) -> Name {
        if !self.is_subdomain_of(origin) {
            return self.clone();
        }
        Name {
            octets: self.octets.slice(..self.octets.len() - origin.octets.len()),
            absolute: false,
        }
    }

    /// Appends `suffix` to `prefix`.
    ///
    /// If `prefix` is absolute, it is returned unchanged. Fails if the
    /// resulting name is longer than 255 octets or has more than 128
    /// labels.
    pub fn concatenate(prefix: &Name, suffix: &Name) -> Result<Name, NameError> {
        if prefix.absolute {
            return Ok(prefix.clone());
        }
        let len = prefix.octets.len() + suffix.octets.len();
        if len + 1 > Name::MAX_LEN {
            return Err(NameError::LongName);
        }
        let labels = prefix.iter_labels().count() + suffix.iter_labels().count();
        if labels + 1 > Name::MAX_LABELS {
            return Err(NameError::LongName);
        }
        let mut octets = BytesMut::with_capacity(len);
        octets.put_slice(&prefix.octets);
        octets.put_slice(&suffix.octets);
        Ok(Name {
            octets: octets.freeze(),
            absolute: suffix.absolute,
        })
    }

    /// Rewrites `self` according to a DNAME record.
    ///
    /// The DNAME record with owner `owner` and target `target` aliases all
    /// names strictly below `owner`. If `self` is such a name, the part of
    /// `self` matching `owner` is replaced by `target`. Returns `Ok(None)`
    /// if `self` isn’t covered by the DNAME.
    pub fn from_dname(
        &self,
        owner: &Name,
        target: &Name,
    ) -> Result<Option<Name>, NameError> {
        if !self.is_subdomain_of(owner) || self == owner {
            return Ok(None);
        }
        Name::concatenate(&self.relativize(owner), target).map(Some)
    }
}

/// # Wire Format
///
impl Name {
    /// Appends the name in wire format to `target`.
    ///
    /// If `compressor` is given, the name is compressed against names
    /// written into the same message earlier and its suffixes are recorded
    /// for later names. The target must then contain the message from its
    /// very beginning. If `canonical` is true, all labels are written in
    /// lower case and compression is not used.
    ///
    /// # Panics
    ///
    /// The method panics if the name is relative.
    pub fn to_wire(
        &self,
        target: &mut BytesMut,
        compressor: Option<&mut Compressor>,
        canonical: bool,
    ) {
        assert!(self.absolute, "relative name {} in wire format", self);
        let compressor = match compressor {
            Some(compressor) if !canonical => compressor,
            _ => {
                for label in self.iter_labels() {
                    target.put_u8(label.len() as u8);
                    if canonical {
                        target.extend(label.iter().map(u8::to_ascii_lowercase));
                    } else {
                        target.put_slice(label);
                    }
                }
                target.put_u8(0);
                return;
            }
        };

        let mut suffix = Some(self.clone());
        while let Some(name) = suffix {
            if name.is_root() {
                break;
            }
            if let Some(pos) = compressor.get(&name) {
                target.put_u16(0xC000 | pos);
                return;
            }
            compressor.insert(name.clone(), target.len());
            let len = name.octets[0] as usize;
            target.put_slice(&name.octets[..len + 1]);
            suffix = name.parent();
        }
        target.put_u8(0);
    }

    /// Appends the uncompressed name in wire format to `target`.
    pub fn compose(&self, target: &mut BytesMut) {
        self.to_wire(target, None, false)
    }
}

//--- FromStr

impl FromStr for Name {
    type Err = NameError;

    /// Parses a name without an origin.
    ///
    /// The name is only absolute if it ends in a dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::parse(s, None)
    }
}

//--- PartialEq, Eq, and Hash

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
            && self.octets.eq_ignore_ascii_case(&other.octets)
    }
}

impl Eq for Name {}

impl hash::Hash for Name {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
        for ch in self.octets.iter() {
            ch.to_ascii_lowercase().hash(state)
        }
    }
}

//--- PartialOrd and Ord

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    /// Orders names canonically.
    ///
    /// Relative names sort before absolute names. Otherwise the labels are
    /// compared from the root on with each label compared as a lowercase
    /// octet sequence.
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        match self.absolute.cmp(&other.absolute) {
            cmp::Ordering::Equal => {}
            res => return res,
        }
        let left: SmallVec<[&[u8]; 16]> = self.iter_labels().collect();
        let right: SmallVec<[&[u8]; 16]> = other.iter_labels().collect();
        for (left, right) in left.iter().rev().zip(right.iter().rev()) {
            let res = left
                .iter()
                .map(u8::to_ascii_lowercase)
                .cmp(right.iter().map(u8::to_ascii_lowercase));
            if res != cmp::Ordering::Equal {
                return res;
            }
        }
        left.len().cmp(&right.len())
    }
}

//--- Display and Debug

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.octets.is_empty() {
            return f.write_str(if self.absolute { "." } else { "@" });
        }
        let mut first = true;
        for label in self.iter_labels() {
            if first {
                first = false;
            } else {
                f.write_str(".")?;
            }
            for &ch in label {
                match ch {
                    b'.' | b'\\' | b'"' | b'(' | b')' | b';' | b'@' | b'$' => {
                        write!(f, "\\{}", ch as char)?
                    }
                    0x21..=0x7E => write!(f, "{}", ch as char)?,
                    _ => write!(f, "\\{:03}", ch)?,
                }
            }
        }
        if self.absolute {
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

//--- Serialize and Deserialize

#[cfg(feature = "serde")]
impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let s = <std::string::String as serde::Deserialize>::deserialize(
            deserializer,
        )?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//------------ NameBuilder ---------------------------------------------------

/// Assembles a name label by label, checking the length limits.
#[derive(Default)]
struct NameBuilder {
    octets: BytesMut,
    labels: usize,
}

impl NameBuilder {
    fn push(&mut self, label: &[u8]) -> Result<(), NameError> {
        if label.is_empty() {
            return Err(NameError::EmptyLabel);
        }
        if label.len() > Name::MAX_LABEL_LEN {
            return Err(NameError::LongLabel);
        }
        // Leave room for the root label.
        if self.octets.len() + label.len() + 2 > Name::MAX_LEN
            || self.labels + 2 > Name::MAX_LABELS
        {
            return Err(NameError::LongName);
        }
        self.octets.put_u8(label.len() as u8);
        self.octets.put_slice(label);
        self.labels += 1;
        Ok(())
    }

    fn finish(self, absolute: bool) -> Name {
        Name {
            octets: self.octets.freeze(),
            absolute,
        }
    }
}

//------------ LabelType -----------------------------------------------------

/// The type of a label as found in wire format.
enum LabelType {
    /// A normal label with the given length.
    Normal(usize),

    /// A compression pointer to the given position.
    Compressed(usize),
}

impl LabelType {
    fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        let first = parser.parse_u8()?;
        match first & 0xC0 {
            0x00 => Ok(LabelType::Normal(first as usize)),
            0xC0 => {
                let second = parser.parse_u8()?;
                Ok(LabelType::Compressed(
                    (usize::from(first & 0x3F) << 8) | usize::from(second),
                ))
            }
            _ => Err(FormError::new("invalid label type").into()),
        }
    }
}

//------------ LabelIter -----------------------------------------------------

/// An iterator over the non-root labels of a name.
#[derive(Clone, Debug)]
pub struct LabelIter<'a> {
    octets: &'a [u8],
}

impl<'a> Iterator for LabelIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.octets.split_first()?;
        let (label, rest) = rest.split_at(len as usize);
        self.octets = rest;
        Some(label)
    }
}

//------------ SuffixIter ----------------------------------------------------

/// An iterator over a name and its parents.
#[derive(Clone, Debug)]
pub struct SuffixIter {
    name: Option<Name>,
}

impl Iterator for SuffixIter {
    type Item = Name;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.name.take()?;
        self.name = name.parent();
        Some(name)
    }
}

//------------ NameError -----------------------------------------------------

/// A domain name could not be created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameError {
    /// A label other than the root label was empty.
    EmptyLabel,

    /// A label was longer than 63 octets.
    LongLabel,

    /// The name was longer than 255 octets or had more than 128 labels.
    LongName,

    /// An escape sequence was malformed.
    BadEscape,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            NameError::EmptyLabel => "empty label",
            NameError::LongLabel => "label too long",
            NameError::LongName => "name too long",
            NameError::BadEscape => "invalid escape sequence",
        })
    }
}

impl std::error::Error for NameError {}

//============ Testing =======================================================
