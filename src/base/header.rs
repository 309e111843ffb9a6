//! The header of a DNS message.
//!
//! Each DNS message starts with a twelve octet long header section
//! containing some general information related to the message as well as
//! the number of records in each of the four sections that follow the header.
//! Its content and format are defined in section 4.1.1 of [RFC 1035].
//!
//! The [`Header`] type only covers the first four octets. The section counts
//! are derived from the message content when it is composed.
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035

use super::iana::Rcode;
use super::wire::ParseError;
use bytes::{BufMut, BytesMut};
use octseq::parse::Parser;

//------------ Header --------------------------------------------------

/// The first part of the header of a DNS message.
///
/// This type represents the information contained in the first four octets
/// of the header: the message ID, opcode, rcode, and the various flags. It
/// keeps those four octets in wire representation, i.e., in network byte
/// order. The data is layed out like this:
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA|Z |AD|CD|   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Header {
    /// The actual header in its wire format representation.
    ///
    /// This means that the ID field is in big endian.
    inner: [u8; 4],
}

/// # Creation and Conversion
///
impl Header {
    /// Creates a new header.
    ///
    /// The new header has all fields as either zero or false. Thus, the
    /// opcode will be a standard query and the response code will be
    /// [`Rcode::NOERROR`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a header from the beginning of a parser.
    pub fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        let mut res = Self::default();
        parser.parse_buf(&mut res.inner)?;
        Ok(res)
    }

    /// Appends the header to `target`.
    pub fn compose(&self, target: &mut BytesMut) {
        target.put_slice(&self.inner)
    }
}

/// # Field Access
///
impl Header {
    /// Returns the value of the ID field.
    #[must_use]
    pub fn id(self) -> u16 {
        u16::from_be_bytes([self.inner[0], self.inner[1]])
    }

    /// Sets the value of the ID field.
    pub fn set_id(&mut self, value: u16) {
        self.inner[..2].copy_from_slice(&value.to_be_bytes())
    }

    /// Returns whether the QR bit is set.
    ///
    /// The bit marks a message as a response.
    #[must_use]
    pub fn qr(self) -> bool {
        self.get_bit(2, 7)
    }

    /// Sets the value of the QR bit.
    pub fn set_qr(&mut self, set: bool) {
        self.set_bit(2, 7, set)
    }

    /// Returns the value of the Opcode field.
    ///
    /// Standard queries have the opcode 0.
    #[must_use]
    pub fn opcode(self) -> u8 {
        (self.inner[2] >> 3) & 0x0F
    }

    /// Sets the value of the opcode field.
    pub fn set_opcode(&mut self, opcode: u8) {
        self.inner[2] = self.inner[2] & 0x87 | ((opcode & 0x0F) << 3);
    }

    /// Returns whether the AA bit is set.
    ///
    /// The *authoritative answer* bit is set by a server that is
    /// authoritative for the zone of the question.
    #[must_use]
    pub fn aa(self) -> bool {
        self.get_bit(2, 2)
    }

    /// Sets the value of the AA bit.
    pub fn set_aa(&mut self, set: bool) {
        self.set_bit(2, 2, set)
    }

    /// Returns whether the TC bit is set.
    #[must_use]
    pub fn tc(self) -> bool {
        self.get_bit(2, 1)
    }

    /// Sets the value of the TC bit.
    pub fn set_tc(&mut self, set: bool) {
        self.set_bit(2, 1, set)
    }

    /// Returns whether the RD bit is set.
    #[must_use]
    pub fn rd(self) -> bool {
        self.get_bit(2, 0)
    }

    /// Sets the value of the RD bit.
    pub fn set_rd(&mut self, set: bool) {
        self.set_bit(2, 0, set)
    }

    /// Returns whether the RA bit is set.
    #[must_use]
    pub fn ra(self) -> bool {
        self.get_bit(3, 7)
    }

    /// Sets the value of the RA bit.
    pub fn set_ra(&mut self, set: bool) {
        self.set_bit(3, 7, set)
    }

    /// Returns the value of the RCODE field.
    #[must_use]
    pub fn rcode(self) -> Rcode {
        Rcode::from_header_bits(self.inner[3])
    }

    /// Sets the value of the RCODE field.
    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.inner[3] = self.inner[3] & 0xF0 | (rcode.to_int() & 0x0F);
    }

    //--- Internal helpers

    /// Returns the value of the bit at the given position.
    ///
    /// The argument `offset` gives the byte offset of the underlying bytes
    /// slice and `bit` gives the number of the bit with the most significant
    /// bit being 7.
    fn get_bit(self, offset: usize, bit: usize) -> bool {
        self.inner[offset] & (1 << bit) != 0
    }

    /// Sets or resets the given bit.
    fn set_bit(&mut self, offset: usize, bit: usize, set: bool) {
        if set {
            self.inner[offset] |= 1 << bit
        } else {
            self.inner[offset] &= !(1 << bit)
        }
    }
}

//============ Testing ======================================================

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! test_field {
        ($get:ident, $set:ident, $default:expr, $($value:expr),*) => {
            $({
                let mut h = Header::new();
                assert_eq!(h.$get(), $default);
                h.$set($value);
                assert_eq!(h.$get(), $value);
            })*
        }
    }

    #[test]
    fn header() {
        test_field!(id, set_id, 0, 0x1234, 0xFFFF);
        test_field!(qr, set_qr, false, true);
        test_field!(opcode, set_opcode, 0, 2, 15);
        test_field!(aa, set_aa, false, true);
        test_field!(tc, set_tc, false, true);
        test_field!(rd, set_rd, false, true);
        test_field!(ra, set_ra, false, true);
        test_field!(rcode, set_rcode, Rcode::NOERROR, Rcode::NXDOMAIN);
    }

    #[test]
    fn wire() {
        let mut h = Header::new();
        h.set_id(0xbeef);
        h.set_qr(true);
        h.set_rd(true);
        h.set_rcode(Rcode::SERVFAIL);
        let mut buf = BytesMut::new();
        h.compose(&mut buf);
        assert_eq!(buf.as_ref(), b"\xbe\xef\x81\x02");
        let mut parser = Parser::from_ref(&buf[..]);
        assert_eq!(Header::parse(&mut parser).unwrap(), h);
    }
}
