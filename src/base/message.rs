//! Accessing existing DNS messages.
//!
//! This module defines the [`Message`] type which holds a fully decoded DNS
//! message. A message can be parsed from its wire format via
//! [`Message::from_octets`] and composed back via [`Message::to_vec`],
//! compressing names along the way.

use super::header::Header;
use super::iana::{Rcode, Rtype};
use super::name::{Compressor, Name};
use super::question::Question;
use super::record::{Record, RecordData, Rrset};
use super::wire::{FormError, ParseError};
use bytes::{BufMut, Bytes, BytesMut};
use octseq::parse::Parser;
use std::vec::Vec;

//------------ Message -------------------------------------------------------

/// A decoded DNS message.
///
/// A message consists of a header followed by the question section and
/// three record sections: answer, authority, and additional. The section
/// counts of the header are derived from the content of the sections when
/// the message is composed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    header: Header,
    questions: Vec<Question>,
    answer: Vec<Record>,
    authority: Vec<Record>,
    additional: Vec<Record>,
}

/// # Creation and Conversion
///
impl Message {
    /// Creates a new, empty message with the given header.
    #[must_use]
    pub fn new(header: Header) -> Self {
        Message {
            header,
            ..Default::default()
        }
    }

    /// Creates a query for a single question.
    ///
    /// The message will have the given ID and the RD flag set according to
    /// `rd`.
    #[must_use]
    pub fn query(question: Question, id: u16, rd: bool) -> Self {
        let mut header = Header::new();
        header.set_id(id);
        header.set_rd(rd);
        let mut res = Message::new(header);
        res.questions.push(question);
        res
    }

    /// Creates an empty response to `query`.
    ///
    /// The response copies the ID, the RD flag, and the questions of the
    /// query and has the QR flag set.
    #[must_use]
    pub fn answer_for(query: &Message) -> Self {
        let mut header = Header::new();
        header.set_id(query.header.id());
        header.set_qr(true);
        header.set_rd(query.header.rd());
        let mut res = Message::new(header);
        res.questions = query.questions.clone();
        res
    }

    /// Decodes a message from its wire format.
    ///
    /// Compressed names are followed. Compression pointers must point
    /// backwards. Any data after the records announced by the header is
    /// ignored.
    pub fn from_octets(octets: &[u8]) -> Result<Self, ParseError> {
        let mut parser = Parser::from_ref(octets);
        let header = Header::parse(&mut parser)?;
        let qdcount = parser.parse_u16_be()?;
        let ancount = parser.parse_u16_be()?;
        let nscount = parser.parse_u16_be()?;
        let arcount = parser.parse_u16_be()?;

        let mut res = Message::new(header);
        for _ in 0..qdcount {
            res.questions.push(Question::parse(&mut parser)?);
        }
        for (section, count) in [
            (Section::Answer, ancount),
            (Section::Authority, nscount),
            (Section::Additional, arcount),
        ] {
            for _ in 0..count {
                let record = Record::parse(&mut parser)?;
                res.section_mut(section).push(record);
            }
        }
        Ok(res)
    }

    /// Encodes the message into its wire format.
    ///
    /// Names are compressed using a compressor scoped to this call.
    ///
    /// # Panics
    ///
    /// The method panics if any section holds more than 65535 entries.
    #[must_use]
    pub fn to_vec(&self) -> Bytes {
        let mut target = BytesMut::with_capacity(512);
        let mut compressor = Compressor::new();
        self.header.compose(&mut target);
        for count in [
            self.questions.len(),
            self.answer.len(),
            self.authority.len(),
            self.additional.len(),
        ] {
            target.put_u16(u16::try_from(count).expect("long section"));
        }
        for question in &self.questions {
            question.compose(&mut target, &mut compressor);
        }
        for section in [&self.answer, &self.authority, &self.additional] {
            for record in section {
                record.compose(&mut target, &mut compressor);
            }
        }
        target.freeze()
    }
}

/// # Header Access
///
impl Message {
    /// Returns the message header.
    #[must_use]
    pub fn header(&self) -> Header {
        self.header
    }

    /// Returns a mutable reference to the message header.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Returns the response code of the message.
    #[must_use]
    pub fn rcode(&self) -> Rcode {
        self.header.rcode()
    }

    /// Returns whether the rcode is NOERROR.
    #[must_use]
    pub fn no_error(&self) -> bool {
        self.header.rcode() == Rcode::NOERROR
    }
}

/// # Sections
///
impl Message {
    /// Returns the question section.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Returns the first question, if there is any.
    #[must_use]
    pub fn first_question(&self) -> Option<&Question> {
        self.questions.first()
    }

    /// Appends a question.
    pub fn push_question(&mut self, question: Question) {
        self.questions.push(question)
    }

    /// Returns the records of a section.
    #[must_use]
    pub fn section(&self, section: Section) -> &[Record] {
        match section {
            Section::Answer => &self.answer,
            Section::Authority => &self.authority,
            Section::Additional => &self.additional,
        }
    }

    /// Appends a record to a section.
    pub fn push(&mut self, section: Section, record: Record) {
        self.section_mut(section).push(record)
    }

    fn section_mut(&mut self, section: Section) -> &mut Vec<Record> {
        match section {
            Section::Answer => &mut self.answer,
            Section::Authority => &mut self.authority,
            Section::Additional => &mut self.additional,
        }
    }

    /// Returns the records of a section grouped into record sets.
    ///
    /// Records are grouped by owner, type, and class. The sets appear in
    /// the order of their first record. The TTL of each set is the smallest
    /// TTL of its records.
    #[must_use]
    pub fn rrsets(&self, section: Section) -> Vec<Rrset> {
        let mut res: Vec<Rrset> = Vec::new();
        for record in self.section(section) {
            match res.iter_mut().find(|rrset| rrset.belongs(record)) {
                Some(rrset) => {
                    rrset.push(record.clone());
                }
                None => res.push(Rrset::new(record.clone())),
            }
        }
        res
    }
}

/// # Helpers for Responses
///
impl Message {
    /// Returns whether this message is a response to the given question.
    ///
    /// This is the case if the QR flag is set and the message has exactly
    /// one question that equals `question`.
    #[must_use]
    pub fn is_answer_to(&self, question: &Question) -> bool {
        self.header.qr()
            && self.questions.len() == 1
            && self.questions[0] == *question
    }

    /// Resolves the canonical name of the answer.
    ///
    /// Starts with the name of the first question and follows any CNAME
    /// records in the answer section. Returns `None` if there is no
    /// question or the CNAME records form a loop.
    #[must_use]
    pub fn canonical_name(&self) -> Option<Name> {
        let mut name = self.first_question()?.qname().clone();
        for _ in 0..=self.answer.len() {
            let target = self.answer.iter().find_map(|record| {
                match *record.data() {
                    RecordData::Cname(ref target)
                        if *record.owner() == name =>
                    {
                        Some(target.clone())
                    }
                    _ => None,
                }
            });
            match target {
                Some(target) => name = target,
                None => return Some(name),
            }
        }
        None
    }

    /// Returns the data of answer records of the given type for `name`.
    pub fn answers_for<'a>(
        &'a self,
        name: &'a Name,
        rtype: Rtype,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.answer.iter().filter(move |record| {
            record.owner() == name && record.rtype() == rtype
        })
    }

    /// Checks that the message makes sense as a response at all.
    ///
    /// Returns an error if the QR flag isn’t set.
    pub fn check_response(&self) -> Result<(), FormError> {
        if !self.header.qr() {
            return Err(FormError::new("message is not a response"));
        }
        Ok(())
    }
}

//------------ Section -------------------------------------------------------

/// The record sections of a message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Section {
    Answer,
    Authority,
    Additional,
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Class;
    use crate::base::record::Soa;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn sample() -> Message {
        let query = Message::query(
            Question::new_in(name("www.example.com."), Rtype::A),
            0x1234,
            true,
        );
        let mut msg = Message::answer_for(&query);
        msg.push(
            Section::Answer,
            Record::new(
                name("www.example.com."),
                Class::IN,
                3600,
                RecordData::Cname(name("web.example.com.")),
            ),
        );
        msg.push(
            Section::Answer,
            Record::new(
                name("web.example.com."),
                Class::IN,
                300,
                RecordData::A(Ipv4Addr::new(192, 0, 2, 1)),
            ),
        );
        msg.push(
            Section::Answer,
            Record::new(
                name("web.example.com."),
                Class::IN,
                200,
                RecordData::A(Ipv4Addr::new(192, 0, 2, 2)),
            ),
        );
        msg.push(
            Section::Authority,
            Record::new(
                name("example.com."),
                Class::IN,
                3600,
                RecordData::Soa(Soa {
                    mname: name("ns.example.com."),
                    rname: name("hostmaster.example.com."),
                    serial: 1,
                    refresh: 2,
                    retry: 3,
                    expire: 4,
                    minimum: 60,
                }),
            ),
        );
        msg.push(
            Section::Additional,
            Record::new(
                name("ns.example.com."),
                Class::IN,
                3600,
                RecordData::Dname(name("example.net.")),
            ),
        );
        msg
    }

    #[test]
    fn encode_decode() {
        let msg = sample();
        let octets = msg.to_vec();
        let decoded = Message::from_octets(&octets).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.header().id(), 0x1234);
        assert!(decoded.header().qr());
        assert!(decoded.header().rd());
        assert_eq!(&octets[4..12], b"\x00\x01\x00\x03\x00\x01\x00\x01");
    }

    #[test]
    fn short_message() {
        assert_eq!(
            Message::from_octets(b"\x12\x34\x81\x00\x00\x01"),
            Err(ParseError::ShortInput)
        );
        let msg = sample().to_vec();
        assert!(Message::from_octets(&msg[..msg.len() - 1]).is_err());
    }

    #[test]
    fn rrsets_and_canonical_name() {
        let msg = sample();
        let rrsets = msg.rrsets(Section::Answer);
        assert_eq!(rrsets.len(), 2);
        assert_eq!(rrsets[1].data().len(), 2);
        assert_eq!(rrsets[1].ttl(), 200);
        assert_eq!(msg.canonical_name(), Some(name("web.example.com.")));
        assert_eq!(
            msg.answers_for(&name("WEB.example.com."), Rtype::A).count(),
            2
        );
    }

    #[test]
    fn is_answer_to() {
        let msg = sample();
        assert!(
            msg.is_answer_to(&Question::new_in(name("WWW.EXAMPLE.COM."), Rtype::A))
        );
        assert!(!msg.is_answer_to(&Question::new_in(
            name("www.example.com."),
            Rtype::AAAA
        )));
    }

    #[test]
    fn cname_loop() {
        let mut msg = Message::query(
            Question::new_in(name("a.example."), Rtype::A),
            0,
            false,
        );
        msg.push(
            Section::Answer,
            Record::new(
                name("a.example."),
                Class::IN,
                0,
                RecordData::Cname(name("b.example.")),
            ),
        );
        msg.push(
            Section::Answer,
            Record::new(
                name("b.example."),
                Class::IN,
                0,
                RecordData::Cname(name("a.example.")),
            ),
        );
        assert_eq!(msg.canonical_name(), None);
    }
}
