//! Resource Record (RR) TYPEs

//------------ Rtype ---------------------------------------------------------

int_enum! {
    /// Resource Record Types.
    ///
    /// Each resource records has a 16 bit type value indicating what kind of
    /// information is represented by the record. Normal query includes the
    /// type of record information is requested for. A few aditional types,
    /// called query types, are defined as well and can only be used in
    /// questions. This type represents both these types.
    ///
    /// Only the types the resolver needs to reason about have constants
    /// here. All other values are still representable via
    /// [`Rtype::from_int`].
    =>
    Rtype, u16;

    /// A host address.
    (A => 1, "A")

    /// An authoritative name server.
    (NS => 2, "NS")

    /// The canonical name for an alias
    (CNAME => 5, "CNAME")

    /// Marks the start of a zone of authority.
    (SOA => 6, "SOA")

    /// A domain name pointer.
    (PTR => 12, "PTR")

    /// Mail exchange.
    (MX => 15, "MX")

    /// Text strings.
    (TXT => 16, "TXT")

    /// IPv6 address.
    (AAAA =>  28, "AAAA")

    /// Server selection.
    (SRV => 33, "SRV")

    /// Delegation name.
    ///
    /// Aliases an entire subtree of the name space.
    (DNAME => 39, "DNAME")

    /// OPT pseudo record.
    (OPT => 41, "OPT")

    /// Transaction signature.
    (TSIG => 250, "TSIG")

    /// A request for all records the server has available.
    (ANY => 255, "ANY")
}

int_enum_wire_u16!(Rtype);
int_enum_str_with_prefix!(Rtype, "TYPE", "unknown record type");

impl Rtype {
    /// Returns whether the type carries a host address.
    #[must_use]
    pub fn is_address(self) -> bool {
        self == Rtype::A || self == Rtype::AAAA
    }

    /// Returns whether the type may only appear in a question.
    #[must_use]
    pub fn is_query_only(self) -> bool {
        self == Rtype::ANY || (self.0 >= 128 && self.0 <= 255)
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::Rtype;

    #[test]
    fn from_str_and_display() {
        assert_eq!("aaaa".parse::<Rtype>().unwrap(), Rtype::AAAA);
        assert_eq!("TYPE39".parse::<Rtype>().unwrap(), Rtype::DNAME);
        assert_eq!(Rtype::from_int(65280).to_string(), "TYPE65280");
        assert!("TYPEX".parse::<Rtype>().is_err());
    }

    #[test]
    fn debug() {
        assert_eq!(format!("{:?}", Rtype::CNAME), "Rtype::CNAME");
        assert_eq!(format!("{:?}", Rtype::from_int(99)), "Rtype(99)");
    }

    #[test]
    fn classification() {
        assert!(Rtype::A.is_address());
        assert!(!Rtype::CNAME.is_address());
        assert!(Rtype::ANY.is_query_only());
        assert!(!Rtype::NS.is_query_only());
    }
}
