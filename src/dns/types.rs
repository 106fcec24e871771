/// DNS Record Types (RFC 1035 Section 3.2.2, RFC 3596)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnsRecordType {
    /// A record: IPv4 address (32 bits)
    A,
    /// NS record: Authoritative name server
    Ns,
    /// CNAME record: Canonical name for an alias
    Cname,
    /// SOA record: Start of authority
    Soa,
    /// PTR record: Domain name pointer
    Ptr,
    /// MX record: Mail exchange
    Mx,
    /// TXT record: Text strings
    Txt,
    /// AAAA record: IPv6 address (128 bits) - RFC 3596
    Aaaa,
    /// SRV record: Service location - RFC 2782
    Srv,
    /// OPT pseudo-record - RFC 6891
    Opt,
    /// SVCB record: Service binding - RFC 9460
    Svcb,
    /// HTTPS record: HTTPS binding - RFC 9460
    Https,
    /// ANY query type
    Any,
    /// Unknown or unsupported record type
    Unknown(u16),
}

impl DnsRecordType {
    /// Convert wire format u16 to `DnsRecordType`
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::Ns,
            5 => Self::Cname,
            6 => Self::Soa,
            12 => Self::Ptr,
            15 => Self::Mx,
            16 => Self::Txt,
            28 => Self::Aaaa,
            33 => Self::Srv,
            41 => Self::Opt,
            64 => Self::Svcb,
            65 => Self::Https,
            255 => Self::Any,
            n => Self::Unknown(n),
        }
    }

    /// Get human-readable name for the record type
    pub fn name(self) -> String {
        match self {
            Self::A => "A".to_string(),
            Self::Ns => "NS".to_string(),
            Self::Cname => "CNAME".to_string(),
            Self::Soa => "SOA".to_string(),
            Self::Ptr => "PTR".to_string(),
            Self::Mx => "MX".to_string(),
            Self::Txt => "TXT".to_string(),
            Self::Aaaa => "AAAA".to_string(),
            Self::Srv => "SRV".to_string(),
            Self::Opt => "OPT".to_string(),
            Self::Svcb => "SVCB".to_string(),
            Self::Https => "HTTPS".to_string(),
            Self::Any => "ANY".to_string(),
            Self::Unknown(n) => format!("TYPE{n}"),
        }
    }
}

/// DNS Classes (RFC 1035 Section 3.2.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsClass {
    In,
    Cs,
    Ch,
    Hs,
    Any,
    Unknown(u16),
}

impl DnsClass {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::In,
            2 => Self::Cs,
            3 => Self::Ch,
            4 => Self::Hs,
            255 => Self::Any,
            n => Self::Unknown(n),
        }
    }

    pub fn name(self) -> String {
        match self {
            Self::In => "IN".to_string(),
            Self::Cs => "CS".to_string(),
            Self::Ch => "CH".to_string(),
            Self::Hs => "HS".to_string(),
            Self::Any => "ANY".to_string(),
            Self::Unknown(n) => format!("CLASS{n}"),
        }
    }
}

/// RCODE mnemonic for the 4-bit header field (RFC 1035, RFC 2136).
pub fn response_code_name(rcode: u8) -> String {
    match rcode {
        0 => "NOERROR".to_string(),
        1 => "FORMERR".to_string(),
        2 => "SERVFAIL".to_string(),
        3 => "NXDOMAIN".to_string(),
        4 => "NOTIMP".to_string(),
        5 => "REFUSED".to_string(),
        6 => "YXDOMAIN".to_string(),
        7 => "YXRRSET".to_string(),
        8 => "NXRRSET".to_string(),
        9 => "NOTAUTH".to_string(),
        10 => "NOTZONE".to_string(),
        n => format!("RCODE{n}"),
    }
}

/// OPCODE mnemonic for the 4-bit header field.
pub fn opcode_name(opcode: u8) -> String {
    match opcode {
        0 => "QUERY".to_string(),
        1 => "IQUERY".to_string(),
        2 => "STATUS".to_string(),
        4 => "NOTIFY".to_string(),
        5 => "UPDATE".to_string(),
        6 => "DSO".to_string(),
        n => format!("OPCODE{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_type_names() {
        assert_eq!(DnsRecordType::from_u16(1).name(), "A");
        assert_eq!(DnsRecordType::from_u16(28).name(), "AAAA");
        assert_eq!(DnsRecordType::from_u16(99).name(), "TYPE99");
    }

    #[test]
    fn class_names() {
        assert_eq!(DnsClass::from_u16(1).name(), "IN");
        assert_eq!(DnsClass::from_u16(3).name(), "CH");
        assert_eq!(DnsClass::from_u16(77).name(), "CLASS77");
    }

    #[test]
    fn header_field_names() {
        assert_eq!(response_code_name(3), "NXDOMAIN");
        assert_eq!(response_code_name(15), "RCODE15");
        assert_eq!(opcode_name(0), "QUERY");
        assert_eq!(opcode_name(3), "OPCODE3");
    }
}
