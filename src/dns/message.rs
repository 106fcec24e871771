use crate::dns::types::DnsRecordType;
use crate::error::DecodeError;
use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr};

const HEADER_LEN: usize = 12;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const MAX_POINTER_JUMPS: usize = 10;

/// DNS Header Format (12 bytes, RFC 1035 Section 4.1.1):
/// ```text
///  0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    QDCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ANCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    NSCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ARCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: u16,
    pub qd_count: u16,
    pub an_count: u16,
}

impl DnsHeader {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < HEADER_LEN {
            return Err(DecodeError::Truncated("DNS header"));
        }

        Ok(Self {
            id: u16::from_be_bytes([data[0], data[1]]),
            flags: u16::from_be_bytes([data[2], data[3]]),
            qd_count: u16::from_be_bytes([data[4], data[5]]),
            an_count: u16::from_be_bytes([data[6], data[7]]),
        })
    }

    /// QR bit: 1 = response
    pub fn is_response(&self) -> bool {
        self.flags & 0x8000 != 0
    }

    pub fn opcode(&self) -> u8 {
        ((self.flags >> 11) & 0x0F) as u8
    }

    pub fn rcode(&self) -> u8 {
        (self.flags & 0x000F) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireQuestion {
    pub name: Bytes,
    pub qtype: u16,
    pub qclass: u16,
}

/// Decoded RDATA for the record types we render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    /// CNAME, NS and PTR all carry a single domain name
    Name(Bytes),
    Mx { preference: u16, exchange: Bytes },
    Txt(Vec<Bytes>),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Bytes,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub rdata: RData,
}

/// Question and answer sections of one DNS message. Authority and additional
/// sections are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<WireQuestion>,
    pub answers: Vec<ResourceRecord>,
}

impl DnsMessage {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let header = DnsHeader::parse(data)?;
        let mut offset = HEADER_LEN;

        let mut questions = Vec::with_capacity(header.qd_count as usize);
        for _ in 0..header.qd_count {
            let name = parse_domain_name(data, &mut offset)?;

            // QTYPE (2 bytes) + QCLASS (2 bytes)
            if offset + 4 > data.len() {
                return Err(DecodeError::Truncated("question"));
            }
            let qtype = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let qclass = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
            offset += 4;

            questions.push(WireQuestion {
                name,
                qtype,
                qclass,
            });
        }

        // ANCOUNT comes off the wire, so cap the preallocation
        let mut answers = Vec::with_capacity((header.an_count as usize).min(32));
        for _ in 0..header.an_count {
            answers.push(parse_resource_record(data, &mut offset)?);
        }

        Ok(Self {
            header,
            questions,
            answers,
        })
    }
}

/// Parse DNS domain name with compression support (RFC 1035 Section 4.1.4)
///
/// Names are a sequence of length-prefixed labels ending in a zero octet. A
/// length octet with the top two bits set is a pointer: the remaining 14 bits
/// give an offset from the start of the message where the name continues.
///
/// ```text
///  +--+--+--+--+--+--+--+--+--+--+
///  | 3 | f | t | p |  0xC0  | 0x04 |  <- "ftp" + pointer to offset 4
///  +--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// Labels are joined with dots, with no trailing root dot. `offset` is left
/// just past the name where it starts, not where a pointer led.
pub fn parse_domain_name(data: &[u8], offset: &mut usize) -> Result<Bytes, DecodeError> {
    let mut domain = Vec::new();
    let mut cursor = *offset;
    let mut resume_at = None;
    let mut jump_count = 0;

    loop {
        let len = *data.get(cursor).ok_or(DecodeError::BadName)? as usize;

        if len == 0 {
            cursor += 1;
            break;
        }

        if len & 0xC0 == 0xC0 {
            let low = *data.get(cursor + 1).ok_or(DecodeError::BadName)? as usize;

            if resume_at.is_none() {
                resume_at = Some(cursor + 2);
            }

            jump_count += 1;
            if jump_count > MAX_POINTER_JUMPS {
                return Err(DecodeError::BadName);
            }

            cursor = ((len & 0x3F) << 8) | low;
            continue;
        }

        // 0x40 and 0x80 prefixes are reserved label types
        if len > MAX_LABEL_LEN {
            return Err(DecodeError::BadName);
        }

        cursor += 1;
        let label = data.get(cursor..cursor + len).ok_or(DecodeError::BadName)?;

        if !domain.is_empty() {
            domain.push(b'.');
        }
        domain.extend_from_slice(label);
        cursor += len;

        if domain.len() > MAX_NAME_LEN {
            return Err(DecodeError::BadName);
        }
    }

    *offset = resume_at.unwrap_or(cursor);
    Ok(Bytes::from(domain))
}

/// Resource Record (RR) Format (RFC 1035 Section 4.1.3):
///
/// ```text
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     /                      NAME                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     CLASS                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TTL                      |
///     |                                               |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                   RDLENGTH                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
///     /                     RDATA                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
fn parse_resource_record(data: &[u8], offset: &mut usize) -> Result<ResourceRecord, DecodeError> {
    let name = parse_domain_name(data, offset)?;

    // TYPE(2) + CLASS(2) + TTL(4) + RDLENGTH(2) = 10 bytes
    let fixed = data
        .get(*offset..*offset + 10)
        .ok_or(DecodeError::Truncated("resource record"))?;
    let rtype = u16::from_be_bytes([fixed[0], fixed[1]]);
    let rclass = u16::from_be_bytes([fixed[2], fixed[3]]);
    let ttl = u32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
    let rdlength = u16::from_be_bytes([fixed[8], fixed[9]]) as usize;
    *offset += 10;

    let rdata_start = *offset;
    let rdata = data
        .get(rdata_start..rdata_start + rdlength)
        .ok_or(DecodeError::Truncated("rdata"))?;

    let rdata = match DnsRecordType::from_u16(rtype) {
        DnsRecordType::A => {
            let octets: [u8; 4] = rdata
                .try_into()
                .map_err(|_| DecodeError::Truncated("A rdata"))?;
            RData::A(Ipv4Addr::from(octets))
        }
        DnsRecordType::Aaaa => {
            let octets: [u8; 16] = rdata
                .try_into()
                .map_err(|_| DecodeError::Truncated("AAAA rdata"))?;
            RData::Aaaa(Ipv6Addr::from(octets))
        }
        // Names inside RDATA may point back into the message, so they are
        // parsed against the full buffer rather than the RDATA slice
        DnsRecordType::Cname | DnsRecordType::Ns | DnsRecordType::Ptr => {
            let mut name_offset = rdata_start;
            RData::Name(parse_domain_name(data, &mut name_offset)?)
        }
        DnsRecordType::Mx => {
            if rdlength < 3 {
                return Err(DecodeError::Truncated("MX rdata"));
            }
            let preference = u16::from_be_bytes([rdata[0], rdata[1]]);
            let mut name_offset = rdata_start + 2;
            RData::Mx {
                preference,
                exchange: parse_domain_name(data, &mut name_offset)?,
            }
        }
        DnsRecordType::Txt => RData::Txt(parse_character_strings(rdata)?),
        _ => RData::Other,
    };

    *offset = rdata_start + rdlength;

    Ok(ResourceRecord {
        name,
        rtype,
        rclass,
        ttl,
        rdata,
    })
}

/// TXT RDATA is one or more <character-string>s, each a length octet
/// followed by that many bytes.
fn parse_character_strings(rdata: &[u8]) -> Result<Vec<Bytes>, DecodeError> {
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < rdata.len() {
        let len = rdata[pos] as usize;
        pos += 1;
        let segment = rdata
            .get(pos..pos + len)
            .ok_or(DecodeError::Truncated("TXT segment"))?;
        segments.push(Bytes::copy_from_slice(segment));
        pos += len;
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uncompressed_name() {
        let data = b"\x03www\x07example\x03com\x00rest";
        let mut offset = 0;
        let name = parse_domain_name(data, &mut offset).unwrap();
        assert_eq!(&name[..], b"www.example.com");
        assert_eq!(offset, 17);
    }

    #[test]
    fn follows_compression_pointer_and_resumes_after_it() {
        // "example.com" at 0, then "ftp" + pointer to 0 at 13
        let data = b"\x07example\x03com\x00\x03ftp\xC0\x00\xFF";
        let mut offset = 13;
        let name = parse_domain_name(data, &mut offset).unwrap();
        assert_eq!(&name[..], b"ftp.example.com");
        assert_eq!(offset, 19);
    }

    #[test]
    fn rejects_pointer_loop() {
        let data = b"\xC0\x00";
        let mut offset = 0;
        assert_eq!(
            parse_domain_name(data, &mut offset),
            Err(DecodeError::BadName)
        );
    }

    #[test]
    fn rejects_label_past_end() {
        let data = b"\x05ab";
        let mut offset = 0;
        assert!(parse_domain_name(data, &mut offset).is_err());
    }

    #[test]
    fn root_name_is_empty() {
        let mut offset = 0;
        let name = parse_domain_name(b"\x00", &mut offset).unwrap();
        assert!(name.is_empty());
        assert_eq!(offset, 1);
    }

    #[test]
    fn header_flags() {
        let header = DnsHeader::parse(&[0x12, 0x34, 0x81, 0x83, 0, 1, 0, 0, 0, 0, 0, 0]).unwrap();
        assert!(header.is_response());
        assert_eq!(header.opcode(), 0);
        assert_eq!(header.rcode(), 3);
        assert_eq!(header.id, 0x1234);
    }

    #[test]
    fn short_header_is_truncated() {
        assert_eq!(
            DnsHeader::parse(&[0; 5]),
            Err(DecodeError::Truncated("DNS header"))
        );
    }

    #[test]
    fn txt_segments() {
        let segments = parse_character_strings(b"\x01a\x02bc").unwrap();
        assert_eq!(segments, vec![Bytes::from_static(b"a"), Bytes::from_static(b"bc")]);
        assert!(parse_character_strings(b"\x05ab").is_err());
    }
}
