use crate::dns::message::{DnsHeader, DnsMessage, RData, ResourceRecord, WireQuestion};
use crate::dns::types::{DnsClass, DnsRecordType, opcode_name, response_code_name};
use crate::error::DecodeError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One DNS response as it is handed to an output sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub timestamp: DateTime<Local>,
    pub source_ip: Option<IpAddr>,
    pub destination_ip: Option<IpAddr>,
    pub source_port: u16,
    pub destination_port: u16,
    pub response_code: String,
    pub opcode: String,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub qtype: String,
    pub class: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "type")]
    pub rtype: String,
    pub class: String,
    pub ttl: u32,
    pub value: String,
}

/// Addressing pulled from the network and transport layers. Absent layers
/// leave the fields at their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub source_ip: Option<IpAddr>,
    pub destination_ip: Option<IpAddr>,
    pub source_port: u16,
    pub destination_port: u16,
}

impl DnsRecord {
    /// Build a record from a DNS payload.
    ///
    /// Returns `Ok(None)` for queries; only messages with the QR bit set
    /// produce a record. The header is checked before the body is parsed so
    /// queries cost a 12-byte read.
    pub fn from_payload(
        payload: &[u8],
        endpoints: Endpoints,
    ) -> Result<Option<Self>, DecodeError> {
        if !DnsHeader::parse(payload)?.is_response() {
            return Ok(None);
        }

        let message = DnsMessage::parse(payload)?;
        Ok(Some(Self::from_message(&message, endpoints, Local::now())))
    }

    pub fn from_message(
        message: &DnsMessage,
        endpoints: Endpoints,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            timestamp,
            source_ip: endpoints.source_ip,
            destination_ip: endpoints.destination_ip,
            source_port: endpoints.source_port,
            destination_port: endpoints.destination_port,
            response_code: response_code_name(message.header.rcode()),
            opcode: opcode_name(message.header.opcode()),
            questions: message.questions.iter().map(Question::from).collect(),
            answers: message.answers.iter().map(Answer::from).collect(),
        }
    }
}

impl From<&WireQuestion> for Question {
    fn from(q: &WireQuestion) -> Self {
        Self {
            qtype: DnsRecordType::from_u16(q.qtype).name(),
            class: DnsClass::from_u16(q.qclass).name(),
            name: String::from_utf8_lossy(&q.name).into_owned(),
        }
    }
}

impl From<&ResourceRecord> for Answer {
    fn from(rr: &ResourceRecord) -> Self {
        Self {
            rtype: DnsRecordType::from_u16(rr.rtype).name(),
            class: DnsClass::from_u16(rr.rclass).name(),
            ttl: rr.ttl,
            value: answer_value(&rr.rdata),
        }
    }
}

/// Render RDATA as the single string stored with each answer. Types we do not
/// decode yield an empty value.
fn answer_value(rdata: &RData) -> String {
    match rdata {
        RData::A(addr) => addr.to_string(),
        RData::Aaaa(addr) => addr.to_string(),
        RData::Name(name) => String::from_utf8_lossy(name).into_owned(),
        RData::Mx { exchange, .. } => String::from_utf8_lossy(exchange).into_owned(),
        RData::Txt(segments) => segments
            .iter()
            .map(|s| String::from_utf8_lossy(s))
            .collect::<Vec<_>>()
            .join("\n")
            .trim_matches('\n')
            .to_string(),
        RData::Other => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn rr(rtype: u16, rdata: RData) -> ResourceRecord {
        ResourceRecord {
            name: Bytes::from_static(b"example.com"),
            rtype,
            rclass: 1,
            ttl: 60,
            rdata,
        }
    }

    #[test]
    fn a_and_aaaa_render_as_addresses() {
        let a = Answer::from(&rr(1, RData::A(Ipv4Addr::new(93, 184, 216, 34))));
        assert_eq!(a.value, "93.184.216.34");
        assert_eq!(a.rtype, "A");
        assert_eq!(a.class, "IN");

        let aaaa = Answer::from(&rr(28, RData::Aaaa(Ipv6Addr::LOCALHOST)));
        assert_eq!(aaaa.value, "::1");
        assert_eq!(aaaa.rtype, "AAAA");
    }

    #[test]
    fn mx_drops_preference() {
        let mx = Answer::from(&rr(
            15,
            RData::Mx {
                preference: 10,
                exchange: Bytes::from_static(b"mail.example.com"),
            },
        ));
        assert_eq!(mx.value, "mail.example.com");
    }

    #[test]
    fn txt_joins_segments_and_trims_newlines() {
        let txt = RData::Txt(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        assert_eq!(answer_value(&txt), "a\nb");

        let padded = RData::Txt(vec![
            Bytes::from_static(b""),
            Bytes::from_static(b"v=spf1"),
            Bytes::from_static(b""),
        ]);
        assert_eq!(answer_value(&padded), "v=spf1");
    }

    #[test]
    fn unhandled_type_is_empty() {
        let soa = Answer::from(&rr(6, RData::Other));
        assert_eq!(soa.rtype, "SOA");
        assert!(soa.value.is_empty());
    }

    #[test]
    fn query_yields_no_record() {
        // QR=0, one question for "a."
        let payload = [0, 1, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0, 1, b'a', 0, 0, 1, 0, 1];
        assert_eq!(DnsRecord::from_payload(&payload, Endpoints::default()), Ok(None));
    }
}
