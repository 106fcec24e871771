use crate::dns::{DnsRecord, Endpoints};
use crate::error::DecodeError;
use crate::pcap::capture::{LinkType, RawPacket};
use etherparse::{IpHeader, PacketHeaders, TransportHeader};
use std::net::IpAddr;

pub const DNS_PORT: u16 = 53;

/// Decode one captured frame down to the DNS layer.
///
/// Layers: link (Ethernet or raw IP) → IPv4/IPv6 → UDP/TCP → DNS. Payloads
/// are only treated as DNS when either port is 53. `Ok(None)` means the
/// packet was well formed but carried a DNS query rather than a response.
pub fn decode_packet(packet: &RawPacket) -> Result<Option<DnsRecord>, DecodeError> {
    let headers = match packet.link_type {
        LinkType::Ethernet => PacketHeaders::from_ethernet_slice(&packet.data),
        LinkType::RawIp => PacketHeaders::from_ip_slice(&packet.data),
        LinkType::Other(dlt) => return Err(DecodeError::UnsupportedLink(dlt)),
    }
    .map_err(|e| DecodeError::Link(e.to_string()))?;

    let mut endpoints = Endpoints::default();

    match &headers.ip {
        Some(IpHeader::Version4(h, _)) => {
            endpoints.source_ip = Some(IpAddr::from(h.source));
            endpoints.destination_ip = Some(IpAddr::from(h.destination));
        }
        Some(IpHeader::Version6(h, _)) => {
            endpoints.source_ip = Some(IpAddr::from(h.source));
            endpoints.destination_ip = Some(IpAddr::from(h.destination));
        }
        None => {}
    }

    let is_tcp = match &headers.transport {
        Some(TransportHeader::Udp(udp)) => {
            endpoints.source_port = udp.source_port;
            endpoints.destination_port = udp.destination_port;
            false
        }
        Some(TransportHeader::Tcp(tcp)) => {
            endpoints.source_port = tcp.source_port;
            endpoints.destination_port = tcp.destination_port;
            true
        }
        _ => return Err(DecodeError::NoTransport),
    };

    if endpoints.source_port != DNS_PORT && endpoints.destination_port != DNS_PORT {
        return Err(DecodeError::NotDns);
    }

    let payload = if is_tcp {
        strip_tcp_length(headers.payload)?
    } else {
        headers.payload
    };

    DnsRecord::from_payload(payload, endpoints)
}

/// DNS over TCP prefixes each message with a two-byte length (RFC 1035
/// Section 4.2.2). Only segments holding a whole message are decoded.
fn strip_tcp_length(payload: &[u8]) -> Result<&[u8], DecodeError> {
    if payload.len() < 2 {
        return Err(DecodeError::Truncated("TCP length prefix"));
    }

    let declared = u16::from_be_bytes([payload[0], payload[1]]) as usize;
    let body = &payload[2..];
    if declared > body.len() {
        return Err(DecodeError::TcpLength {
            declared,
            actual: body.len(),
        });
    }

    Ok(&body[..declared])
}
