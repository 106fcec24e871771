#![allow(dead_code)]

use async_trait::async_trait;
use dns_traffic::dns::DnsRecord;
use dns_traffic::error::{CaptureError, SinkError};
use dns_traffic::output::RecordSink;
use dns_traffic::pcap::{LinkType, Next, PacketSource, RawPacket};
use etherparse::PacketBuilder;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const RESOLVER: [u8; 4] = [8, 8, 8, 8];
pub const CLIENT: [u8; 4] = [192, 168, 1, 10];

pub const TYPE_A: u16 = 1;
pub const TYPE_NS: u16 = 2;
pub const TYPE_CNAME: u16 = 5;
pub const TYPE_SOA: u16 = 6;
pub const TYPE_MX: u16 = 15;
pub const TYPE_TXT: u16 = 16;
pub const TYPE_AAAA: u16 = 28;
pub const CLASS_IN: u16 = 1;

/// Hand-assembled DNS message without name compression.
#[derive(Default)]
pub struct DnsBuilder {
    id: u16,
    flags: u16,
    questions: Vec<Vec<u8>>,
    answers: Vec<Vec<u8>>,
}

impl DnsBuilder {
    pub fn response() -> Self {
        Self {
            id: 0xBEEF,
            flags: 0x8180,
            ..Default::default()
        }
    }

    pub fn query() -> Self {
        Self {
            id: 0xBEEF,
            flags: 0x0100,
            ..Default::default()
        }
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn question(mut self, name: &str, qtype: u16) -> Self {
        let mut q = encode_name(name);
        q.extend_from_slice(&qtype.to_be_bytes());
        q.extend_from_slice(&CLASS_IN.to_be_bytes());
        self.questions.push(q);
        self
    }

    pub fn answer(mut self, name: &str, rtype: u16, ttl: u32, rdata: Vec<u8>) -> Self {
        let mut rr = encode_name(name);
        rr.extend_from_slice(&rtype.to_be_bytes());
        rr.extend_from_slice(&CLASS_IN.to_be_bytes());
        rr.extend_from_slice(&ttl.to_be_bytes());
        rr.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        rr.extend_from_slice(&rdata);
        self.answers.push(rr);
        self
    }

    /// Raw answer bytes, for records that use compression pointers.
    pub fn raw_answer(mut self, bytes: Vec<u8>) -> Self {
        self.answers.push(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.id.to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&(self.questions.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 0]);
        for q in &self.questions {
            out.extend_from_slice(q);
        }
        for a in &self.answers {
            out.extend_from_slice(a);
        }
        out
    }
}

pub fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

pub fn txt_rdata(segments: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for s in segments {
        out.push(s.len() as u8);
        out.extend_from_slice(s.as_bytes());
    }
    out
}

pub fn mx_rdata(preference: u16, exchange: &str) -> Vec<u8> {
    let mut out = preference.to_be_bytes().to_vec();
    out.extend_from_slice(&encode_name(exchange));
    out
}

pub fn a_response(name: &str, addr: [u8; 4], ttl: u32) -> Vec<u8> {
    DnsBuilder::response()
        .question(name, TYPE_A)
        .answer(name, TYPE_A, ttl, addr.to_vec())
        .build()
}

/// Ethernet/IPv4/UDP frame from the resolver to the client.
pub fn udp_frame(dns: &[u8], src_port: u16, dst_port: u16) -> RawPacket {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4(RESOLVER, CLIENT, 64)
        .udp(src_port, dst_port);
    let mut out = Vec::with_capacity(builder.size(dns.len()));
    builder.write(&mut out, dns).unwrap();
    RawPacket::new(LinkType::Ethernet, out)
}

pub fn dns_response_frame(dns: &[u8]) -> RawPacket {
    udp_frame(dns, 53, 40000)
}

/// Ethernet/IPv6/TCP frame carrying one length-prefixed DNS message.
pub fn tcp6_frame(dns: &[u8], src: [u8; 16], dst: [u8; 16]) -> RawPacket {
    let mut payload = (dns.len() as u16).to_be_bytes().to_vec();
    payload.extend_from_slice(dns);

    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv6(src, dst, 64)
        .tcp(53, 51000, 1, 65535);
    let mut out = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut out, &payload).unwrap();
    RawPacket::new(LinkType::Ethernet, out)
}

/// IPv4/UDP with no link header, as seen on DLT_RAW captures.
pub fn raw_ip_frame(dns: &[u8]) -> RawPacket {
    let builder = PacketBuilder::ipv4(RESOLVER, CLIENT, 64).udp(53, 40000);
    let mut out = Vec::with_capacity(builder.size(dns.len()));
    builder.write(&mut out, dns).unwrap();
    RawPacket::new(LinkType::RawIp, out)
}

/// Yields queued packets, then either closes or idles until shut down.
pub struct VecSource {
    packets: VecDeque<RawPacket>,
    hold_open: bool,
    closed: Arc<AtomicBool>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl VecSource {
    pub fn new(packets: Vec<RawPacket>) -> Self {
        Self {
            packets: packets.into(),
            hold_open: false,
            closed: Arc::new(AtomicBool::new(false)),
            on_close: None,
        }
    }

    /// Keep reporting read timeouts after the packets run out.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn on_close(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl PacketSource for VecSource {
    fn next_packet(&mut self) -> Result<Next, CaptureError> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(Next::Closed);
        }
        match self.packets.pop_front() {
            Some(packet) => Ok(Next::Packet(packet)),
            None if self.hold_open => {
                std::thread::sleep(Duration::from_millis(5));
                Ok(Next::TimedOut)
            }
            None => Ok(Next::Closed),
        }
    }

    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Some(f) = self.on_close.take() {
                f();
            }
        }
    }
}

/// Collects every record; optionally slow or failing.
#[derive(Default)]
pub struct MemorySink {
    pub records: Mutex<Vec<DnsRecord>>,
    pub started: AtomicUsize,
    pub completed: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&self, record: &DnsRecord) -> Result<(), SinkError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(SinkError::Io(std::io::Error::other("sink unavailable")));
        }
        self.records.lock().unwrap().push(record.clone());
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
