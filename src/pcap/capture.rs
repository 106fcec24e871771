use crate::config::CaptureConfig;
use crate::error::{CaptureError, ConfigError};
use log::{debug, info};
use pcap::{Active, Capture, Device, Error};

/// Kernel-side filter: DNS over UDP and TCP, either direction.
pub const DNS_FILTER: &str = "port 53";

/// Data-link framing of a captured buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    /// Packets start at the IP header (DLT_RAW and friends)
    RawIp,
    Other(i32),
}

impl LinkType {
    pub fn from_dlt(dlt: i32) -> Self {
        match dlt {
            1 => Self::Ethernet,
            12 | 14 | 101 => Self::RawIp,
            n => Self::Other(n),
        }
    }
}

/// A captured frame. Owned by whichever task decodes it and dropped after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub link_type: LinkType,
    pub data: Vec<u8>,
}

impl RawPacket {
    pub fn new(link_type: LinkType, data: Vec<u8>) -> Self {
        Self { link_type, data }
    }
}

/// Outcome of one blocking read.
#[derive(Debug)]
pub enum Next {
    Packet(RawPacket),
    /// The read timeout elapsed with no traffic
    TimedOut,
    /// The source was closed; every later read returns this too
    Closed,
}

/// A lazy, non-restartable sequence of packets.
///
/// Reads block for at most the source's read timeout so the caller gets a
/// chance to observe shutdown between packets.
pub trait PacketSource: Send {
    fn next_packet(&mut self) -> Result<Next, CaptureError>;

    /// Idempotent; terminates the sequence.
    fn close(&mut self);
}

/// libpcap-backed live capture on one interface.
pub struct LiveCapture {
    interface: String,
    link_type: LinkType,
    cap: Option<Capture<Active>>,
}

impl LiveCapture {
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        info!("Opening capture on interface: {}", config.interface);

        let timeout_ms = i32::try_from(config.read_timeout.as_millis()).unwrap_or(i32::MAX);
        let open_err = |source| CaptureError::Open {
            interface: config.interface.clone(),
            source,
        };

        let mut cap = Capture::from_device(config.interface.as_str())
            .map_err(open_err)?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(timeout_ms)
            .immediate_mode(true)
            .open()
            .map_err(open_err)?;

        cap.filter(DNS_FILTER, true).map_err(open_err)?;

        let link_type = LinkType::from_dlt(cap.get_datalink().0);
        info!(
            "Capture started on interface: {} (link type {:?}, snaplen {}, promiscuous {})",
            config.interface, link_type, config.snaplen, config.promiscuous
        );

        Ok(Self {
            interface: config.interface.clone(),
            link_type,
            cap: Some(cap),
        })
    }
}

impl PacketSource for LiveCapture {
    fn next_packet(&mut self) -> Result<Next, CaptureError> {
        let Some(cap) = self.cap.as_mut() else {
            return Ok(Next::Closed);
        };

        let next = match cap.next_packet() {
            Ok(packet) => Next::Packet(RawPacket::new(self.link_type, packet.data.to_vec())),
            // Timeout is expected, the caller loops back to check for shutdown
            Err(Error::TimeoutExpired) => Next::TimedOut,
            Err(Error::NoMorePackets) => Next::Closed,
            Err(e) => return Err(e.into()),
        };

        if matches!(next, Next::Closed) {
            self.close();
        }
        Ok(next)
    }

    fn close(&mut self) {
        if self.cap.take().is_some() {
            debug!("Closed capture handle on {}", self.interface);
        }
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.close();
    }
}

pub fn list_interfaces() -> Result<Vec<Device>, ConfigError> {
    Ok(Device::list()?)
}

/// First enumerated device, skipping the `any` pseudo-device.
pub fn default_interface() -> Result<String, ConfigError> {
    Device::list()?
        .into_iter()
        .find(|d| d.name != "any")
        .map(|d| d.name)
        .ok_or(ConfigError::NoInterface)
}

/// Fail early on a misspelled interface rather than at capture open.
pub fn ensure_interface(name: &str) -> Result<(), ConfigError> {
    if Device::list()?.iter().any(|d| d.name == name) {
        Ok(())
    } else {
        Err(ConfigError::InterfaceNotFound(name.to_string()))
    }
}
