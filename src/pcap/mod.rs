mod capture;
mod decode;

pub use capture::{
    LinkType, LiveCapture, Next, PacketSource, RawPacket, default_interface, ensure_interface,
    list_interfaces,
};
pub use decode::{DNS_PORT, decode_packet};
