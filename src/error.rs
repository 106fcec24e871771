use thiserror::Error;

/// Invalid or unusable startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("interface {0} not found")]
    InterfaceNotFound(String),

    #[error("no usable network interface")]
    NoInterface,

    #[error("failed to enumerate devices: {0}")]
    Enumerate(#[from] pcap::Error),

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("{name} must be at most {max}")]
    TooLarge { name: &'static str, max: usize },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open capture on {interface}: {source}")]
    Open {
        interface: String,
        #[source]
        source: pcap::Error,
    },

    #[error("capture read failed: {0}")]
    Read(#[from] pcap::Error),
}

/// Reasons a packet never turns into a record. None of these are surfaced to
/// the operator; the packet is simply dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("link layer: {0}")]
    Link(String),

    #[error("unsupported link type {0}")]
    UnsupportedLink(i32),

    #[error("no transport layer")]
    NoTransport,

    #[error("not a DNS port")]
    NotDns,

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("malformed domain name")]
    BadName,

    #[error("TCP length prefix {declared} does not match payload {actual}")]
    TcpLength { declared: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),
}
