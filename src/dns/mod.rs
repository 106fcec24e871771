pub mod message;
mod record;
pub mod types;

pub use message::{DnsHeader, DnsMessage, RData, ResourceRecord, WireQuestion};
pub use record::{Answer, DnsRecord, Endpoints, Question};
