use crate::dns::DnsRecord;
use crate::error::SinkError;
use crate::output::{RecordSink, encode_line};
use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Mutex;

/// Writes one JSON line per record to stdout (or any other writer).
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl RecordSink for ConsoleSink {
    async fn write(&self, record: &DnsRecord) -> Result<(), SinkError> {
        let line = encode_line(record)?;
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        out.write_all(&line)?;
        out.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
