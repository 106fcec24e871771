mod console;
mod database;
mod file;

pub use console::ConsoleSink;
pub use database::{DatabaseSink, TABLE};
pub use file::FileSink;

use crate::config::{OutputTarget, Settings};
use crate::dns::DnsRecord;
use crate::error::SinkError;
use async_trait::async_trait;
use log::{error, info};
use std::sync::Arc;

/// Something that durably records one DNS record per call.
///
/// Implementations must tolerate concurrent callers: every dispatched packet
/// writes from its own task.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn write(&self, record: &DnsRecord) -> Result<(), SinkError>;

    fn name(&self) -> &'static str;
}

/// The output chosen at startup.
pub enum OutputSink {
    Console(ConsoleSink),
    File(FileSink),
    Database(DatabaseSink),
}

impl OutputSink {
    pub async fn open(target: &OutputTarget, db_retries: u32) -> Result<Self, SinkError> {
        let sink = match target {
            OutputTarget::Console => Self::Console(ConsoleSink::stdout()),
            OutputTarget::File { prefix } => Self::File(FileSink::open(prefix).await?),
            OutputTarget::Database { uri } => {
                Self::Database(DatabaseSink::connect(uri, db_retries).await?)
            }
        };
        info!("Output mode: {}", sink.name());
        Ok(sink)
    }
}

#[async_trait]
impl RecordSink for OutputSink {
    async fn write(&self, record: &DnsRecord) -> Result<(), SinkError> {
        match self {
            Self::Console(sink) => sink.write(record).await,
            Self::File(sink) => sink.write(record).await,
            Self::Database(sink) => sink.write(record).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Console(sink) => sink.name(),
            Self::File(sink) => sink.name(),
            Self::Database(sink) => sink.name(),
        }
    }
}

/// Prints every record to stdout before handing it to the wrapped sink.
/// Console failures never affect the wrapped write.
pub struct Echo<S> {
    inner: S,
    console: ConsoleSink,
}

impl<S: RecordSink> Echo<S> {
    pub fn new(inner: S, console: ConsoleSink) -> Self {
        Self { inner, console }
    }
}

#[async_trait]
impl<S: RecordSink> RecordSink for Echo<S> {
    async fn write(&self, record: &DnsRecord) -> Result<(), SinkError> {
        if let Err(e) = self.console.write(record).await {
            error!("Failed to print record: {e}");
        }
        self.inner.write(record).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Open the configured sink. Any error here is fatal to the process.
pub async fn open_output(settings: &Settings) -> Result<Arc<dyn RecordSink>, SinkError> {
    let sink = OutputSink::open(&settings.output, settings.sink_policy.retries).await?;
    if settings.echo_stdout {
        Ok(Arc::new(Echo::new(sink, ConsoleSink::stdout())))
    } else {
        Ok(Arc::new(sink))
    }
}

/// One record as a newline-terminated JSON object.
pub fn encode_line(record: &DnsRecord) -> Result<Vec<u8>, SinkError> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}
