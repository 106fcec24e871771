use crate::dns::DnsRecord;
use crate::error::SinkError;
use crate::output::{RecordSink, encode_line};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Append-only NDJSON file.
///
/// The file is named after the local date when it is opened and is kept for
/// the whole run; there is no rotation at midnight.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn file_name(prefix: &str, date: NaiveDate) -> PathBuf {
        PathBuf::from(format!("{prefix}.{}", date.format("%Y-%m-%d")))
    }

    pub async fn open(prefix: &str) -> Result<Self, SinkError> {
        Self::open_path(Self::file_name(prefix, Local::now().date_naive())).await
    }

    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o600);

        let file = options.open(&path).await?;
        info!("Opened file {}", path.display());

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl RecordSink for FileSink {
    async fn write(&self, record: &DnsRecord) -> Result<(), SinkError> {
        let line = encode_line(record)?;

        // Held until the bytes are flushed so lines from concurrent
        // writers never interleave
        let mut file = self.file.lock().await;
        write_line(&mut *file, &line, &self.path).await
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Write one whole line. A short write is reported, then the remainder is
/// written so the file never holds a partial record.
async fn write_line<W>(out: &mut W, line: &[u8], path: &Path) -> Result<(), SinkError>
where
    W: AsyncWrite + Unpin,
{
    let written = out.write(line).await?;
    if written != line.len() {
        warn!(
            "Short write to {}: {written} of {} bytes",
            path.display(),
            line.len()
        );
        out.write_all(&line[written..]).await?;
    }
    out.flush().await?;
    Ok(())
}
