use crate::dns::DnsRecord;
use crate::error::SinkError;
use crate::output::RecordSink;
use async_trait::async_trait;
use log::{info, warn};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub const TABLE: &str = "traffic_data";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// One row per record in a fixed SQLite table. Questions and answers are
/// stored as JSON arrays.
pub struct DatabaseSink {
    pool: SqlitePool,
    retries: u32,
}

impl DatabaseSink {
    pub async fn connect(uri: &str, retries: u32) -> Result<Self, SinkError> {
        let options = SqliteConnectOptions::from_str(uri)?.create_if_missing(true);

        // Every connection to an in-memory database gets its own empty copy,
        // so those pools hold exactly one connection for the whole run
        let pool_options = if is_in_memory(uri) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = tokio::time::timeout(CONNECT_TIMEOUT, pool_options.connect_with(options))
        .await
        .map_err(|_| SinkError::ConnectTimeout(CONNECT_TIMEOUT))??;

        info!("Connected to the database");
        Self::with_pool(pool, retries).await
    }

    /// Wrap an existing pool, creating the table if needed.
    pub async fn with_pool(pool: SqlitePool, retries: u32) -> Result<Self, SinkError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                source_ip TEXT,
                destination_ip TEXT,
                source_port INTEGER NOT NULL,
                destination_port INTEGER NOT NULL,
                response_code TEXT NOT NULL,
                opcode TEXT NOT NULL,
                questions TEXT NOT NULL,
                answers TEXT NOT NULL
            )"
        ))
        .execute(&pool)
        .await?;

        Ok(Self { pool, retries })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert(
        &self,
        record: &DnsRecord,
        questions: &str,
        answers: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "INSERT INTO {TABLE} \
             (timestamp, source_ip, destination_ip, source_port, destination_port, \
              response_code, opcode, questions, answers) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(record.timestamp.to_rfc3339())
        .bind(record.source_ip.map(|ip| ip.to_string()))
        .bind(record.destination_ip.map(|ip| ip.to_string()))
        .bind(i64::from(record.source_port))
        .bind(i64::from(record.destination_port))
        .bind(record.response_code.as_str())
        .bind(record.opcode.as_str())
        .bind(questions)
        .bind(answers)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn is_in_memory(uri: &str) -> bool {
    uri.contains(":memory:") || uri.contains("mode=memory")
}

#[async_trait]
impl RecordSink for DatabaseSink {
    async fn write(&self, record: &DnsRecord) -> Result<(), SinkError> {
        let questions = serde_json::to_string(&record.questions)?;
        let answers = serde_json::to_string(&record.answers)?;

        let mut attempt = 0;
        loop {
            match self.insert(record, &questions, &answers).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("Insert failed (attempt {attempt}/{}): {e}", self.retries + 1);
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn name(&self) -> &'static str {
        "database"
    }
}
