use crate::cli::RunArgs;
use crate::error::ConfigError;
use clap::ValueEnum;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Parameters for opening the live capture. Fixed once capture starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub interface: String,
    pub snaplen: i32,
    pub promiscuous: bool,
    pub read_timeout: Duration,
}

/// Where records go. Exactly one is chosen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Append NDJSON to `<prefix>.<YYYY-MM-DD>`
    File { prefix: String },
    /// Insert rows through a SQLite connection URI
    Database { uri: String },
    Console,
}

impl OutputTarget {
    /// A file prefix wins over a database URI; with neither, records go to
    /// stdout. Empty strings count as absent.
    pub fn resolve(prefix: Option<&str>, database: Option<&str>) -> Self {
        match (
            prefix.filter(|p| !p.is_empty()),
            database.filter(|d| !d.is_empty()),
        ) {
            (Some(prefix), _) => Self::File {
                prefix: prefix.to_string(),
            },
            (None, Some(uri)) => Self::Database {
                uri: uri.to_string(),
            },
            (None, None) => Self::Console,
        }
    }
}

/// What the capture thread does when the dispatch queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backpressure {
    /// Stop reading until the queue has room
    Block,
    /// Discard the packet and count it
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub queue_depth: usize,
    pub max_in_flight: usize,
    pub backpressure: Backpressure,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_depth: 4096,
            max_in_flight: 256,
            backpressure: Backpressure::Block,
        }
    }
}

/// Reaction to a record that could not be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ErrorPolicy {
    /// Log and keep capturing
    Log,
    /// Stop capturing, drain, and exit non-zero
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkPolicy {
    pub on_error: ErrorPolicy,
    /// Extra attempts before a database write counts as failed
    pub retries: u32,
}

impl SinkPolicy {
    /// Database failures are fatal unless overridden; console and file
    /// failures are only logged.
    pub fn for_target(target: &OutputTarget, on_error: Option<ErrorPolicy>, retries: u32) -> Self {
        let default = match target {
            OutputTarget::Database { .. } => ErrorPolicy::Fatal,
            OutputTarget::File { .. } | OutputTarget::Console => ErrorPolicy::Log,
        };
        Self {
            on_error: on_error.unwrap_or(default),
            retries,
        }
    }
}

/// Validated configuration for one `run`, built once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub capture: CaptureConfig,
    pub output: OutputTarget,
    /// Also print records to stdout when writing to a file or database
    pub echo_stdout: bool,
    pub dispatch: DispatchConfig,
    pub sink_policy: SinkPolicy,
}

impl Settings {
    /// `interface` is the already-resolved device name.
    pub fn from_args(args: &RunArgs, interface: String) -> Result<Self, ConfigError> {
        if args.snapshot <= 0 {
            return Err(ConfigError::Zero { name: "snapshot" });
        }
        if args.timeout == 0 {
            return Err(ConfigError::Zero { name: "timeout" });
        }
        if args.queue_depth == 0 {
            return Err(ConfigError::Zero {
                name: "queue-depth",
            });
        }
        if args.max_in_flight == 0 {
            return Err(ConfigError::Zero {
                name: "max-in-flight",
            });
        }
        // Both the queue and the in-flight limit are backed by semaphores
        for (name, value) in [
            ("queue-depth", args.queue_depth),
            ("max-in-flight", args.max_in_flight),
        ] {
            if value > Semaphore::MAX_PERMITS {
                return Err(ConfigError::TooLarge {
                    name,
                    max: Semaphore::MAX_PERMITS,
                });
            }
        }

        let output = OutputTarget::resolve(args.output.as_deref(), args.database.as_deref());
        let echo_stdout = args.stdout && output != OutputTarget::Console;
        let sink_policy = SinkPolicy::for_target(&output, args.sink_errors, args.db_retries);

        Ok(Self {
            capture: CaptureConfig {
                interface,
                snaplen: args.snapshot,
                promiscuous: args.promiscuous,
                read_timeout: Duration::from_secs(args.timeout),
            },
            output,
            echo_stdout,
            dispatch: DispatchConfig {
                queue_depth: args.queue_depth,
                max_in_flight: args.max_in_flight,
                backpressure: args.backpressure,
            },
            sink_policy,
        })
    }
}
