use crate::config::{Backpressure, ErrorPolicy};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dns-traffic", version)]
#[command(about = "Log DNS responses seen on a network interface", long_about = None)]
pub struct Args {
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture DNS responses and write them to the selected output
    Run(RunArgs),
    /// List network interfaces available for capture
    Interfaces,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Network interface (defaults to the first one found)
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Bytes captured per packet
    #[arg(short, long, default_value_t = 1600)]
    pub snapshot: i32,

    /// Enable promiscuous mode for the interface
    #[arg(short, long)]
    pub promiscuous: bool,

    /// Capture read timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    pub timeout: u64,

    /// Append JSON lines to a file named PREFIX.YYYY-MM-DD
    #[arg(short, long, value_name = "PREFIX")]
    pub output: Option<String>,

    /// SQLite connection URI, e.g. sqlite:dns.db
    #[arg(short = 'm', long, value_name = "URI")]
    pub database: Option<String>,

    /// Print records on stdout
    #[arg(short = 'd', long)]
    pub stdout: bool,

    /// Packets buffered between capture and dispatch
    #[arg(long, default_value_t = 4096)]
    pub queue_depth: usize,

    /// Upper bound on concurrently running decode/write tasks
    #[arg(long, default_value_t = 256)]
    pub max_in_flight: usize,

    /// What to do with packets when the queue is full
    #[arg(long, value_enum, default_value_t = Backpressure::Block)]
    pub backpressure: Backpressure,

    /// Reaction to a failed write [default: fatal for --database, log otherwise]
    #[arg(long, value_enum)]
    pub sink_errors: Option<ErrorPolicy>,

    /// Retries for a failed database insert
    #[arg(long, default_value_t = 0)]
    pub db_retries: u32,
}
