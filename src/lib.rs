//! Passive DNS response logger.
//!
//! Packets are read from a live pcap handle on a blocking thread, queued, and
//! each one is decoded and written by its own task. Only DNS responses become
//! records; everything else is dropped quietly.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod dns;
pub mod error;
pub mod output;
pub mod pcap;
pub mod pipeline;
pub mod shutdown;
