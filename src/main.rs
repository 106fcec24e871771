use anyhow::{Context, Result};
use clap::Parser;
use dns_traffic::cli::{Args, Command, RunArgs};
use dns_traffic::config::Settings;
use dns_traffic::output::open_output;
use dns_traffic::pcap::{LiveCapture, default_interface, ensure_interface, list_interfaces};
use dns_traffic::pipeline;
use dns_traffic::shutdown::Shutdown;
use log::{error, info};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let result = match args.command {
        Command::Interfaces => print_interfaces(),
        Command::Run(run_args) => run(run_args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_interfaces() -> Result<()> {
    let interfaces = list_interfaces()?;
    println!("Available network interfaces:");
    for device in interfaces {
        let status = if device.flags.is_up() { "UP" } else { "DOWN" };
        let running = if device.flags.is_running() {
            "RUNNING"
        } else {
            ""
        };
        let loopback = if device.flags.is_loopback() {
            "LOOPBACK"
        } else {
            ""
        };

        println!("  {} [{}] {} {}", device.name, status, running, loopback);

        if let Some(desc) = device.desc {
            println!("    Description: {desc}");
        }
    }
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let interface = match &args.interface {
        Some(name) => {
            ensure_interface(name)?;
            name.clone()
        }
        None => default_interface()?,
    };
    info!("Using interface: {interface}");

    let settings = Settings::from_args(&args, interface)?;

    let sink = open_output(&settings)
        .await
        .context("failed to initialize output")?;
    let source = LiveCapture::open(&settings.capture)?;

    let shutdown = Shutdown::new();
    let signals = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = shutdown.listen_for_signals().await {
                error!("Failed to install signal handlers: {e}");
            }
        }
    });

    let summary = pipeline::run(
        source,
        sink,
        &settings.dispatch,
        settings.sink_policy.on_error,
        shutdown,
    )
    .await?;

    signals.abort();
    if summary.dropped > 0 {
        info!("{} packets were dropped under backpressure", summary.dropped);
    }
    info!("Exit.");
    Ok(())
}
