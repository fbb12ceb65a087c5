// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Voxcomm: send a G-code file to a networked 3D printer.
//
// Entry point. Parses arguments, initialises logging and the shutdown
// signal, finds the printer (by address or discovery), then runs one upload
// session.

mod progress;
mod prompt;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use voxcomm_core::config::ClientConfig;
use voxcomm_core::error::VoxcommError;
use voxcomm_core::human_errors::humanize_error;
use voxcomm_core::types::UploadFile;
use voxcomm_print::discovery::{self, PrinterDiscovery};
use voxcomm_print::{Connection, Shutdown, ShutdownTrigger, TransferEngine};

use progress::UploadProgress;
use prompt::{Confirm, LineReader};

#[derive(Parser)]
#[command(name = "voxcomm", version)]
#[command(about = "Send a G-code file to a networked 3D printer", long_about = None)]
struct Cli {
    /// G-code file to upload
    file: PathBuf,
    /// Printer address; searched for on the local network when omitted
    printer: Option<String>,
    /// Pick this entry from the discovered list instead of asking
    #[arg(long, value_name = "N")]
    index: Option<usize>,
    /// Start printing after upload without asking
    #[arg(long, conflicts_with = "no_print")]
    print: bool,
    /// Upload only; never start printing
    #[arg(long)]
    no_print: bool,
    /// Config file (default: $XDG_CONFIG_HOME/voxcomm/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let (trigger, shutdown) = voxcomm_print::shutdown::channel();
    tokio::spawn(watch_signals(trigger));

    match run(cli, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, shutdown: Shutdown) -> anyhow::Result<()> {
    let config = ClientConfig::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    let file = load_file(&cli.file)?;
    tracing::debug!(file = file.name(), bytes = file.len(), "file loaded");

    let mut input = LineReader::stdin();
    let addr = match &cli.printer {
        Some(host) => resolve(host, config.control_port).await?,
        None => {
            let ip = discover(&config, cli.index, &mut input, shutdown.clone()).await?;
            SocketAddr::from((ip, config.control_port))
        }
    };

    println!("Connecting to \"{addr}\"...");
    let conn = Connection::connect(
        addr,
        config.queue_depth,
        config.disconnect_grace(),
        shutdown.clone(),
    )
    .await?;
    println!("Connected to printer!");

    let mut confirm = match (cli.print, cli.no_print) {
        (true, _) => Confirm::Fixed(true),
        (_, true) => Confirm::Fixed(false),
        _ => Confirm::Ask(input),
    };
    let mut progress = UploadProgress::new("Sending data to printer...");

    let report = TransferEngine::new(conn, config, shutdown)
        .run(&file, &mut progress, &mut confirm)
        .await?;

    println!("File saved.");
    if report.print_started {
        println!("Printing...");
    }
    println!("Disconnected from printer.");
    Ok(())
}

/// Read the source file. Any failure here is a usage error.
fn load_file(path: &Path) -> Result<UploadFile, VoxcommError> {
    let data = std::fs::read(path)
        .map_err(|e| VoxcommError::Usage(format!("cannot read {}: {e}", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| VoxcommError::Usage(format!("{} is not a file", path.display())))?;
    UploadFile::new(name, data)
}

/// Turn a host name or IP literal into the control channel address.
async fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    let mut addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        VoxcommError::Usage(format!("cannot resolve printer address {host}: {e}"))
    })?;
    let addr = addrs
        .next()
        .ok_or_else(|| VoxcommError::Usage(format!("printer address {host} did not resolve")))?;
    Ok(addr)
}

/// Search the network and let the user pick a printer.
async fn discover(
    config: &ClientConfig,
    index: Option<usize>,
    input: &mut LineReader,
    shutdown: Shutdown,
) -> anyhow::Result<std::net::Ipv4Addr> {
    println!("Searching for printer on the network...");
    let found = PrinterDiscovery::new(config.discovery.clone())
        .discover(shutdown.clone(), |_, printers| prompt::show_candidates(printers))
        .await;
    println!();
    let printers = found?;

    let chosen = match index {
        Some(i) => discovery::select(&printers, i)?.clone(),
        None => prompt::choose_printer(&printers, input, shutdown).await?,
    };
    tracing::info!(printer = %chosen, "printer selected");
    Ok(chosen.addr)
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<VoxcommError>() {
        Some(e) => {
            let human = humanize_error(e);
            eprintln!("{}", human.message);
            eprintln!("  {}", human.suggestion);
            tracing::debug!(error = %e, severity = ?human.severity, "fatal error");
        }
        None => eprintln!("error: {err:#}"),
    }
}

/// Fire the shutdown trigger on Ctrl-C or SIGTERM.
async fn watch_signals(trigger: ShutdownTrigger) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("interrupt received, shutting down");
    trigger.trigger();
}
