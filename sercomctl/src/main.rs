//! sercom console
//!
//! Interactive front end for the serial handler: pick a port, pick a baud
//! rate, then type lines to send while received data is echoed back.

mod console;
mod input;
mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use sercom_core::{default_config_path, StaticConfig};
use sercom_hardware::SerialHandler;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::input::InputLines;

/// sercom interactive serial console
#[derive(Parser, Debug)]
#[command(name = "sercomctl")]
#[command(version, about = "Interactive serial console", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device to open (skips the selection prompt)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (skips the baud rate prompt)
    #[arg(short, long)]
    baud: Option<u32>,

    /// List serial ports that can be opened and exit
    #[arg(short, long)]
    list: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    // Determine config path: CLI flag > env var > default
    let config_path = args.config.clone().unwrap_or_else(|| {
        std::env::var("SERCOM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path())
    });
    info!("Configuration file: {}", config_path.display());

    let config = StaticConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    if args.list {
        let ports = SerialHandler::available_ports()?;
        prompt::print_ports(&mut io::stdout(), &ports)?;
        return Ok(());
    }

    // One reader for the prompts and the console, so no typed-ahead line is lost.
    let mut input = InputLines::stdin()?;
    let mut out = io::stdout();

    let mut connection = config.connection.clone();
    let port = match args.port.or(connection.port.take()) {
        Some(port) => port,
        None => choose_port(&mut input, &mut out).await?,
    };
    let baud_rate = match args.baud {
        Some(baud) => baud,
        None => prompt::select_baud_rate(&mut input, &mut out, connection.baud_rate).await?,
    };
    connection.port = Some(port);
    connection.baud_rate = baud_rate;

    let handler = Arc::new(SerialHandler::with_connector(
        connection,
        config.handler.clone(),
        Arc::new(sercom_hardware::SystemConnector),
    )?);
    handler.start()?;

    println!(
        "{} {} @ {} baud",
        "Connected to".green(),
        handler.port().unwrap_or_default(),
        handler.connection_config().baud_rate
    );

    let session = console::run(handler.clone(), &mut input, &config.console).await;

    // stop() joins the worker thread; keep it off the async executor.
    let stopper = handler.clone();
    tokio::task::spawn_blocking(move || stopper.stop()).await??;
    info!("Session closed");

    session
}

async fn choose_port<W: io::Write>(input: &mut InputLines, out: &mut W) -> Result<String> {
    let mut ports = SerialHandler::available_ports()?;
    prompt::print_ports(out, &ports)?;
    let index = prompt::select_port(input, out, &ports).await?;
    Ok(ports.swap_remove(index))
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
