//! Binary entrypoint for the kiosk console.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use kiosk_console::config::Configuration;
use kiosk_console::session::Sessions;
use kiosk_console::store::Store;
use kiosk_console::web;

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "kiosk-console", about = "Kiosk content management console")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive(format!("kiosk_console={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = if cli.config.exists() {
        Configuration::from_yaml_file(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "config file not found; using defaults");
        Configuration::default()
    };
    let mut cfg = cfg.validated().context("invalid configuration values")?;
    if let Some(bind) = cli.bind {
        cfg.bind_address = bind;
    }

    let store = Store::open(&cfg.data_file, cfg.log_capacity, &cfg.bootstrap_admin)
        .await
        .with_context(|| format!("opening data file {}", cfg.data_file.display()))?;

    let app = web::router(store, Sessions::new(), &cfg);

    let listener = TcpListener::bind(cfg.bind_address)
        .await
        .with_context(|| format!("binding {}", cfg.bind_address))?;
    info!(addr = %cfg.bind_address, "kiosk console listening");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
            cancel.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .context("console server failed")?;
    Ok(())
}
