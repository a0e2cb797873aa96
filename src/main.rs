//! # DIMSpec Explorer
//!
//! Serves the DIMSpec database explorer over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Serve ./data/dimspec_nist_pfas.sqlite (or dimspec_sample.sqlite) on :8501
//! dimspec-explorer
//!
//! # Another data directory, all interfaces, debug logging
//! dimspec-explorer --data-dir /srv/dimspec --host 0.0.0.0 -vv
//!
//! # Settings from a file; flags still win
//! dimspec-explorer --config dimspec.toml --port 9000
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::net::SocketAddr;
use std::path::PathBuf;

use dimspec::config::Config;
use dimspec::database::Database;
use dimspec::web::{serve, AppState};

/// DIMSpec Explorer - browse PFAS compounds and mass spectra
#[derive(Parser)]
#[command(name = "dimspec-explorer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TCP port to listen on [default: 8501]
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// Directory holding the database file [default: data]
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Load the config file, if any, and apply flag overrides
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.database.data_dir = dir.clone();
        }
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let db = Database::connect(&config.candidate_paths())
        .context("Could not open the DIMSpec database")?;
    info!(
        "Opened {} ({} tables and views)",
        db.path().display(),
        db.list_tables().len()
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
    runtime
        .block_on(serve(AppState::new(db, config), addr))
        .with_context(|| format!("Server on {} failed", addr))?;
    Ok(())
}
