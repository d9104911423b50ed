//! tally - statistics query daemon
//!
//! Loads config, registers the configured services, and answers JSON
//! queries on a ZMQ REP socket until interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tally::{telemetry, Daemon};
use tallyconf::TallyConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Statistics query daemon")]
#[command(version)]
struct Args {
    /// Config file, loaded after the system and user configs
    #[arg(long)]
    config: Option<PathBuf>,

    /// ZMQ REP endpoint to bind (overrides config)
    #[arg(long)]
    bind: Option<String>,

    /// Per-provider deadline in milliseconds, 0 to wait forever (overrides config)
    #[arg(long)]
    provider_timeout_ms: Option<u64>,

    /// Print the effective config as TOML and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, sources) = TallyConfig::load_with_sources_from(args.config.as_deref())
        .context("failed to load config")?;

    if let Some(bind) = args.bind {
        config.infra.bind.stats_endpoint = bind;
    }
    if let Some(timeout_ms) = args.provider_timeout_ms {
        config.infra.statistics.provider_timeout_ms = timeout_ms;
    }

    if args.show_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    telemetry::init(&config.infra.telemetry.log_level)?;

    info!("tally {} starting", env!("CARGO_PKG_VERSION"));
    for file in &sources.files {
        info!("  config: {}", file.display());
    }
    for var in &sources.env_overrides {
        info!("  env override: {}", var);
    }

    if !config.infra.statistics.enabled {
        info!("statistics disabled, not binding");
        return Ok(());
    }

    let daemon = Daemon::new(config)?;
    let server = daemon.bind().await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    let shutdown_tx_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx_signal.send(());
    });

    server.run(shutdown_rx).await?;

    info!("tally shutdown complete");
    Ok(())
}
