//! Companion CLI - boots the companion core and reports the startup state.
//!
//! Prints a JSON summary on stdout. Logs go to stderr.

mod report;

use anyhow::{bail, Result};
use clap::Parser;
use companion_core::config::{AppInfo, ConnectivityDefaults, PathsConfig};
use companion_core::models::InitPhase;
use companion_core::network::{FlagProbe, HttpProbe, StatusBanner};
use companion_core::AppInitializer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::report::StartupReport;

#[derive(Parser, Debug)]
#[command(name = "companion")]
#[command(about = "Boot the Asistente Senior companion core and report its state")]
struct Args {
    /// Data directory holding the config cache
    /// (defaults to the platform data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Base URL of the config service
    #[arg(long)]
    endpoint: Option<String>,

    /// URL used to probe connectivity (repeatable)
    #[arg(long = "probe-url")]
    probe_urls: Vec<String>,

    /// Treat the device as offline instead of probing
    #[arg(long)]
    offline_flag: bool,

    /// Keep running and log connectivity changes until Ctrl-C
    #[arg(short, long)]
    watch: bool,

    /// Force a remote config refresh after startup
    #[arg(long)]
    refresh: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(PathsConfig::DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(PathsConfig::DATA_DIR_NAME))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Starting {} companion", AppInfo::APP_NAME);

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    info!("Data directory: {}", data_dir.display());

    let mut builder = AppInitializer::builder(&data_dir);
    if let Some(endpoint) = args.endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    if args.offline_flag {
        builder = builder.with_probe(Arc::new(FlagProbe::new(false)));
    } else if !args.probe_urls.is_empty() {
        let probe = HttpProbe::with_urls(args.probe_urls, ConnectivityDefaults::PROBE_TIMEOUT)?;
        builder = builder.with_probe(Arc::new(probe));
    }

    let app = builder.build()?;
    let state = app.start().await;

    if args.refresh && state.is_ready() {
        let config = app.bootstrap().refresh_config().await;
        info!("Config after refresh: version {}", config.app_version);
    }

    let report = StartupReport::collect(&app, &data_dir);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.watch && state.is_ready() {
        let _subscription = app.monitor().subscribe(|status| {
            match StatusBanner::for_status(status) {
                Some(banner) => warn!("{}: {}", banner.title, banner.detail),
                None => info!("Back online"),
            }
        });

        info!("Watching connectivity, press Ctrl-C to exit");
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received, exiting");
    }

    app.shutdown();

    if state.phase == InitPhase::Error {
        bail!(
            "startup failed: {}",
            state.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}
