//! mm-importer CLI - standalone server for the Mattermost import API

use clap::Parser;
use mm_importer::{Config, Core};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mm-importer")]
#[command(author = "mm-importer contributors")]
#[command(version)]
#[command(about = "mm-importer - REST bridge for importing Slack content into Mattermost", long_about = None)]
struct Args {
    /// Path to configuration file [default: ~/.mm-importer/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initialize a new config file with defaults
    #[arg(long)]
    init: bool,

    /// Start even if the Mattermost token is not a system admin
    #[arg(long)]
    skip_verify: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mm_importer={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = args
        .config
        .as_deref()
        .map(mm_importer::config::expand_path)
        .unwrap_or_else(Config::default_path);

    // Handle --init flag
    if args.init {
        if config_path.exists() {
            tracing::warn!("Config file already exists: {}", config_path.display());
            return Ok(());
        }
        Config::create_default(&config_path)?;
        tracing::info!("Created default config at: {}", config_path.display());
        return Ok(());
    }

    // Load configuration
    let mut config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        tracing::warn!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
        Config::default()
    };

    // Environment first, CLI flags last
    config.apply_env_overrides();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    let core = Core::new(config)?;

    if !args.skip_verify {
        if let Err(e) = core.verify_host().await {
            tracing::error!("Mattermost host check failed: {}", e);
            return Err(e.into());
        }
    }

    // Start API server (blocks until shutdown)
    core.start_api_server().await?;

    Ok(())
}
