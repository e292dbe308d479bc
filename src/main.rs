//! video-insights: YouTube analytics and content agents over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use video_insights::{router, AppConfig, AppState};

#[derive(Parser)]
#[command(name = "video-insights")]
#[command(about = "YouTube analytics, content and critique agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// TOML config file
        #[arg(long, env = "VIDEO_INSIGHTS_CONFIG")]
        config: Option<PathBuf>,

        /// Overrides `server.host`
        #[arg(long)]
        host: Option<String>,

        /// Overrides `server.port`
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load and validate the configuration, then print it
    CheckConfig {
        #[arg(long, env = "VIDEO_INSIGHTS_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config, host, port } => {
            let mut config = AppConfig::load(config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            serve(config).await
        },
        Commands::CheckConfig { config } => {
            let mut config = AppConfig::load(config.as_deref())?;
            if config.youtube.api_key.is_some() {
                config.youtube.api_key = Some("<redacted>".to_string());
            }
            println!("{config:#?}");
            Ok(())
        },
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let addr = config.bind_address();
    let janitor_interval = config.tasks.janitor_interval();
    let max_age = config.tasks.cleanup_max_age();

    let state = Arc::new(AppState::from_config(config)?);
    let janitor = janitor_interval.map(|interval| {
        info!(
            interval_secs = interval.as_secs(),
            max_age_secs = max_age.as_secs(),
            "starting task janitor"
        );
        state.scheduler.spawn_janitor(interval, max_age)
    });

    let listener = TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    video_insights::server::serve(listener, router(Arc::clone(&state)), shutdown_signal()).await?;

    if let Some(handle) = janitor {
        handle.abort();
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
