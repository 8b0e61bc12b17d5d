//! Audio Player (cantor-ap) - Main entry point
//!
//! Serves the control WebSocket on `/ws`, an SSE monitor stream on
//! `/events`, and `/health` + `/status`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cantor_ap::api::{self, AppContext};
use cantor_ap::config::{Config, ConsoleMode, DriverKind};
use cantor_ap::console::{MixingConsole, MockConsole, X32Console};
use cantor_ap::device::driver::AudioDriver;
use cantor_ap::device::SimulatedDriver;
use cantor_common::config::{load_config, resolve_config_path};

/// Command-line arguments for cantor-ap
#[derive(Parser, Debug)]
#[command(name = "cantor-ap")]
#[command(about = "Remote playback and console controller")]
#[command(version)]
struct Args {
    /// Port to listen on [default: 3000]
    #[arg(short, long, env = "CANTOR_PORT")]
    port: Option<u16>,

    /// Configuration file (falls back to CANTOR_CONFIG, then the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mixing console backend
    #[arg(long, value_enum, env = "CANTOR_CONSOLE_MODE")]
    console: Option<ConsoleMode>,

    /// Audio driver backend
    #[arg(long, value_enum, env = "CANTOR_DRIVER")]
    driver: Option<DriverKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cantor_ap=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting cantor-ap v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), "CANTOR_CONFIG");
    let mut config: Config =
        load_config(config_path.as_deref()).context("Failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(mode) = args.console {
        config.console.mode = mode;
    }
    if let Some(driver) = args.driver {
        config.device.driver = driver;
    }
    config.validate().context("Invalid configuration")?;

    let driver = open_driver(&config).await?;
    let console = open_console(&config).await?;

    let ctx = AppContext::build(&config, driver, console).await;
    info!(
        "Player initialized: track {}, volume {}, privileged mode {:?}",
        config.player.initial_track, config.player.initial_volume, config.lock.privileged_mode
    );

    api::run(ctx, config.server.bind_addr(), shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn open_driver(config: &Config) -> Result<Arc<dyn AudioDriver>> {
    match config.device.driver {
        DriverKind::Simulated => {
            info!("Using simulated audio driver");
            Ok(Arc::new(SimulatedDriver::new()))
        }
        #[cfg(unix)]
        DriverKind::Mpv => {
            let driver = cantor_ap::device::mpv::MpvIpcDriver::connect(&config.device.mpv_socket)
                .await
                .context("Failed to connect to mpv")?;
            Ok(Arc::new(driver))
        }
        #[cfg(not(unix))]
        DriverKind::Mpv => anyhow::bail!("mpv driver requires a unix platform"),
    }
}

async fn open_console(config: &Config) -> Result<Arc<dyn MixingConsole>> {
    match config.console.mode {
        ConsoleMode::Mock => {
            info!("Using mock mixing console");
            Ok(Arc::new(MockConsole::new()))
        }
        ConsoleMode::X32 => {
            let console = X32Console::connect(&config.console.x32_address)
                .await
                .context("Failed to set up X32 console")?;
            Ok(Arc::new(console))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
