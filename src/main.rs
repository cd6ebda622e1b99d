//! front-paneld
//!
//! Front panel daemon for a multi-slot server chassis: shares the debug
//! card, USB port, reset and power buttons across slots via the hand switch,
//! and drives the heartbeat and per-slot LEDs.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use front_paneld::{
    spawn_front_panel, Config, FilePlatform, KvStore, PidLock, SharedClock, SharedPlatform,
    SystemClock,
};

/// front-paneld - Front panel controller for multi-slot server chassis
#[derive(Parser, Debug)]
#[command(name = "front-paneld")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("front-paneld starting...");

    let config_path = args.config.unwrap_or_else(Config::default_config_path);
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_path.display(), "Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    // Held for the whole process lifetime; a second instance stops here
    let _lock = match PidLock::acquire(&config.pid_file) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let kv = KvStore::open(&config.kv_store_dir)?;
    let platform: SharedPlatform = Arc::new(FilePlatform::new(&config.platform_root, kv));
    let clock: SharedClock = Arc::new(SystemClock);

    let mut tasks = spawn_front_panel(platform, clock, &config);
    let mut sigterm = signal(SignalKind::terminate())?;

    info!("front-paneld ready");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, exiting...");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received, exiting...");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(name) => error!(task = name, "Task exited unexpectedly"),
                Err(e) => error!("Task panicked: {:?}", e),
            }
            tasks.abort_all();
            return Err("front panel task terminated".into());
        }
    }

    tasks.abort_all();
    Ok(())
}
