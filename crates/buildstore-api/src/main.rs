//! buildstore API Server

use buildstore_api::{AppState, routes};
use buildstore_config::{LogFormat, LoggingConfig, StorageConfig, SystemConfig, load_system_config};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "buildstore-server")]
#[command(about = "Build resource storage server", long_about = None)]
struct Args {
    /// Path to a KDL system configuration file
    #[arg(long, env = "BUILDSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration file
    #[arg(long, env = "BUILDSTORE_LISTEN")]
    listen: Option<SocketAddr>,

    /// PostgreSQL URL; selects the PostgreSQL registries
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_system_config(path)?,
        None => SystemConfig::default(),
    };
    apply_overrides(&args, &mut config);

    init_tracing(&config.logging);
    if let Some(path) = &args.config {
        info!(path = %path.display(), "Loaded configuration");
    }

    let state = AppState::from_config(&config).await?;

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let addr = config.server.listen;
    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Apply command-line overrides. `DATABASE_URL` only selects storage when no
/// configuration file is given; a file's `storage` node always wins.
fn apply_overrides(args: &Args, config: &mut SystemConfig) {
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let (None, Some(url)) = (&args.config, &args.database_url) {
        config.storage = StorageConfig::postgres(url.as_str());
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
