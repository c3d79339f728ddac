mod config;
mod dto;
mod handlers;
mod http_error;
mod provider;
mod router;
mod state;

use std::path::PathBuf;

use config::{ConfigError, ServerConfig};
use state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("memory-server error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let config_path = parse_config_flag();
    let config = ServerConfig::load(config_path.as_deref())?;
    info!(bind_addr = %config.bind_addr, storage_root = ?config.storage_root, "loaded configuration");

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config);
    let app = router::build(state);

    let listener = TcpListener::bind(&bind_addr).await.unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));
    info!(%bind_addr, "memory-server listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(%e, "server error");
    }
    Ok(())
}

fn parse_config_flag() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        if flag == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    let default_path = PathBuf::from("memory.toml");
    default_path.exists().then_some(default_path)
}
