use anyhow::Result;
use clap::Parser;
use linkup_core::{AppConfig, AppState};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("linkup=info,tower_http=debug")),
        )
        .init();

    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;

    ensure_data_dirs(&config);

    let db = linkup_db::create_pool(&config.database.url, config.database.max_connections).await?;
    linkup_db::run_migrations(&db).await?;

    let state = AppState::new(
        db,
        AppConfig {
            jwt_secret: config.auth.jwt_secret.clone(),
            jwt_expiry_seconds: config.auth.jwt_expiry_seconds,
            database_url: config.database.url.clone(),
        },
    );

    let app = linkup_api::build_router()
        .merge(linkup_ws::gateway_router())
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!("Linkup server listening on {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    // Presence is ephemeral process state; drop every live channel so
    // connection tasks unwind before the pool closes.
    state.presence.clear();
    state.db.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal(state: AppState) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = state.shutdown.notified() => {
            tracing::info!("Shutdown requested, shutting down");
        }
    }
}

fn ensure_data_dirs(config: &config::Config) {
    // sqlite://data/linkup.db needs the data/ directory to exist.
    let url = config.database.url.trim();
    let Some(path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return;
    };
    if path.starts_with(':') {
        // e.g. sqlite::memory:
        return;
    }
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create database directory {:?}: {err}", parent);
            }
        }
    }
}
