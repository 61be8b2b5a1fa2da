mod aggregate;
mod api;
mod config;
mod engine;
mod error;
mod gate;
mod imaging;
mod lang;
mod models;
mod pipeline;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{create_router, AppState};
use crate::config::{Config, EnginePolicy};
use crate::engine::{EngineRegistry, TesseractFactory};
use crate::gate::ConcurrencyGate;

#[derive(Parser)]
#[command(name = "lector")]
#[command(about = "Self-hostable OCR recognition service")]
struct Args {
    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured engine lifecycle policy
    #[arg(long, value_enum)]
    policy: Option<EnginePolicy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lector=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(policy) = args.policy {
        config.ocr.policy = policy;
    }

    tracing::info!(
        policy = %config.ocr.policy,
        max_concurrency = config.ocr.max_concurrency,
        default_language = %config.ocr.default_language,
        "Initializing engine registry..."
    );
    if config.ocr.policy == EnginePolicy::Ephemeral {
        tracing::info!("Ephemeral policy active - engines are rebuilt on every request");
    }

    let factory = Arc::new(TesseractFactory::new(config.ocr.data_dir.clone()));
    let registry = Arc::new(EngineRegistry::new(config.ocr.policy, factory));
    let gate = ConcurrencyGate::new(config.ocr.max_concurrency);

    let state = AppState::new(config.clone(), registry, gate);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Lector starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}
