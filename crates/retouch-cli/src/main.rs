mod gateway;
mod settings;

use clap::Parser;
use retouch_core::AppBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "retouch")]
#[command(about = "Image retouch task service", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "retouch.yaml")]
    config: String,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Number of workers
    #[arg(long)]
    workers: Option<usize>,

    /// Reject submissions once this many tasks are queued
    #[arg(long)]
    queue_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut settings = if std::path::Path::new(&args.config).exists() {
        Settings::from_file(&args.config)?
    } else {
        tracing::warn!(path = %args.config, "config file not found, using defaults");
        Settings::default()
    };

    // Override with CLI args
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(workers) = args.workers {
        settings.service.workers = workers;
    }
    if args.queue_capacity.is_some() {
        settings.service.queue_capacity = args.queue_capacity;
    }

    tracing::info!("Starting retouch with config: {:?}", settings);

    let running = AppBuilder::new(settings.service.clone()).build()?.start();
    let app = gateway::router(running.manager().clone(), settings.server.max_body_bytes);

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    running.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
