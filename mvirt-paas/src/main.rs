use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mvirt_paas::bootstrap::load_templates;
use mvirt_paas::rest::{AppState, create_router};
use mvirt_paas::{Config, MemoryStore, Services, create_audit_logger};

#[derive(Parser)]
#[command(name = "mvirt-paas")]
#[command(about = "mvirt PaaS - template-rendered VMs and Kubernetes clusters")]
struct Args {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Listen address for REST API (overrides server.listen)
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mvirt_paas=info".parse()?))
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config)?;
    let listen = args.listen.unwrap_or_else(|| config.server.listen.clone());

    info!("Starting mvirt-paas - REST: {}", listen);

    // In-memory repository shared by all services
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store);

    let loaded = load_templates(&config.templates, &services.templates)?;
    info!("Bootstrapped {} templates", loaded.len());

    let audit = create_audit_logger(config.audit);
    let app_state = Arc::new(AppState { services, audit });
    let router = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("REST API listening on {}", listen);

    // Create shutdown signal channel
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    let rest_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await
    });

    // Wait for shutdown signal
    let ctrl_c = signal::ctrl_c();
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }

    let _ = shutdown_tx.send(true);
    rest_handle.await??;

    info!("Shutdown complete");
    Ok(())
}
