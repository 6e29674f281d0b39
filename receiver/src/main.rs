mod config;
mod delivery;
mod errors;
mod ingest;
mod metrics;
mod model;
mod producer;
mod queue;
mod rest;
mod validate;

use anyhow::Context;
use config::{ProducerConfig, ServerConfig};
use producer::BrokerPublisher;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let dotenv_loaded = match config::load_dotenv() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let server_config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_logging(server_config.json_logs);
    if dotenv_loaded {
        info!("Loaded environment from .env");
    }

    if let Err(e) = run(server_config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(server_config: ServerConfig) -> anyhow::Result<()> {
    info!("Starting edge receiver");

    let producer_config =
        ProducerConfig::from_env().context("Failed to read configuration from environment")?;

    info!("Kafka brokers: {}", producer_config.brokers.join(","));
    info!("Ingress topic: {}", server_config.ingress_topic);
    info!("HTTP server: {}", server_config.http_addr);

    metrics::init_metrics().context("Failed to register metrics")?;

    // Connect and self-test before accepting any traffic
    let publisher = BrokerPublisher::connect(&producer_config)
        .await
        .context("Failed to initialize Kafka producer")?;

    let (tx, rx) = queue::delivery_queue(server_config.queue_capacity);
    info!("Queue capacity: {}", tx.capacity());

    let topic = server_config.ingress_topic.clone();
    let delivery_handle = tokio::spawn(delivery::run_delivery(rx, publisher, topic));

    let app = rest::create_router(tx, server_config.request_timeout);

    let listener = tokio::net::TcpListener::bind(server_config.http_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_config.http_addr))?;

    info!("HTTP server listening on {}", server_config.http_addr);

    // The router owns the only queue sender; once the server returns it is
    // dropped, which closes the queue and lets the delivery worker finish.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped, waiting for delivery worker");
    if let Err(e) = delivery_handle.await {
        error!("Delivery worker terminated abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
