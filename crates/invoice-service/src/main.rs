//! Invoice service entry point.
//!
//! Starts the HTTP API and the shipped-order consumer worker over the
//! same repository and broker.

use std::sync::Arc;

use broker::{BrokerConfig, InMemoryBroker, MessageBroker, RedisStreamsBroker};
use invoice_service::postgres::PostgresInvoiceRepository;
use invoice_service::{
    AppState, Config, InMemoryInvoiceRepository, InvoiceRepository, InvoiceService,
    LocalFileStorage, OrderShippedConsumer,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<R, B>(
    config: Config,
    repository: R,
    broker: B,
    storage: LocalFileStorage,
    metrics_handle: PrometheusHandle,
) where
    R: InvoiceRepository + Clone + 'static,
    B: MessageBroker + Clone + 'static,
{
    let consumer = OrderShippedConsumer::new(broker.clone(), InvoiceService::new(repository.clone()));
    tokio::spawn(async move {
        if let Err(e) = consumer.run().await {
            tracing::error!(error = %e, "shipped-order consumer terminated");
        }
    });

    let state = Arc::new(AppState {
        invoices: InvoiceService::new(repository),
        storage,
    });
    let app = invoice_service::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting invoice service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("invoice service shut down gracefully");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let config = Config::from_env();

    let storage = LocalFileStorage::new(config.upload_dir.clone());
    storage
        .ensure_dir()
        .await
        .expect("failed to create upload directory");

    match (config.database_url.clone(), config.broker_url.clone()) {
        (Some(database_url), Some(broker_url)) => {
            let repository = PostgresInvoiceRepository::connect(&database_url)
                .await
                .expect("failed to connect to database");
            repository
                .run_migrations()
                .await
                .expect("failed to run migrations");

            let broker_config = BrokerConfig {
                url: broker_url,
                ..BrokerConfig::from_env()
            };
            let broker = RedisStreamsBroker::connect(broker_config)
                .await
                .expect("failed to connect to broker");

            serve(config, repository, broker, storage, metrics_handle).await;
        }
        _ => {
            tracing::warn!(
                "DATABASE_URL or BROKER_URL not set; running with in-memory storage and broker"
            );
            serve(
                config,
                InMemoryInvoiceRepository::new(),
                InMemoryBroker::new(),
                storage,
                metrics_handle,
            )
            .await;
        }
    }
}
