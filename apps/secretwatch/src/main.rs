use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use secretwatch_events::{EventGridConnector, EventPublisher};
use secretwatch_graph::{DirectoryScanner, GraphClient, TokenCache};
use secretwatch_monitor::{
    resolve_client_credentials, ExpirationJob, LogFormat, MonitorConfig, Scheduler,
};
use secretwatch_secrets::{build_provider, SecretProviderConfig};

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = MonitorConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    init_tracing(config.log_format);

    let secret_config = SecretProviderConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Secret provider configuration error: {e}");
        std::process::exit(1);
    });
    let secrets = build_provider(&secret_config).unwrap_or_else(|e| {
        eprintln!("Secret provider error: {e}");
        std::process::exit(1);
    });

    // Directory credentials are required before the first run
    let credentials = resolve_client_credentials(secrets.as_ref())
        .await
        .unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        });

    info!(
        tenant_id = %credentials.tenant_id,
        graph = %config.graph.base_url(),
        interval_secs = config.scan_interval.as_secs(),
        run_on_startup = config.run_on_startup,
        warning_days = config.expiry_warning_days,
        "starting secretwatch"
    );

    let tokens = TokenCache::new(credentials, &config.graph).unwrap_or_else(|e| {
        eprintln!("Token client error: {e}");
        std::process::exit(1);
    });
    let client = GraphClient::new(Arc::new(tokens), config.graph.clone()).unwrap_or_else(|e| {
        eprintln!("Graph client error: {e}");
        std::process::exit(1);
    });
    let scanner = DirectoryScanner::new(client);

    // Sink credentials are resolved per run, only when there is something to send
    let connector = EventGridConnector::new(
        secrets,
        config.event_source.clone(),
        config.publisher.timeout,
    );

    let job = ExpirationJob::new(Arc::new(scanner), Arc::new(connector))
        .with_classifier(config.classifier())
        .with_publisher(EventPublisher::new(config.publisher.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let runs = Scheduler::from_config(&config).run(&job, shutdown_rx).await;

    info!(runs, "secretwatch stopped");
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,secretwatch=debug"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, finishing current run and shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, finishing current run and shutting down");
        }
    }
}
