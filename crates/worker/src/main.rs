use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redline_client::{CompareApiConfig, RemoteCompareApi};
use redline_events::ProgressBroadcaster;
use redline_orchestrator::{Orchestrator, PassthroughResolver, PgTaskStore};
use redline_worker::config::WorkerConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "redline_worker=debug,redline_orchestrator=debug,redline_client=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        compare_api_url = %config.compare_api_url,
        concurrency = config.concurrency,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = redline_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    redline_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    redline_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Remote comparison service ---
    let api = RemoteCompareApi::new(CompareApiConfig::new(&config.compare_api_url));
    // The service may still be starting; a failed probe is worth a
    // warning, not a refusal to start.
    if let Err(e) = api.health().await {
        tracing::warn!(error = %e, "Comparison service health probe failed");
    } else {
        tracing::info!("Comparison service is reachable");
    }

    // --- Orchestrator ---
    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::new(PgTaskStore::new(pool.clone())),
            Arc::new(PassthroughResolver),
            Arc::new(api),
            Arc::new(ProgressBroadcaster::new()),
        )
        .with_url_ttl(Duration::from_secs(config.url_ttl_secs)),
    );

    // --- Claim loop ---
    let shutdown = tokio_util::sync::CancellationToken::new();
    let claim_handle = tokio::spawn(redline_worker::run_claim_loop(
        pool,
        orchestrator,
        config.concurrency,
        shutdown.clone(),
    ));
    tracing::info!("Worker started");

    shutdown_signal().await;

    // --- Graceful shutdown ---
    shutdown.cancel();
    claim_handle.await.expect("Claim loop task panicked");
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
