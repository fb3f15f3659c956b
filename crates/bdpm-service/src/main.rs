//! BDPM refresh server binary.

use bdpm_loader::{RefreshConfig, Refresher, SnapshotStore};
use bdpm_service::{run_scheduler, RefreshSchedule, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = RefreshConfig::from_env();
    let schedule = RefreshSchedule::from_env();
    tracing::info!(
        "Scratch directory: {}, fetch timeout: {}s",
        config.files_dir.display(),
        config.http_timeout.as_secs()
    );
    tracing::info!("Refresh times (UTC): {:?}", schedule.times());

    let store = SnapshotStore::new();
    let refresher = Refresher::with_http(config)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Could not listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    run_scheduler(&store, &refresher, &schedule, &SystemClock, shutdown).await;

    let stats = store.stats();
    tracing::info!(
        "Shutting down with {} medicaments published (last update: {:?})",
        stats.medicaments,
        stats.last_updated
    );
    Ok(())
}
