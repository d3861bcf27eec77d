use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_db::repositories::ApplicationSettingsRepo;
use courier_delivery::{standard_factories, ProviderRegistry};
use courier_scheduler::DeliveryScheduler;

/// Default seconds between drain passes when `COURIER_POLL_INTERVAL_SECS`
/// is not set.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "courier_worker=info,courier_scheduler=info,courier_delivery=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = courier_db::create_pool(&database_url)
        .await
        .context("connecting to the database")?;
    courier_db::run_migrations(&pool)
        .await
        .context("running migrations")?;

    // The registry is built once per process start; a config change needs a
    // restart (or a future reload signal) to take effect for providers,
    // while the retry policy is re-read on every scheduler pass.
    let settings = ApplicationSettingsRepo::get_or_create(&pool)
        .await
        .context("loading application settings")?;
    let registry = Arc::new(ProviderRegistry::build(
        &settings.provider_descriptors(),
        &standard_factories(),
    ));
    if registry.is_empty() {
        tracing::warn!("No delivery providers configured; ready items will go not-available");
    }

    let poll_interval_secs = std::env::var("COURIER_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

    let scheduler = DeliveryScheduler::new(pool, registry);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    tracing::info!(poll_interval_secs, "Delivery worker starting");
    courier_worker::run(&scheduler, Duration::from_secs(poll_interval_secs), cancel).await;

    Ok(())
}
