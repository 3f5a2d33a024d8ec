use std::sync::Arc;

use scopesync_core::settings::SettingsOverlay;
use scopesync_core::types::DbId;
use scopesync_engine::{
    EngineConfig, FileCacheStore, MembershipDirectory, MemorySettingsStore, PgSettingsStore,
    RemoteSettingsStore, SyncEngine, TracingSink,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scopesync_worker=debug,scopesync_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = EngineConfig::from_env().expect("Invalid settings configuration");
    tracing::info!(
        debounce_ms = config.debounce.as_millis() as u64,
        fallback_window = config.fallback_window,
        cache_dir = %config.cache_dir.display(),
        "Loaded engine configuration"
    );

    // --- Settings store ---
    let (store, directory): (Arc<dyn RemoteSettingsStore>, Arc<dyn MembershipDirectory>) =
        match std::env::var("DATABASE_URL") {
            Ok(database_url) => {
                let pool = scopesync_db::create_pool(&database_url)
                    .await
                    .expect("Failed to connect to database");
                tracing::info!("Database connection pool created");

                scopesync_db::health_check(&pool)
                    .await
                    .expect("Database health check failed");
                tracing::info!("Database health check passed");

                scopesync_db::run_migrations(&pool)
                    .await
                    .expect("Failed to run database migrations");
                tracing::info!("Database migrations applied");

                split(Arc::new(PgSettingsStore::new(pool)))
            }
            Err(_) => {
                tracing::warn!("DATABASE_URL not set; running against an in-memory store");
                split(Arc::new(MemorySettingsStore::new()))
            }
        };

    // --- Cache ---
    let cache = Arc::new(
        FileCacheStore::open(&config.cache_dir).expect("Failed to open settings cache directory"),
    );

    // --- Engine ---
    let engine = SyncEngine::new(config, store, directory, cache, Arc::new(TracingSink));

    // Log every engine event.
    let mut events = engine.subscribe();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(
                event_type = %event.event_type,
                generation = event.generation,
                payload = %event.payload,
                "Engine event"
            );
        }
    });

    let tenant_id = env_id("TENANT_ID");
    let principal_id = env_id("PRINCIPAL_ID");
    if let Some(load) = engine.set_scope(tenant_id, principal_id).await {
        if let Err(e) = load.await {
            tracing::error!(error = %e, "Settings load task failed");
        }
    }
    tracing::info!(
        status = engine.status().await.as_str(),
        "Worker ready; reading settings patches from stdin"
    );

    // --- Patch loop ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => apply_patch(&engine, &line).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read stdin");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C");
                break;
            }
        }
    }

    // --- Shutdown ---
    engine.shutdown().await;
    event_log.abort();
    tracing::info!("Worker stopped");
}

async fn apply_patch(engine: &SyncEngine, line: &str) {
    let patch: SettingsOverlay = match serde_json::from_str(line) {
        Ok(patch) => patch,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed settings patch");
            return;
        }
    };
    match engine.mutate(patch).await {
        Ok(()) => {
            let effective = engine.effective().await;
            match serde_json::to_string(&effective.without_assets()) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode effective settings"),
            }
        }
        Err(e) => tracing::warn!(error = %e, "Settings patch rejected"),
    }
}

/// One adapter serves both the record store and the membership directory.
fn split<S>(store: Arc<S>) -> (Arc<dyn RemoteSettingsStore>, Arc<dyn MembershipDirectory>)
where
    S: RemoteSettingsStore + MembershipDirectory + 'static,
{
    let records: Arc<dyn RemoteSettingsStore> = store.clone();
    let members: Arc<dyn MembershipDirectory> = store;
    (records, members)
}

fn env_id(key: &str) -> Option<DbId> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring unparseable identity");
            None
        }
    }
}
