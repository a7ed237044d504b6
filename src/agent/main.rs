/**
 * TaskSync Agent Entry Point
 *
 * Long-running sync agent: opens the local store, delivers pending
 * operations to the configured server and keeps syncing on connectivity
 * changes and on a fixed interval until interrupted.
 *
 * Usage: tasksync-agent [config.toml]
 */
use std::path::PathBuf;
use std::sync::Arc;
use tasksync::client::sync::ChannelBackgroundSync;
use tasksync::client::SyncContext;
use tasksync::client::local_db::LocalDatabase;
use tasksync::client::remote::HttpRemoteStore;
use tasksync::shared::SyncConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = SyncConfig::load(config_path.as_deref())?;
    tracing::info!(
        server = %config.server_url,
        database = %config.database_path().display(),
        offline = config.start_offline,
        "Starting sync agent"
    );

    let db = LocalDatabase::open(config.database_path()).await?;
    let remote = Arc::new(HttpRemoteStore::new(config.clone())?);
    let (background, mut background_events) = ChannelBackgroundSync::channel();
    let context = SyncContext::builder(config)
        .database(db)
        .remote(remote)
        .background(Arc::new(background))
        .build()
        .await?;

    let stalled = context.service().stalled_operations().await?;
    for op in &stalled {
        tracing::warn!(
            op_id = %op.id,
            entity_type = %op.entity_type(),
            entity_id = %op.entity_id,
            attempts = op.attempts,
            error = op.last_error.as_deref().unwrap_or("unknown"),
            "Operation awaiting manual resolution"
        );
    }

    let _pending_log = context
        .notifier()
        .add_listener(|pending| tracing::info!(pending, "Pending operations"));

    let monitor = context.monitor().spawn();
    let events_monitor = context.monitor().clone();
    let events = tokio::spawn(async move {
        while let Some(tag) = background_events.recv().await {
            if let Err(e) = events_monitor.handle_background_sync_event(&tag).await {
                tracing::error!(tag = %tag, error = %e, "Background sync event failed");
            }
        }
    });

    match context.service().sync_all().await {
        Ok(summary) => tracing::info!(success = summary.success, failed = summary.failed, "Initial sync pass done"),
        Err(e) => tracing::error!(error = %e, "Initial sync pass failed"),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    monitor.abort();
    events.abort();
    let state = context.service().state().await?;
    tracing::info!(
        pending = state.pending_operations,
        stalled = state.stalled_operations,
        "Sync agent stopped"
    );
    context.close().await;
    Ok(())
}
