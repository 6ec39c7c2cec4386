use oposify_api::{
    api::{create_router, AppState},
    config::Config,
    db::CsvSnapshotStore,
    services::{Reconciler, SnapshotPaths},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oposify_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Reconciliation finishes before the listener is bound
    let paths = SnapshotPaths {
        history: config.history_path.clone(),
        catalog: config.catalog_path.clone(),
        reconciled: config.reconciled_path().clone(),
    };
    let context = tokio::task::spawn_blocking(move || {
        Reconciler::new(CsvSnapshotStore::new(), paths).run()
    })
    .await??;

    let app = create_router(AppState::new(context));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
