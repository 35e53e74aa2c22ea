use axum::{routing::{get, post}, Router};
use beef_sync_rust::{api, create_pool, AppConfig, RuleSet, SyncService};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    let pool = create_pool(&config.database.url).await?;
    info!("Database pool created");

    let sync_service = Arc::new(SyncService::new(
        pool.clone(),
        RuleSet::padrao(),
        Duration::from_secs(config.sync.timeout_secs),
    ));

    // reconciliation routes share the sync service
    let sync_routes = Router::new()
        .route("/api/sync/nf-movimentacoes", post(api::sync_nf_movimentacoes))
        .route("/api/sync/nf", post(api::sync_nf))
        .with_state(sync_service);

    // the export report only needs the pool
    let export_routes = Router::new()
        .route("/api/movimentacoes/export", get(api::export_movimentacoes))
        .with_state(pool);

    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(sync_routes)
        .merge(export_routes)
        .layer(ServiceBuilder::new());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/sync/nf-movimentacoes - reconcile a period or one invoice");
    info!("  POST /api/sync/nf               - reconcile one invoice by number");
    info!("  GET  /api/movimentacoes/export  - CSV dump of a period's ledger");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
