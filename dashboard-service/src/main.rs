use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use dashboard_service::{
    api::{self, AppState},
    config::AppConfig,
    history::HistoryLimits,
    metrics_server, observability,
};
use monitor_client::PgDocumentStore;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    // With [metrics] set, /metrics is served on its own listener and on the API router.
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::spawn(&metrics_cfg.bind_addr)?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.store.max_connections)
        .connect(&cfg.store.uri)
        .await?;

    let state = AppState {
        store: Arc::new(PgDocumentStore::new(pool)),
        limits: HistoryLimits::from(&cfg.history),
        offset: cfg.history.local_offset()?,
    };

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, offset = %state.offset, "dashboard API listening");

    axum::serve(listener, api::router(state, cfg.metrics.is_some()).into_make_service()).await?;

    Ok(())
}
