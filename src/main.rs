use anyhow::Result;
use std::sync::Arc;

use sheet_insights::{
    config, logging, routes, services::store::SqliteAnalysisStore, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let config = config::Config::new()?;
    let store = SqliteAnalysisStore::open(&config.database_path)?;

    let addr = config.bind_address();
    let state = Arc::new(AppState::new(config, Arc::new(store)));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
