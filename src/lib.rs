use std::sync::Arc;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use services::store::AnalysisStore;

// Application state
pub struct AppState {
    pub config: config::Config,
    pub store: Arc<dyn AnalysisStore>,
}

impl AppState {
    pub fn new(config: config::Config, store: Arc<dyn AnalysisStore>) -> Self {
        Self { config, store }
    }
}
