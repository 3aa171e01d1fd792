use std::sync::Arc;

use sph_db::SphDb;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SphDb>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: SphDb, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}
