use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::services::jwt::JwtService;

/// Dependencies shared by every route group, built once at startup.
// `DatabaseConnection` is not `Clone` when sea-orm's `mock` feature (dev-dependency) is on.
#[cfg_attr(not(test), derive(Clone))]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(config: Config, db: DatabaseConnection) -> Self {
        let jwt = JwtService::from_settings(&config.jwt);
        Self {
            db,
            config: Arc::new(config),
            jwt,
        }
    }
}
