pub mod auth;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod types;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::storage::StorageBackend;

pub use auth::AuthManager;
pub use extract::CurrentUser;
pub use routes::router;

/// Shared state handed to every handler
pub struct AppState {
    pub db: DatabaseConnection,
    pub auth: AuthManager,
    pub uploads: Arc<dyn StorageBackend>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &Config, uploads: Arc<dyn StorageBackend>) -> Self {
        Self {
            db,
            auth: AuthManager::from_config(config),
            uploads,
        }
    }
}
