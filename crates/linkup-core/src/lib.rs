pub mod dispatch;
pub mod error;
pub mod identity;
pub mod messaging;
pub mod notify;
pub mod presence;

use std::sync::Arc;

use linkup_db::DbPool;
use tokio::sync::Notify;

use dispatch::Dispatcher;
use presence::PresenceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Live-connection registry; ephemeral, cleared on shutdown.
    pub presence: Arc<PresenceRegistry>,
    pub dispatcher: Dispatcher,
    pub config: AppConfig,
    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        Self {
            db,
            dispatcher: Dispatcher::new(presence.clone()),
            presence,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub database_url: String,
}
