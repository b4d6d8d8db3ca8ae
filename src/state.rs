use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::provider::{DatabaseProvider, Provider};
use crate::services::{ContentService, LifecycleService, RegistrationPolicy};
use crate::sessions::SessionStore;

/// Shared application state available to all request handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub sessions: SessionStore,
    pub lifecycle: Arc<LifecycleService>,
    pub content: Arc<ContentService>,
}

impl AppState {
    /// State backed by the self-hosted [`DatabaseProvider`].
    #[must_use]
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let provider = Arc::new(DatabaseProvider::new(db.clone()));
        Self::with_provider(db, config, provider)
    }

    /// State over any provider implementation.
    #[must_use]
    pub fn with_provider(
        db: DatabaseConnection,
        config: Config,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let sessions = SessionStore::new(config.session_timeout, config.cache_ttl);
        let lifecycle = Arc::new(LifecycleService::new(
            Arc::clone(&provider),
            sessions.clone(),
            RegistrationPolicy::from_config(&config),
        ));
        let content = Arc::new(ContentService::new(provider));
        Self {
            db,
            config,
            sessions,
            lifecycle,
            content,
        }
    }
}
