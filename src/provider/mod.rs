//! The hosted auth + data provider, seen through three narrow capability groups.
//!
//! Services only ever talk to `Arc<dyn Provider>`; [`DatabaseProvider`] is the
//! self-hosted implementation over sea-orm.

mod database;

pub use database::DatabaseProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AccountStatus, ActivityLogEntry, ActivityQuery, ContentRecord, NewActivity, ProfileUpdate,
    Role, Select, UserProfile, UserStatistics,
};

/// Failures reported by the provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    /// The provider refused the request; the message is meant for end users.
    #[error("{0}")]
    Rejected(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed provider data: {0}")]
    Malformed(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Metadata attached to a new identity at sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpMetadata {
    pub role: Role,
    pub status: AccountStatus,
    pub full_name: Option<String>,
    pub is_super_admin: bool,
}

impl SignUpMetadata {
    pub const fn approved(&self) -> bool {
        matches!(self.status, AccountStatus::Active)
    }
}

/// An authenticated identity as returned by the provider's auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub metadata: SignUpMetadata,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Create an identity and its profile row from `metadata`.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<AuthUser, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError>;

    async fn sign_out(&self, user_id: Uuid) -> Result<(), ProviderError>;

    async fn current_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, ProviderError>;
}

#[async_trait]
pub trait TableApi: Send + Sync {
    async fn select(&self, query: &Select) -> Result<Vec<ContentRecord>, ProviderError>;

    /// Overwrite a resource's download counter. Returns the number of rows affected.
    async fn update_download_count(&self, resource_id: i32, count: i64)
    -> Result<u64, ProviderError>;

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ProviderError>;

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, ProviderError>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ProviderError>;

    /// Remove a user. Dependent rows (identity, activity log) go with it.
    async fn delete_profile(&self, user_id: Uuid) -> Result<u64, ProviderError>;

    async fn select_activities(
        &self,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityLogEntry>, ProviderError>;
}

#[async_trait]
pub trait ProcedureApi: Send + Sync {
    /// Atomically bump `login_count` and stamp `last_login`.
    async fn record_login(&self, user_id: Uuid) -> Result<UserProfile, ProviderError>;

    async fn log_activity(&self, entry: &NewActivity) -> Result<(), ProviderError>;

    async fn user_statistics(&self) -> Result<UserStatistics, ProviderError>;
}

/// Everything the hub needs from its provider.
pub trait Provider: AuthApi + TableApi + ProcedureApi {}

impl<T: AuthApi + TableApi + ProcedureApi> Provider for T {}
