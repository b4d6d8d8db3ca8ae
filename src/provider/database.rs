use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, Order,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{AuthApi, AuthUser, ProcedureApi, ProviderError, SignUpMetadata, TableApi};
use crate::auth::password;
use crate::domain::content::split_tags;
use crate::domain::{
    AccountStatus, ActivityLogEntry, ActivityQuery, Article, Collection, ContentRecord,
    CourseModule, FilterValue, Lesson, NewActivity, ProfileUpdate, Resource, Role, Select,
    UserProfile, UserStatistics,
};
use crate::entities::{
    github_resource, identity, knowledge_article, ollama_lesson, ollama_module, user_activity,
    user_profile,
};

/// Provider backed directly by the hub's own database.
#[derive(Debug, Clone)]
pub struct DatabaseProvider {
    db: DatabaseConnection,
}

impl DatabaseProvider {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<identity::Model>, ProviderError> {
        Ok(identity::Entity::find()
            .filter(identity::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AuthApi for DatabaseProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<AuthUser, ProviderError> {
        let email = password::normalize_email(email);
        password::validate_email(&email).map_err(ProviderError::Rejected)?;
        password::validate_password(password).map_err(ProviderError::Rejected)?;

        if self.find_identity_by_email(&email).await?.is_some() {
            return Err(ProviderError::Rejected("User already registered".to_string()));
        }

        let password_hash = password::hash_password(password)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let encoded_metadata =
            serde_json::to_string(metadata).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let now = Utc::now().fixed_offset();
        let user_id = Uuid::new_v4();
        let full_name = metadata
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string);

        // Identity and profile are created together or not at all
        let txn = self.db.begin().await?;

        identity::ActiveModel {
            id: Set(user_id),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            metadata: Set(encoded_metadata),
            created_at: Set(now),
            last_sign_in_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(already_registered)?;

        user_profile::ActiveModel {
            id: Set(user_id),
            email: Set(email.clone()),
            profile_complete: Set(full_name.is_some()),
            full_name: Set(full_name),
            role: Set(metadata.role.as_str().to_string()),
            status: Set(metadata.status.as_str().to_string()),
            email_verified: Set(false),
            login_count: Set(0),
            location: Set(None),
            phone: Set(None),
            suspension_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            last_login: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(already_registered)?;

        txn.commit().await.map_err(already_registered)?;

        Ok(AuthUser {
            id: user_id,
            email,
            metadata: metadata.clone(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        let email = password::normalize_email(email);
        let Some(identity) = self.find_identity_by_email(&email).await? else {
            return Err(ProviderError::InvalidCredentials);
        };

        let valid = password::verify_password(password, &identity.password_hash)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        if !valid {
            return Err(ProviderError::InvalidCredentials);
        }

        let mut active: identity::ActiveModel = identity.clone().into();
        active.last_sign_in_at = Set(Some(Utc::now().fixed_offset()));
        active.update(&self.db).await?;

        auth_user(identity)
    }

    async fn sign_out(&self, user_id: Uuid) -> Result<(), ProviderError> {
        // Sessions are held by the hub, nothing to revoke server-side
        tracing::debug!(%user_id, "provider sign-out");
        Ok(())
    }

    async fn current_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, ProviderError> {
        identity::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .map(auth_user)
            .transpose()
    }
}

/// A unique-email violation means another sign-up for the address won the race.
fn already_registered(err: DbErr) -> ProviderError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ProviderError::Rejected("User already registered".to_string())
        }
        _ => ProviderError::Database(err),
    }
}

fn auth_user(identity: identity::Model) -> Result<AuthUser, ProviderError> {
    let metadata: SignUpMetadata = serde_json::from_str(&identity.metadata)
        .map_err(|e| ProviderError::Malformed(format!("identity metadata: {e}")))?;
    Ok(AuthUser {
        id: identity.id,
        email: identity.email,
        metadata,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TableApi for DatabaseProvider {
    async fn select(&self, query: &Select) -> Result<Vec<ContentRecord>, ProviderError> {
        let records = match query.collection {
            Collection::KnowledgeArticles => {
                select_models::<knowledge_article::Entity>(&self.db, query)
                    .await?
                    .into_iter()
                    .map(|m| ContentRecord::Article(m.into()))
                    .collect()
            }
            Collection::OllamaModules => select_models::<ollama_module::Entity>(&self.db, query)
                .await?
                .into_iter()
                .map(|m| ContentRecord::Module(m.into()))
                .collect(),
            Collection::OllamaLessons => select_models::<ollama_lesson::Entity>(&self.db, query)
                .await?
                .into_iter()
                .map(|m| ContentRecord::Lesson(m.into()))
                .collect(),
            Collection::GithubResources => {
                select_models::<github_resource::Entity>(&self.db, query)
                    .await?
                    .into_iter()
                    .map(|m| ContentRecord::Resource(m.into()))
                    .collect()
            }
        };
        Ok(records)
    }

    async fn update_download_count(
        &self,
        resource_id: i32,
        count: i64,
    ) -> Result<u64, ProviderError> {
        let result = github_resource::Entity::update_many()
            .col_expr(github_resource::Column::DownloadCount, Expr::value(count))
            .filter(github_resource::Column::Id.eq(resource_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ProviderError> {
        user_profile::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .map(UserProfile::try_from)
            .transpose()
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, ProviderError> {
        user_profile::Entity::find()
            .order_by_asc(user_profile::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(UserProfile::try_from)
            .collect()
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ProviderError> {
        let model = user_profile::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("profile {user_id}")))?;

        let mut active: user_profile::ActiveModel = model.into();
        if let Some(role) = update.role {
            active.role = Set(role.as_str().to_string());
        }
        if let Some(status) = update.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(reason) = &update.suspension_reason {
            active.suspension_reason = Set(reason.clone());
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        UserProfile::try_from(active.update(&self.db).await?)
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<u64, ProviderError> {
        // Deleting the identity cascades to the profile and its activity log
        let removed = identity::Entity::delete_by_id(user_id)
            .exec(&self.db)
            .await?
            .rows_affected;
        if removed > 0 {
            return Ok(removed);
        }
        Ok(user_profile::Entity::delete_by_id(user_id)
            .exec(&self.db)
            .await?
            .rows_affected)
    }

    async fn select_activities(
        &self,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityLogEntry>, ProviderError> {
        let mut finder = user_activity::Entity::find();
        if let Some(user_id) = query.user_id {
            finder = finder.filter(user_activity::Column::UserId.eq(user_id));
        }
        if let Some(activity_type) = &query.activity_type {
            finder = finder.filter(user_activity::Column::ActivityType.eq(activity_type.as_str()));
        }
        finder
            .order_by_desc(user_activity::Column::CreatedAt)
            .order_by_desc(user_activity::Column::Id)
            .limit(query.limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ActivityLogEntry::try_from)
            .collect()
    }
}

/// Run a [`Select`] against one entity, resolving field names to its columns.
async fn select_models<E>(
    db: &DatabaseConnection,
    query: &Select,
) -> Result<Vec<E::Model>, ProviderError>
where
    E: EntityTrait,
    E::Column: FromStr,
{
    let mut finder = E::find();

    for filter in &query.filters {
        let column = column::<E>(filter.field)?;
        finder = finder.filter(column.eq(filter.value.clone()));
    }

    if let Some(term) = query.search.as_deref() {
        let pattern = format!("%{}%", escape_like(&term.trim().to_lowercase()));
        let mut any_field = Condition::any();
        for field in query.collection.search_fields() {
            let column = column::<E>(field)?;
            any_field = any_field.add(
                Expr::expr(Func::lower(Expr::col(column)))
                    .like(LikeExpr::new(pattern.clone()).escape('\\')),
            );
        }
        finder = finder.filter(any_field);
    }

    for order in &query.order {
        let direction = if order.descending {
            Order::Desc
        } else {
            Order::Asc
        };
        finder = finder.order_by(column::<E>(order.field)?, direction);
    }

    Ok(finder.limit(query.limit).all(db).await?)
}

fn column<E>(field: &str) -> Result<E::Column, ProviderError>
where
    E: EntityTrait,
    E::Column: FromStr,
{
    E::Column::from_str(field)
        .map_err(|_| ProviderError::Malformed(format!("unknown column `{field}`")))
}

/// Escape `LIKE` wildcards so user input only matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl From<FilterValue> for sea_orm::Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Text(s) => s.into(),
            FilterValue::Flag(b) => b.into(),
            FilterValue::Integer(i) => i.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Procedures
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ProcedureApi for DatabaseProvider {
    async fn record_login(&self, user_id: Uuid) -> Result<UserProfile, ProviderError> {
        let now = Utc::now().fixed_offset();
        let result = user_profile::Entity::update_many()
            .col_expr(
                user_profile::Column::LoginCount,
                Expr::col(user_profile::Column::LoginCount).add(1),
            )
            .col_expr(user_profile::Column::LastLogin, Expr::value(now))
            .col_expr(user_profile::Column::UpdatedAt, Expr::value(now))
            .filter(user_profile::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ProviderError::NotFound(format!("profile {user_id}")));
        }

        self.find_profile(user_id)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("profile {user_id}")))
    }

    async fn log_activity(&self, entry: &NewActivity) -> Result<(), ProviderError> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        user_activity::ActiveModel {
            user_id: Set(entry.user_id),
            activity_type: Set(entry.activity_type.clone()),
            description: Set(entry.description.clone()),
            resource_id: Set(entry.resource_id),
            details: Set(details),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    async fn user_statistics(&self) -> Result<UserStatistics, ProviderError> {
        let start_of_today = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().fixed_offset())
            .ok_or_else(|| ProviderError::Malformed("start of day".to_string()))?;
        let has_status =
            |status: AccountStatus| user_profile::Column::Status.eq(status.as_str());

        // One statement, so every figure comes from the same snapshot
        let row = user_profile::Entity::find()
            .select_only()
            .column_as(
                SimpleExpr::from(Func::count(Expr::col(user_profile::Column::Id))),
                "total",
            )
            .column_as(count_where(has_status(AccountStatus::Active)), "active")
            .column_as(count_where(has_status(AccountStatus::Pending)), "pending")
            .column_as(count_where(has_status(AccountStatus::Suspended)), "suspended")
            .column_as(count_where(has_status(AccountStatus::Inactive)), "inactive")
            .column_as(
                SimpleExpr::from(Func::sum(Expr::col(user_profile::Column::LoginCount))),
                "total_logins",
            )
            .column_as(
                count_where(user_profile::Column::CreatedAt.gte(start_of_today)),
                "users_today",
            )
            .into_tuple::<StatisticsRow>()
            .one(&self.db)
            .await?;

        let Some((total, active, pending, suspended, inactive, total_logins, users_today)) = row
        else {
            return Ok(UserStatistics::default());
        };

        Ok(UserStatistics {
            total: tally("total", Some(total))?,
            active: tally("active", active)?,
            pending: tally("pending", pending)?,
            suspended: tally("suspended", suspended)?,
            inactive: tally("inactive", inactive)?,
            total_logins: tally("total_logins", total_logins)?,
            users_today: tally("users_today", users_today)?,
        })
    }
}

/// `COUNT(*)` then the `SUM`s, which are NULL over an empty table.
type StatisticsRow = (
    i64,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
);

/// `SUM(CASE WHEN condition THEN 1 ELSE 0 END)`
fn count_where(condition: SimpleExpr) -> SimpleExpr {
    Func::sum(Expr::case(condition, 1).finally(0)).into()
}

fn tally(name: &str, value: Option<i64>) -> Result<u64, ProviderError> {
    u64::try_from(value.unwrap_or(0))
        .map_err(|_| ProviderError::Malformed(format!("negative {name} in statistics")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Row conversions
// ─────────────────────────────────────────────────────────────────────────────

fn utc(ts: DateTime<FixedOffset>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

impl TryFrom<user_profile::Model> for UserProfile {
    type Error = ProviderError;

    fn try_from(m: user_profile::Model) -> Result<Self, Self::Error> {
        let role = Role::from_str(&m.role)
            .ok_or_else(|| ProviderError::Malformed(format!("unknown role `{}`", m.role)))?;
        let status = AccountStatus::from_str(&m.status)
            .ok_or_else(|| ProviderError::Malformed(format!("unknown status `{}`", m.status)))?;
        let login_count = u32::try_from(m.login_count).map_err(|_| {
            ProviderError::Malformed(format!("negative login_count `{}`", m.login_count))
        })?;
        Ok(Self {
            id: m.id,
            email: m.email,
            full_name: m.full_name,
            role,
            status,
            email_verified: m.email_verified,
            profile_complete: m.profile_complete,
            login_count,
            location: m.location,
            phone: m.phone,
            suspension_reason: m.suspension_reason,
            created_at: utc(m.created_at),
            last_login: m.last_login.map(utc),
        })
    }
}

impl TryFrom<user_activity::Model> for ActivityLogEntry {
    type Error = ProviderError;

    fn try_from(m: user_activity::Model) -> Result<Self, Self::Error> {
        let details = m
            .details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| ProviderError::Malformed(format!("activity details: {e}")))?;
        Ok(Self {
            id: m.id,
            user_id: m.user_id,
            activity_type: m.activity_type,
            description: m.description,
            resource_id: m.resource_id,
            details,
            created_at: utc(m.created_at),
        })
    }
}

impl From<knowledge_article::Model> for Article {
    fn from(m: knowledge_article::Model) -> Self {
        Self {
            id: m.id,
            slug: m.slug,
            title: m.title,
            summary: m.summary,
            content: m.content,
            category: m.category,
            tags: split_tags(&m.tags),
            featured: m.featured,
            author: m.author,
            created_at: utc(m.created_at),
        }
    }
}

impl From<ollama_module::Model> for CourseModule {
    fn from(m: ollama_module::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            difficulty: m.difficulty,
            module_order: m.module_order,
            estimated_minutes: m.estimated_minutes,
        }
    }
}

impl From<ollama_lesson::Model> for Lesson {
    fn from(m: ollama_lesson::Model) -> Self {
        Self {
            id: m.id,
            module_id: m.module_id,
            title: m.title,
            content: m.content,
            lesson_order: m.lesson_order,
            duration_minutes: m.duration_minutes,
        }
    }
}

impl From<github_resource::Model> for Resource {
    fn from(m: github_resource::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            repo_url: m.repo_url,
            category: m.category,
            primary_language: m.primary_language,
            tags: split_tags(&m.tags),
            stars: m.stars,
            download_count: m.download_count,
        }
    }
}
