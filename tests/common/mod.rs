#![allow(dead_code, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use dashmap::DashSet;
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, DatabaseConnection};
use tower::ServiceExt;
use uuid::Uuid;

use knowledge_hub::config::{Config, DEFAULT_SUPER_ADMIN_EMAIL, Environment};
use knowledge_hub::domain::{
    ActivityLogEntry, ActivityQuery, Collection, ContentRecord, NewActivity, ProfileUpdate,
    Select, UserProfile, UserStatistics,
};
use knowledge_hub::entities::{github_resource, knowledge_article, ollama_lesson, ollama_module};
use knowledge_hub::provider::{
    AuthApi, AuthUser, DatabaseProvider, ProcedureApi, Provider, ProviderError, SignUpMetadata,
    TableApi,
};
use knowledge_hub::services::{ContentService, LifecycleService, RegistrationPolicy};
use knowledge_hub::sessions::SessionStore;
use knowledge_hub::state::AppState;

pub const SUPER_ADMIN: &str = DEFAULT_SUPER_ADMIN_EMAIL;
pub const PASSWORD: &str = "correct-horse";

// ─────────────────────────────────────────────────────────────────────────────
// Database & configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Fresh in-memory database with every migration applied.
pub async fn test_db() -> DatabaseConnection {
    let db = knowledge_hub::db::connect("sqlite::memory:")
        .await
        .unwrap_or_else(|e| panic!("connect: {e}"));
    Migrator::up(&db, None)
        .await
        .unwrap_or_else(|e| panic!("migrate: {e}"));
    db
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        server_host: std::net::IpAddr::from([127, 0, 0, 1]),
        server_port: 0,
        environment: Environment::Development,
        log_level: "warn".to_string(),
        frontend_url: "http://localhost:3001".to_string(),
        super_admin_email: SUPER_ADMIN.to_string(),
        cache_ttl: Duration::from_secs(15 * 60),
        session_timeout: Duration::from_secs(60 * 60),
        auto_approve_users: false,
        default_user_role: knowledge_hub::domain::Role::User,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Counting provider
// ─────────────────────────────────────────────────────────────────────────────

/// Delegates to [`DatabaseProvider`], counting reads and injecting failures on demand.
pub struct CountingProvider {
    inner: DatabaseProvider,
    selects: AtomicUsize,
    failing: DashSet<Collection>,
    fail_statistics: AtomicBool,
    fail_sign_out: AtomicBool,
    fail_update_profile: AtomicBool,
}

impl CountingProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            inner: DatabaseProvider::new(db),
            selects: AtomicUsize::new(0),
            failing: DashSet::new(),
            fail_statistics: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            fail_update_profile: AtomicBool::new(false),
        }
    }

    /// Number of content `select` calls that reached the provider.
    pub fn selects(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    pub fn fail_collection(&self, collection: Collection) {
        self.failing.insert(collection);
    }

    pub fn heal_collection(&self, collection: Collection) {
        self.failing.remove(&collection);
    }

    pub fn fail_statistics(&self, fail: bool) {
        self.fail_statistics.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update_profile(&self, fail: bool) {
        self.fail_update_profile.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthApi for CountingProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<AuthUser, ProviderError> {
        self.inner.sign_up(email, password, metadata).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.inner.sign_in(email, password).await
    }

    async fn sign_out(&self, user_id: Uuid) -> Result<(), ProviderError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("sign-out timed out".to_string()));
        }
        self.inner.sign_out(user_id).await
    }

    async fn current_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, ProviderError> {
        self.inner.current_user(user_id).await
    }
}

#[async_trait]
impl TableApi for CountingProvider {
    async fn select(&self, query: &Select) -> Result<Vec<ContentRecord>, ProviderError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&query.collection) {
            return Err(ProviderError::Unavailable(format!(
                "{} is unreachable",
                query.collection
            )));
        }
        self.inner.select(query).await
    }

    async fn update_download_count(
        &self,
        resource_id: i32,
        count: i64,
    ) -> Result<u64, ProviderError> {
        self.inner.update_download_count(resource_id, count).await
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ProviderError> {
        self.inner.find_profile(user_id).await
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, ProviderError> {
        self.inner.list_profiles().await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ProviderError> {
        if self.fail_update_profile.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("profile write timed out".to_string()));
        }
        self.inner.update_profile(user_id, update).await
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<u64, ProviderError> {
        self.inner.delete_profile(user_id).await
    }

    async fn select_activities(
        &self,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityLogEntry>, ProviderError> {
        self.inner.select_activities(query).await
    }
}

#[async_trait]
impl ProcedureApi for CountingProvider {
    async fn record_login(&self, user_id: Uuid) -> Result<UserProfile, ProviderError> {
        self.inner.record_login(user_id).await
    }

    async fn log_activity(&self, entry: &NewActivity) -> Result<(), ProviderError> {
        self.inner.log_activity(entry).await
    }

    async fn user_statistics(&self) -> Result<UserStatistics, ProviderError> {
        if self.fail_statistics.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("rpc quota exceeded".to_string()));
        }
        self.inner.user_statistics().await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service fixtures
// ─────────────────────────────────────────────────────────────────────────────

pub struct Hub {
    pub db: DatabaseConnection,
    pub provider: Arc<CountingProvider>,
    pub sessions: SessionStore,
    pub lifecycle: LifecycleService,
    pub content: ContentService,
}

pub async fn hub() -> Hub {
    hub_with(RegistrationPolicy::default()).await
}

pub async fn hub_with(policy: RegistrationPolicy) -> Hub {
    let db = test_db().await;
    let provider = Arc::new(CountingProvider::new(db.clone()));
    let shared: Arc<dyn Provider> = provider.clone();
    let sessions = SessionStore::new(Duration::from_secs(3600), Duration::from_secs(900));
    Hub {
        lifecycle: LifecycleService::new(Arc::clone(&shared), sessions.clone(), policy),
        content: ContentService::new(shared),
        db,
        provider,
        sessions,
    }
}

impl Hub {
    /// Sign the super-admin up and return its id.
    pub async fn super_admin(&self) -> Uuid {
        self.lifecycle
            .sign_up(SUPER_ADMIN, PASSWORD, Some("Hub Owner"))
            .await
            .map(|o| o.user.id)
            .unwrap_or_else(|e| panic!("super admin sign-up: {e}"))
    }

    /// Sign an ordinary (pending) user up and return its id.
    pub async fn pending_user(&self, email: &str) -> Uuid {
        self.lifecycle
            .sign_up(email, PASSWORD, None)
            .await
            .map(|o| o.user.id)
            .unwrap_or_else(|e| panic!("sign-up {email}: {e}"))
    }

    /// Sign an ordinary user up and approve it.
    pub async fn active_user(&self, admin: Uuid, email: &str) -> Uuid {
        let id = self.pending_user(email).await;
        self.lifecycle
            .approve(admin, id)
            .await
            .unwrap_or_else(|e| panic!("approve {email}: {e}"));
        id
    }

    pub async fn profile(&self, user_id: Uuid) -> Option<UserProfile> {
        self.provider.find_profile(user_id).await.unwrap_or_default()
    }

    pub async fn activities_of(&self, user_id: Uuid) -> Vec<ActivityLogEntry> {
        self.provider
            .select_activities(&ActivityQuery {
                user_id: Some(user_id),
                activity_type: None,
                limit: None,
            })
            .await
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content seeding
// ─────────────────────────────────────────────────────────────────────────────

pub async fn seed_article(
    db: &DatabaseConnection,
    slug: &str,
    category: &str,
    featured: bool,
) -> i32 {
    let now = Utc::now().fixed_offset();
    knowledge_article::ActiveModel {
        slug: Set(slug.to_string()),
        title: Set(slug.replace('-', " ")),
        summary: Set(None),
        content: Set(format!("All about {slug}")),
        category: Set(category.to_string()),
        tags: Set("llm,intro".to_string()),
        featured: Set(featured),
        author: Set(Some("Hub Team".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map(|m| m.id)
    .unwrap_or_else(|e| panic!("seed article: {e}"))
}

pub async fn seed_module(
    db: &DatabaseConnection,
    title: &str,
    difficulty: &str,
    order: i32,
) -> i32 {
    ollama_module::ActiveModel {
        title: Set(title.to_string()),
        description: Set(format!("{title} with Ollama")),
        difficulty: Set(difficulty.to_string()),
        module_order: Set(order),
        estimated_minutes: Set(Some(30)),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map(|m| m.id)
    .unwrap_or_else(|e| panic!("seed module: {e}"))
}

pub async fn seed_lesson(
    db: &DatabaseConnection,
    module_id: i32,
    title: &str,
    order: i32,
) -> i32 {
    ollama_lesson::ActiveModel {
        module_id: Set(module_id),
        title: Set(title.to_string()),
        content: Set(format!("Lesson body for {title}")),
        lesson_order: Set(order),
        duration_minutes: Set(Some(10)),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map(|m| m.id)
    .unwrap_or_else(|e| panic!("seed lesson: {e}"))
}

pub async fn seed_resource(
    db: &DatabaseConnection,
    name: &str,
    language: &str,
    stars: i32,
    downloads: i64,
) -> i32 {
    github_resource::ActiveModel {
        name: Set(name.to_string()),
        description: Set(format!("{name} toolkit")),
        repo_url: Set(format!("https://github.com/example/{name}")),
        category: Set("tools".to_string()),
        primary_language: Set(Some(language.to_string())),
        tags: Set("agents,local".to_string()),
        stars: Set(stars),
        download_count: Set(downloads),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map(|m| m.id)
    .unwrap_or_else(|e| panic!("seed resource: {e}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP helpers
// ─────────────────────────────────────────────────────────────────────────────

pub async fn test_app() -> (Router, AppState) {
    let db = test_db().await;
    let state = AppState::new(db, test_config());
    let app = knowledge_hub::routes::router().with_state(state.clone());
    (app, state)
}

/// Send a request and return (status, parsed JSON body).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let (status, _, text) = send_raw(app, method, uri, token, body).await;
    let json = serde_json::from_str(&text).unwrap_or_default();
    (status, json)
}

/// Send a request and return (status, headers, raw body).
pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&serde_json::Value>,
) -> (StatusCode, axum::http::HeaderMap, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap_or_default();

    let response = app.clone().oneshot(request).await.unwrap_or_default();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let text = String::from_utf8(body.to_vec()).unwrap_or_default();

    (status, headers, text)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

/// Sign in over HTTP and return the bearer token.
pub async fn sign_in(app: &Router, email: &str, password: &str) -> String {
    let (status, json) = post_json(
        app,
        "/api/v1/auth/signin",
        None,
        &serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "sign-in failed: {json}");
    json["token"].as_str().unwrap_or_default().to_string()
}
