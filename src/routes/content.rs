use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::CurrentSession;
use crate::domain::{
    ArticleFilter, Collection, ContentLookup, ContentQuery, ContentRecord, ModuleFilter,
    ResourceFilter, UserProgress,
};
use crate::error::AppError;
use crate::services::{ReadOutcome, SearchResults};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the content route group: `/content/...`. Every route needs a session.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles))
        .route("/articles/{slug}", get(get_article))
        .route("/modules", get(list_modules))
        .route("/modules/{id}", get(get_module))
        .route("/modules/{id}/lessons", get(list_lessons))
        .route("/lessons/{id}/complete", post(complete_lesson))
        .route("/resources", get(list_resources))
        .route("/resources/{id}/download", post(download_resource))
        .route("/search", get(search))
        .route("/progress", get(progress))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

type ListResponse = Json<ReadOutcome<Vec<ContentRecord>>>;

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    /// Comma-separated collection names; empty means the default set.
    types: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadResponse {
    success: bool,
    message: String,
    download_count: i64,
}

#[derive(Serialize)]
struct CompletionResponse {
    success: bool,
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// A found record, a degraded empty read, or 404.
fn single(
    outcome: ReadOutcome<Option<ContentRecord>>,
    what: &str,
) -> Result<Json<ReadOutcome<Option<ContentRecord>>>, AppError> {
    if outcome.data.is_none() && !outcome.is_degraded() {
        return Err(AppError::NotFound(format!("{what} not found")));
    }
    Ok(Json(outcome))
}

fn parse_collections(raw: Option<&str>) -> Result<Vec<Collection>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let mut collections = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let collection = Collection::from_str(name)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown content type `{name}`.")))?;
        if !collections.contains(&collection) {
            collections.push(collection);
        }
    }
    Ok(collections)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/v1/content/articles`
async fn list_articles(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(filter): Query<ArticleFilter>,
) -> ListResponse {
    let mut cache = session.cache.lock().await;
    Json(
        state
            .content
            .fetch(&mut cache, &ContentQuery::Articles(filter))
            .await,
    )
}

/// `GET /api/v1/content/articles/{slug}`
async fn get_article(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(slug): Path<String>,
) -> Result<Json<ReadOutcome<Option<ContentRecord>>>, AppError> {
    let mut cache = session.cache.lock().await;
    let outcome = state
        .content
        .fetch_one(&mut cache, &ContentLookup::ArticleBySlug(slug))
        .await;
    single(outcome, "Article")
}

/// `GET /api/v1/content/modules`
async fn list_modules(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(filter): Query<ModuleFilter>,
) -> ListResponse {
    let mut cache = session.cache.lock().await;
    Json(
        state
            .content
            .fetch(&mut cache, &ContentQuery::Modules(filter))
            .await,
    )
}

/// `GET /api/v1/content/modules/{id}`
async fn get_module(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<i32>,
) -> Result<Json<ReadOutcome<Option<ContentRecord>>>, AppError> {
    let mut cache = session.cache.lock().await;
    let outcome = state
        .content
        .fetch_one(&mut cache, &ContentLookup::ModuleById(id))
        .await;
    single(outcome, "Module")
}

/// `GET /api/v1/content/modules/{id}/lessons`
async fn list_lessons(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(module_id): Path<i32>,
) -> ListResponse {
    let mut cache = session.cache.lock().await;
    Json(
        state
            .content
            .fetch(&mut cache, &ContentQuery::Lessons { module_id })
            .await,
    )
}

/// `POST /api/v1/content/lessons/{id}/complete`
async fn complete_lesson(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(lesson_id): Path<i32>,
) -> Result<Json<CompletionResponse>, AppError> {
    let mut cache = session.cache.lock().await;
    state
        .content
        .complete_lesson(&mut cache, session.user_id, lesson_id)
        .await?;
    Ok(Json(CompletionResponse {
        success: true,
        message: "Lesson marked as complete".to_string(),
    }))
}

/// `GET /api/v1/content/resources`
async fn list_resources(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(filter): Query<ResourceFilter>,
) -> ListResponse {
    let mut cache = session.cache.lock().await;
    Json(
        state
            .content
            .fetch(&mut cache, &ContentQuery::Resources(filter))
            .await,
    )
}

/// `POST /api/v1/content/resources/{id}/download`
async fn download_resource(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(resource_id): Path<i32>,
) -> Result<Json<DownloadResponse>, AppError> {
    let mut cache = session.cache.lock().await;
    let download_count = state
        .content
        .download_resource(&mut cache, session.user_id, resource_id)
        .await?;
    Ok(Json(DownloadResponse {
        success: true,
        message: "Download recorded".to_string(),
        download_count,
    }))
}

/// `GET /api/v1/content/search?q=...&types=articles,modules`
async fn search(
    State(state): State<AppState>,
    CurrentSession(_session): CurrentSession,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, AppError> {
    let collections = parse_collections(params.types.as_deref())?;
    let term = params.q.unwrap_or_default();
    Ok(Json(state.content.search(&term, &collections).await))
}

/// `GET /api/v1/content/progress`
async fn progress(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Json<ReadOutcome<UserProgress>> {
    let mut cache = session.cache.lock().await;
    Json(state.content.progress(&mut cache, session.user_id).await)
}
