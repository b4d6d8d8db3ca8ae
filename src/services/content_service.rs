use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::cache::CacheKey;
use crate::domain::{
    ActivityQuery, Collection, ContentLookup, ContentQuery, ContentRecord, FieldFilter,
    NewActivity, Select, UserProgress, activity_types,
};
use crate::error::ServiceError;
use crate::provider::{Provider, ProviderError};
use crate::sessions::SessionCache;

/// A read that never fails: provider errors degrade to an empty value plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadOutcome<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ReadOutcome<T> {
    pub const fn ok(data: T) -> Self {
        Self { data, error: None }
    }

    pub fn degraded(data: T, error: &ProviderError) -> Self {
        Self {
            data,
            error: Some(error.to_string()),
        }
    }

    pub const fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-collection search results. A failed collection has an empty result and an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub results: BTreeMap<Collection, Vec<ContentRecord>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<Collection, String>,
}

/// Cached, failure-tolerant access to the content collections.
pub struct ContentService {
    provider: Arc<dyn Provider>,
}

impl ContentService {
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// List a collection, served from `cache` while the entry is fresh.
    pub async fn fetch(
        &self,
        cache: &mut SessionCache,
        query: &ContentQuery,
    ) -> ReadOutcome<Vec<ContentRecord>> {
        let key = CacheKey::for_query(query);
        if let Some(records) = cache.content.get(&key) {
            tracing::debug!(collection = %key.collection, key = %key.canonical, single = key.single, "cache hit");
            return ReadOutcome::ok(records);
        }

        tracing::debug!(collection = %key.collection, key = %key.canonical, "cache miss");
        match self.provider.select(&query.to_select()).await {
            Ok(records) => {
                cache.content.insert(key, records.clone());
                ReadOutcome::ok(records)
            }
            Err(e) => {
                tracing::warn!(collection = %key.collection, error = %e, "content read degraded");
                ReadOutcome::degraded(Vec::new(), &e)
            }
        }
    }

    /// Fetch one record by natural key. Only found records are cached.
    pub async fn fetch_one(
        &self,
        cache: &mut SessionCache,
        lookup: &ContentLookup,
    ) -> ReadOutcome<Option<ContentRecord>> {
        let key = CacheKey::for_lookup(lookup);
        if let Some(records) = cache.content.get(&key) {
            tracing::debug!(collection = %key.collection, key = %key.canonical, single = key.single, "cache hit");
            return ReadOutcome::ok(records.into_iter().next());
        }

        match self.provider.select(&lookup.to_select()).await {
            Ok(records) => {
                let record = records.into_iter().next();
                if let Some(found) = &record {
                    cache.content.insert(key, vec![found.clone()]);
                }
                ReadOutcome::ok(record)
            }
            Err(e) => {
                tracing::warn!(collection = %key.collection, error = %e, "content read degraded");
                ReadOutcome::degraded(None, &e)
            }
        }
    }

    /// Read-modify-write `download_count + 1`, then drop every cached resource entry.
    ///
    /// # Errors
    ///
    /// Returns `Provider(NotFound)` for an unknown resource, or the provider's failure.
    pub async fn increment_popularity(
        &self,
        cache: &mut SessionCache,
        resource_id: i32,
    ) -> Result<i64, ServiceError> {
        let current = self
            .provider
            .select(&ContentLookup::ResourceById(resource_id).to_select())
            .await?;
        let Some(ContentRecord::Resource(resource)) = current.into_iter().next() else {
            return Err(ProviderError::NotFound(format!("resource {resource_id}")).into());
        };

        let next = resource.download_count.saturating_add(1);
        let written = self.provider.update_download_count(resource_id, next).await;

        // The write may have landed even if the call reported failure
        let dropped = cache
            .content
            .invalidate_where(|key| key.collection == Collection::GithubResources);
        tracing::debug!(resource_id, dropped, "resource cache invalidated");

        match written? {
            0 => Err(ProviderError::NotFound(format!("resource {resource_id}")).into()),
            _ => Ok(next),
        }
    }

    /// Case-insensitive substring search, never cached. A blank term matches nothing.
    pub async fn search(&self, term: &str, collections: &[Collection]) -> SearchResults {
        let collections: &[Collection] = if collections.is_empty() {
            &Collection::DEFAULT_SEARCH
        } else {
            collections
        };

        let mut out = SearchResults::default();
        let term = term.trim();
        for &collection in collections {
            if term.is_empty() {
                out.results.insert(collection, Vec::new());
                continue;
            }
            match self.provider.select(&Select::matching(collection, term)).await {
                Ok(records) => {
                    out.results.insert(collection, records);
                }
                Err(e) => {
                    tracing::warn!(%collection, error = %e, "search degraded");
                    out.results.insert(collection, Vec::new());
                    out.errors.insert(collection, e.to_string());
                }
            }
        }
        out
    }

    /// Count a download and record it against `user_id`.
    ///
    /// # Errors
    ///
    /// Fails only when the popularity increment fails.
    pub async fn download_resource(
        &self,
        cache: &mut SessionCache,
        user_id: Uuid,
        resource_id: i32,
    ) -> Result<i64, ServiceError> {
        let downloads = self.increment_popularity(cache, resource_id).await?;
        self.log(
            NewActivity::new(
                user_id,
                activity_types::RESOURCE_DOWNLOADED,
                format!("Downloaded resource {resource_id}"),
            )
            .with_resource(resource_id)
            .with_details(json!({ "download_count": downloads })),
        )
        .await;
        cache.progress.invalidate(&user_id);
        Ok(downloads)
    }

    /// Mark a lesson complete for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `Provider(NotFound)` for an unknown lesson.
    pub async fn complete_lesson(
        &self,
        cache: &mut SessionCache,
        user_id: Uuid,
        lesson_id: i32,
    ) -> Result<(), ServiceError> {
        let lookup = Select {
            filters: vec![FieldFilter::integer("id", lesson_id)],
            limit: Some(1),
            ..Select::table(Collection::OllamaLessons)
        };
        let Some(lesson) = self.provider.select(&lookup).await?.into_iter().next() else {
            return Err(ProviderError::NotFound(format!("lesson {lesson_id}")).into());
        };

        self.log(
            NewActivity::new(
                user_id,
                activity_types::LESSON_COMPLETED,
                format!("Completed lesson: {}", lesson.title()),
            )
            .with_resource(lesson_id),
        )
        .await;
        cache.progress.invalidate(&user_id);
        Ok(())
    }

    /// Learning progress derived from the activity log, cached like content.
    pub async fn progress(
        &self,
        cache: &mut SessionCache,
        user_id: Uuid,
    ) -> ReadOutcome<UserProgress> {
        if let Some(progress) = cache.progress.get(&user_id) {
            return ReadOutcome::ok(progress);
        }

        let query = ActivityQuery {
            user_id: Some(user_id),
            activity_type: None,
            limit: None,
        };
        match self.provider.select_activities(&query).await {
            Ok(entries) => {
                let progress = UserProgress::from_activities(&entries);
                cache.progress.insert(user_id, progress.clone());
                ReadOutcome::ok(progress)
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "progress read degraded");
                ReadOutcome::degraded(UserProgress::default(), &e)
            }
        }
    }

    async fn log(&self, entry: NewActivity) {
        if let Err(e) = self.provider.log_activity(&entry).await {
            tracing::warn!(
                user_id = %entry.user_id,
                activity_type = %entry.activity_type,
                error = %e,
                "activity not recorded"
            );
        }
    }
}
