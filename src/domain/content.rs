use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The content collections readable through the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    KnowledgeArticles,
    OllamaModules,
    OllamaLessons,
    GithubResources,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Collection {
    /// Collections searched when the caller does not pick a subset.
    pub const DEFAULT_SEARCH: [Self; 3] = [
        Self::KnowledgeArticles,
        Self::OllamaModules,
        Self::GithubResources,
    ];

    /// Parse a collection name. Short aliases (`articles`, `modules`, ...) are accepted.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "knowledge_articles" | "articles" => Some(Self::KnowledgeArticles),
            "ollama_modules" | "modules" => Some(Self::OllamaModules),
            "ollama_lessons" | "lessons" => Some(Self::OllamaLessons),
            "github_resources" | "resources" => Some(Self::GithubResources),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeArticles => "knowledge_articles",
            Self::OllamaModules => "ollama_modules",
            Self::OllamaLessons => "ollama_lessons",
            Self::GithubResources => "github_resources",
        }
    }

    /// Fields matched by a free-text search.
    pub const fn search_fields(&self) -> &'static [&'static str] {
        match self {
            Self::KnowledgeArticles => &["title", "content", "tags"],
            Self::OllamaModules => &["title", "description"],
            Self::OllamaLessons => &["title", "content"],
            Self::GithubResources => &["name", "description", "tags"],
        }
    }
}

/// A filter value. Each filterable field has exactly one value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Text(String),
    Flag(bool),
    Integer(i64),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
        }
    }
}

/// Equality filter on a named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: &'static str,
    pub value: FilterValue,
}

impl FieldFilter {
    pub fn text(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: FilterValue::Text(value.into()),
        }
    }

    pub const fn flag(field: &'static str, value: bool) -> Self {
        Self {
            field,
            value: FilterValue::Flag(value),
        }
    }

    pub fn integer(field: &'static str, value: impl Into<i64>) -> Self {
        Self {
            field,
            value: FilterValue::Integer(value.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub descending: bool,
}

impl OrderBy {
    pub const fn asc(field: &'static str) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// A provider-side read: equality filters, optional search term, ordering and limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub collection: Collection,
    pub filters: Vec<FieldFilter>,
    pub search: Option<String>,
    pub order: Vec<OrderBy>,
    pub limit: Option<u64>,
}

impl Select {
    pub const fn table(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            search: None,
            order: Vec::new(),
            limit: None,
        }
    }

    /// Case-insensitive substring search over the collection's search fields.
    pub fn matching(collection: Collection, term: &str) -> Self {
        Self {
            search: Some(term.to_string()),
            ..Self::table(collection)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArticleFilter {
    pub category: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModuleFilter {
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourceFilter {
    pub category: Option<String>,
    pub language: Option<String>,
}

/// A cacheable list read, one closed filter shape per collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentQuery {
    Articles(ArticleFilter),
    Modules(ModuleFilter),
    Lessons { module_id: i32 },
    Resources(ResourceFilter),
}

impl ContentQuery {
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Articles(_) => Collection::KnowledgeArticles,
            Self::Modules(_) => Collection::OllamaModules,
            Self::Lessons { .. } => Collection::OllamaLessons,
            Self::Resources(_) => Collection::GithubResources,
        }
    }

    pub fn filters(&self) -> Vec<FieldFilter> {
        let mut filters = Vec::new();
        match self {
            Self::Articles(f) => {
                if let Some(category) = non_blank(f.category.as_deref()) {
                    filters.push(FieldFilter::text("category", category));
                }
                if let Some(featured) = f.featured {
                    filters.push(FieldFilter::flag("featured", featured));
                }
            }
            Self::Modules(f) => {
                if let Some(difficulty) = non_blank(f.difficulty.as_deref()) {
                    filters.push(FieldFilter::text("difficulty", difficulty));
                }
            }
            Self::Lessons { module_id } => {
                filters.push(FieldFilter::integer("module_id", *module_id));
            }
            Self::Resources(f) => {
                if let Some(category) = non_blank(f.category.as_deref()) {
                    filters.push(FieldFilter::text("category", category));
                }
                if let Some(language) = non_blank(f.language.as_deref()) {
                    filters.push(FieldFilter::text("primary_language", language));
                }
            }
        }
        filters
    }

    /// The provider read, with each collection's fixed sort order.
    pub fn to_select(&self) -> Select {
        let order = match self {
            Self::Articles(_) => vec![OrderBy::desc("created_at"), OrderBy::desc("id")],
            Self::Modules(_) => vec![OrderBy::asc("module_order"), OrderBy::asc("id")],
            Self::Lessons { .. } => vec![OrderBy::asc("lesson_order"), OrderBy::asc("id")],
            Self::Resources(_) => vec![
                OrderBy::desc("download_count"),
                OrderBy::desc("stars"),
                OrderBy::asc("id"),
            ],
        };
        Select {
            filters: self.filters(),
            order,
            ..Select::table(self.collection())
        }
    }
}

/// A single-record read by natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLookup {
    ArticleBySlug(String),
    ModuleById(i32),
    ResourceById(i32),
}

impl ContentLookup {
    pub const fn collection(&self) -> Collection {
        match self {
            Self::ArticleBySlug(_) => Collection::KnowledgeArticles,
            Self::ModuleById(_) => Collection::OllamaModules,
            Self::ResourceById(_) => Collection::GithubResources,
        }
    }

    pub fn filters(&self) -> Vec<FieldFilter> {
        match self {
            Self::ArticleBySlug(slug) => vec![FieldFilter::text("slug", slug.trim())],
            Self::ModuleById(id) | Self::ResourceById(id) => vec![FieldFilter::integer("id", *id)],
        }
    }

    pub fn to_select(&self) -> Select {
        Select {
            filters: self.filters(),
            limit: Some(1),
            ..Select::table(self.collection())
        }
    }
}

/// A filter set normalized for cache keys: one entry per field, sorted by field name.
///
/// Values are kept typed, so two sets compare equal only when every field and value does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CanonicalFilters(Vec<(&'static str, FilterValue)>);

impl CanonicalFilters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("all");
        }
        for (i, (field, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            match value {
                FilterValue::Text(s) => write!(f, "{field}={s:?}")?,
                other => write!(f, "{field}={other}")?,
            }
        }
        Ok(())
    }
}

/// Order-independent form of a filter set. A repeated field keeps its last value.
pub fn canonical_filters(filters: &[FieldFilter]) -> CanonicalFilters {
    let sorted: BTreeMap<&'static str, FilterValue> = filters
        .iter()
        .map(|f| (f.field, f.value.clone()))
        .collect();
    CanonicalFilters(sorted.into_iter().collect())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Split a stored comma-separated tag list.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub featured: bool,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub module_order: i32,
    pub estimated_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i32,
    pub module_id: i32,
    pub title: String,
    pub content: String,
    pub lesson_order: i32,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub repo_url: String,
    pub category: String,
    pub primary_language: Option<String>,
    pub tags: Vec<String>,
    pub stars: i32,
    pub download_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentRecord {
    Article(Article),
    Module(CourseModule),
    Lesson(Lesson),
    Resource(Resource),
}

impl ContentRecord {
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Article(_) => Collection::KnowledgeArticles,
            Self::Module(_) => Collection::OllamaModules,
            Self::Lesson(_) => Collection::OllamaLessons,
            Self::Resource(_) => Collection::GithubResources,
        }
    }

    pub const fn id(&self) -> i32 {
        match self {
            Self::Article(a) => a.id,
            Self::Module(m) => m.id,
            Self::Lesson(l) => l.id,
            Self::Resource(r) => r.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Article(a) => &a.title,
            Self::Module(m) => &m.title,
            Self::Lesson(l) => &l.title,
            Self::Resource(r) => &r.name,
        }
    }
}
