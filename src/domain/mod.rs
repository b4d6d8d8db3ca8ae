//! Domain types shared by the provider seam, the services and the HTTP layer.

pub mod content;
pub mod user;

pub use content::{
    Article, ArticleFilter, Collection, ContentLookup, ContentQuery, ContentRecord, CourseModule,
    FieldFilter, FilterValue, Lesson, ModuleFilter, OrderBy, Resource, ResourceFilter, Select,
};
pub use user::{
    AccountStatus, ActivityLogEntry, ActivityQuery, NewActivity, ProfileUpdate, Role,
    StatusAction, StatusChange, UserProfile, UserProgress, UserStatistics, activity_types,
};
