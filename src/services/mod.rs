pub mod content_service;
pub mod lifecycle_service;

pub use content_service::{ContentService, ReadOutcome, SearchResults};
pub use lifecycle_service::{LifecycleService, RegistrationPolicy};
