pub mod github_resource;
pub mod identity;
pub mod knowledge_article;
pub mod ollama_lesson;
pub mod ollama_module;
pub mod user_activity;
pub mod user_profile;
