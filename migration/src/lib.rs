pub use sea_orm_migration::prelude::*;

mod m20261012_000001_create_identity_table;
mod m20261012_000002_create_user_profile_table;
mod m20261012_000003_create_user_activity_table;
mod m20261014_000001_create_knowledge_article_table;
mod m20261014_000002_create_ollama_course_tables;
mod m20261014_000003_create_github_resource_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261012_000001_create_identity_table::Migration),
            Box::new(m20261012_000002_create_user_profile_table::Migration),
            Box::new(m20261012_000003_create_user_activity_table::Migration),
            Box::new(m20261014_000001_create_knowledge_article_table::Migration),
            Box::new(m20261014_000002_create_ollama_course_tables::Migration),
            Box::new(m20261014_000003_create_github_resource_table::Migration),
        ]
    }
}
