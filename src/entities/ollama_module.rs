use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ollama_module")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub module_order: i32,
    pub estimated_minutes: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ollama_lesson::Entity")]
    OllamaLesson,
}

impl Related<super::ollama_lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OllamaLesson.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
