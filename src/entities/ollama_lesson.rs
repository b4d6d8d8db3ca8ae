use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ollama_lesson")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub module_id: i32,
    pub title: String,
    pub content: String,
    pub lesson_order: i32,
    pub duration_minutes: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ollama_module::Entity",
        from = "Column::ModuleId",
        to = "super::ollama_module::Column::Id"
    )]
    OllamaModule,
}

impl Related<super::ollama_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OllamaModule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
