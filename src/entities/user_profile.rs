use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub status: String,
    pub email_verified: bool,
    pub profile_complete: bool,
    pub login_count: i32,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub suspension_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub last_login: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identity::Entity",
        from = "Column::Id",
        to = "super::identity::Column::Id"
    )]
    Identity,
    #[sea_orm(has_many = "super::user_activity::Entity")]
    UserActivity,
}

impl Related<super::identity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Identity.def()
    }
}

impl Related<super::user_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserActivity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
