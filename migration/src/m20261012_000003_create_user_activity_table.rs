use sea_orm_migration::prelude::*;

/// Creates the append-only `user_activity` log.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum UserActivity {
    Table,
    Id,
    UserId,
    ActivityType,
    Description,
    ResourceId,
    Details,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserProfile {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserActivity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserActivity::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserActivity::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserActivity::ActivityType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserActivity::Description).text().not_null())
                    .col(ColumnDef::new(UserActivity::ResourceId).integer().null())
                    .col(ColumnDef::new(UserActivity::Details).text().null())
                    .col(
                        ColumnDef::new(UserActivity::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_activity_user_id")
                            .from(UserActivity::Table, UserActivity::UserId)
                            .to(UserProfile::Table, UserProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_activity_user_type")
                    .table(UserActivity::Table)
                    .col(UserActivity::UserId)
                    .col(UserActivity::ActivityType)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserActivity::Table).to_owned())
            .await
    }
}
