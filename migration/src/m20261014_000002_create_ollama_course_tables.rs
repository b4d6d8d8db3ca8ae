use sea_orm_migration::prelude::*;

/// Creates the `ollama_module` and `ollama_lesson` tables.
///
/// Lessons belong to a module and are removed with it.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum OllamaModule {
    Table,
    Id,
    Title,
    Description,
    Difficulty,
    ModuleOrder,
    EstimatedMinutes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OllamaLesson {
    Table,
    Id,
    ModuleId,
    Title,
    Content,
    LessonOrder,
    DurationMinutes,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OllamaModule::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OllamaModule::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OllamaModule::Title).string_len(300).not_null())
                    .col(ColumnDef::new(OllamaModule::Description).text().not_null())
                    .col(
                        ColumnDef::new(OllamaModule::Difficulty)
                            .string_len(20)
                            .not_null()
                            .default("beginner"),
                    )
                    .col(
                        ColumnDef::new(OllamaModule::ModuleOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OllamaModule::EstimatedMinutes).integer().null())
                    .col(
                        ColumnDef::new(OllamaModule::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OllamaLesson::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OllamaLesson::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OllamaLesson::ModuleId).integer().not_null())
                    .col(ColumnDef::new(OllamaLesson::Title).string_len(300).not_null())
                    .col(ColumnDef::new(OllamaLesson::Content).text().not_null())
                    .col(
                        ColumnDef::new(OllamaLesson::LessonOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OllamaLesson::DurationMinutes).integer().null())
                    .col(
                        ColumnDef::new(OllamaLesson::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ollama_lesson_module_id")
                            .from(OllamaLesson::Table, OllamaLesson::ModuleId)
                            .to(OllamaModule::Table, OllamaModule::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OllamaLesson::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OllamaModule::Table).to_owned())
            .await
    }
}
