use sea_orm_migration::prelude::*;

/// Creates the `knowledge_article` table.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum KnowledgeArticle {
    Table,
    Id,
    Slug,
    Title,
    Summary,
    Content,
    Category,
    Tags,
    Featured,
    Author,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(KnowledgeArticle::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(KnowledgeArticle::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(KnowledgeArticle::Slug)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(KnowledgeArticle::Title)
                            .string_len(300)
                            .not_null(),
                    )
                    .col(ColumnDef::new(KnowledgeArticle::Summary).text().null())
                    .col(ColumnDef::new(KnowledgeArticle::Content).text().not_null())
                    .col(
                        ColumnDef::new(KnowledgeArticle::Category)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(KnowledgeArticle::Tags)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(KnowledgeArticle::Featured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(KnowledgeArticle::Author).string_len(200).null())
                    .col(
                        ColumnDef::new(KnowledgeArticle::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(KnowledgeArticle::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_knowledge_article_category")
                    .table(KnowledgeArticle::Table)
                    .col(KnowledgeArticle::Category)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(KnowledgeArticle::Table).to_owned())
            .await
    }
}
