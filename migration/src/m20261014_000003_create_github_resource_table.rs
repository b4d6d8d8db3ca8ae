use sea_orm_migration::prelude::*;

/// Creates the `github_resource` table of curated repositories.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum GithubResource {
    Table,
    Id,
    Name,
    Description,
    RepoUrl,
    Category,
    PrimaryLanguage,
    Tags,
    Stars,
    DownloadCount,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GithubResource::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GithubResource::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GithubResource::Name).string_len(300).not_null())
                    .col(ColumnDef::new(GithubResource::Description).text().not_null())
                    .col(ColumnDef::new(GithubResource::RepoUrl).string_len(500).not_null())
                    .col(
                        ColumnDef::new(GithubResource::Category)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GithubResource::PrimaryLanguage)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GithubResource::Tags)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(GithubResource::Stars)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GithubResource::DownloadCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GithubResource::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GithubResource::Table).to_owned())
            .await
    }
}
