use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MagicLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MagicLinks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MagicLinks::UserId).uuid().not_null())
                    .col(ColumnDef::new(MagicLinks::Email).string().not_null())
                    .col(
                        ColumnDef::new(MagicLinks::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MagicLinks::IpAddress).string().not_null())
                    .col(
                        ColumnDef::new(MagicLinks::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MagicLinks::UsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(MagicLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(MagicLinks::Table)
                    .col(MagicLinks::UserId)
                    .name("idx_magic_links_user_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MagicLinks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MagicLinks {
    Table,
    Id,
    UserId,
    Email,
    Token,
    IpAddress,
    ExpiresAt,
    UsedAt,
    CreatedAt,
}
