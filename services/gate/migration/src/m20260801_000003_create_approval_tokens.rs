use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApprovalTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalTokens::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApprovalTokens::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ApprovalTokens::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ApprovalTokens::Action).string().not_null())
                    .col(
                        ColumnDef::new(ApprovalTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalTokens::UsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ApprovalTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(ApprovalTokens::Table)
                    .col(ApprovalTokens::UserId)
                    .col(ApprovalTokens::Action)
                    .name("idx_approval_tokens_user_id_action")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApprovalTokens::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ApprovalTokens {
    Table,
    Id,
    UserId,
    Token,
    Action,
    ExpiresAt,
    UsedAt,
    CreatedAt,
}
