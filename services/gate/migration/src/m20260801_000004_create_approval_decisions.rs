use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApprovalDecisions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalDecisions::UserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApprovalDecisions::Approved)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalDecisions::DecidedBy).uuid())
                    .col(
                        ColumnDef::new(ApprovalDecisions::DecidedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApprovalDecisions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ApprovalDecisions {
    Table,
    UserId,
    Approved,
    DecidedBy,
    DecidedAt,
}
