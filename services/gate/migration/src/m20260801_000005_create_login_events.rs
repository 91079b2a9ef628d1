use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoginEvents::UserId).uuid().not_null())
                    .col(ColumnDef::new(LoginEvents::IpAddress).string().not_null())
                    .col(ColumnDef::new(LoginEvents::SocialProvider).string())
                    .col(
                        ColumnDef::new(LoginEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoginEvents::LoggedOutAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(LoginEvents::Table)
                    .col(LoginEvents::UserId)
                    .col(LoginEvents::CreatedAt)
                    .name("idx_login_events_user_id_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoginEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LoginEvents {
    Table,
    Id,
    UserId,
    IpAddress,
    SocialProvider,
    CreatedAt,
    LoggedOutAt,
}
