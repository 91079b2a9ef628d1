use sea_orm::entity::prelude::*;

/// One row per successful session start; logout stamps the newest open row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "login_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip_address: String,
    /// Provider tag for social logins; null for credential/code logins.
    pub social_provider: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub logged_out_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
