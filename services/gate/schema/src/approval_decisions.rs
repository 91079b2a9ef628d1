use sea_orm::entity::prelude::*;

/// Latest approve/deny decision per user. Upserted, not appended, so only
/// the most recent actor and timestamp are retained. No row means pending.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "approval_decisions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub approved: bool,
    /// Null when the decision came from an emailed token with no session.
    pub decided_by: Option<Uuid>,
    pub decided_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
