use sea_orm::entity::prelude::*;

/// One-time 6-digit verification code, shared by OTP registration and
/// password reset and discriminated by `purpose`.
/// `code_hash` is an argon2id PHC string, nulled once the row is verified.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "verification_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// "registration" or "password_reset".
    pub purpose: String,
    pub email: String,
    /// Null while the registration flow has not created an account yet.
    pub user_id: Option<Uuid>,
    /// Legacy link token; unused by the code flows but kept unique.
    #[sea_orm(unique)]
    pub token: String,
    pub code_hash: Option<String>,
    pub attempt_count: i32,
    pub locked_until: Option<chrono::DateTime<chrono::Utc>>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
