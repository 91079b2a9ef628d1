use anyhow::Context as _;
use chrono::{Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use foyer_gate_schema::{
    approval_decisions, approval_tokens, login_events, magic_links, verification_codes,
};

use crate::domain::repository::{
    ApprovalDecisionRepository, ApprovalTokenRepository, LoginEventRepository, MagicLinkRepository,
    VerificationCodeRepository,
};
use crate::domain::types::{
    ApprovalAction, ApprovalDecision, ApprovalToken, LoginEvent, MagicLink, VerificationCode,
    VerificationPurpose,
};
use crate::error::GateError;

// ── Verification code repository ─────────────────────────────────────────────

#[derive(Clone)]
pub struct DbVerificationCodeRepository {
    pub db: DatabaseConnection,
}

impl VerificationCodeRepository for DbVerificationCodeRepository {
    async fn find_latest(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerificationCode>, GateError> {
        let model = verification_codes::Entity::find()
            .filter(verification_codes::Column::Email.eq(email))
            .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
            .order_by_desc(verification_codes::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find latest verification code")?;
        model.map(verification_from_model).transpose()
    }

    async fn find_active(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerificationCode>, GateError> {
        let now = Utc::now();
        let model = verification_codes::Entity::find()
            .filter(verification_codes::Column::Email.eq(email))
            .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(verification_codes::Column::VerifiedAt.is_null())
            .filter(verification_codes::Column::ExpiresAt.gt(now))
            .order_by_desc(verification_codes::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find active verification code")?;
        model.map(verification_from_model).transpose()
    }

    async fn delete_unverified(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<(), GateError> {
        verification_codes::Entity::delete_many()
            .filter(verification_codes::Column::Email.eq(email))
            .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(verification_codes::Column::VerifiedAt.is_null())
            .exec(&self.db)
            .await
            .context("delete unverified codes")?;
        Ok(())
    }

    async fn create(&self, code: &VerificationCode) -> Result<(), GateError> {
        verification_codes::ActiveModel {
            id: Set(code.id),
            purpose: Set(code.purpose.as_str().to_owned()),
            email: Set(code.email.clone()),
            user_id: Set(code.user_id),
            token: Set(code.token.clone()),
            code_hash: Set(code.code_hash.clone()),
            attempt_count: Set(code.attempt_count),
            locked_until: Set(code.locked_until),
            expires_at: Set(code.expires_at),
            verified_at: Set(code.verified_at),
            created_at: Set(code.created_at),
        }
        .insert(&self.db)
        .await
        .context("create verification code")?;
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
        lock_secs: i64,
    ) -> Result<i32, GateError> {
        // Atomic increment first, then read back; two racing failures both
        // count, and whichever reads the threshold sets the lock
        verification_codes::Entity::update_many()
            .filter(verification_codes::Column::Id.eq(id))
            .col_expr(
                verification_codes::Column::AttemptCount,
                Expr::col(verification_codes::Column::AttemptCount).add(1),
            )
            .exec(&self.db)
            .await
            .context("increment attempt count")?;

        let model = verification_codes::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("reload verification code")?
            .ok_or_else(|| anyhow::anyhow!("verification code {id} vanished"))?;

        if model.attempt_count >= max_attempts && model.locked_until.is_none() {
            verification_codes::Entity::update_many()
                .filter(verification_codes::Column::Id.eq(id))
                .filter(verification_codes::Column::LockedUntil.is_null())
                .col_expr(
                    verification_codes::Column::LockedUntil,
                    Expr::value(Some(Utc::now() + Duration::seconds(lock_secs))),
                )
                .exec(&self.db)
                .await
                .context("lock verification code")?;
        }

        Ok(model.attempt_count)
    }

    async fn mark_verified(&self, id: Uuid, user_id: Uuid) -> Result<bool, GateError> {
        let result = verification_codes::Entity::update_many()
            .filter(verification_codes::Column::Id.eq(id))
            .filter(verification_codes::Column::VerifiedAt.is_null())
            .col_expr(
                verification_codes::Column::VerifiedAt,
                Expr::value(Some(Utc::now())),
            )
            .col_expr(
                verification_codes::Column::CodeHash,
                Expr::value(None::<String>),
            )
            .col_expr(verification_codes::Column::UserId, Expr::value(Some(user_id)))
            .exec(&self.db)
            .await
            .context("mark verification code verified")?;
        Ok(result.rows_affected == 1)
    }
}

fn verification_from_model(
    model: verification_codes::Model,
) -> Result<VerificationCode, GateError> {
    let purpose = VerificationPurpose::from_str(&model.purpose)
        .ok_or_else(|| anyhow::anyhow!("unknown verification purpose {:?}", model.purpose))?;
    Ok(VerificationCode {
        id: model.id,
        purpose,
        email: model.email,
        user_id: model.user_id,
        token: model.token,
        code_hash: model.code_hash,
        attempt_count: model.attempt_count,
        locked_until: model.locked_until,
        expires_at: model.expires_at,
        verified_at: model.verified_at,
        created_at: model.created_at,
    })
}

// ── Magic link repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbMagicLinkRepository {
    pub db: DatabaseConnection,
}

impl MagicLinkRepository for DbMagicLinkRepository {
    async fn invalidate_unused(&self, user_id: Uuid) -> Result<(), GateError> {
        magic_links::Entity::update_many()
            .filter(magic_links::Column::UserId.eq(user_id))
            .filter(magic_links::Column::UsedAt.is_null())
            .col_expr(magic_links::Column::UsedAt, Expr::value(Some(Utc::now())))
            .exec(&self.db)
            .await
            .context("invalidate unused magic links")?;
        Ok(())
    }

    async fn create(&self, link: &MagicLink) -> Result<(), GateError> {
        magic_links::ActiveModel {
            id: Set(link.id),
            user_id: Set(link.user_id),
            email: Set(link.email.clone()),
            token: Set(link.token.clone()),
            ip_address: Set(link.ip_address.clone()),
            expires_at: Set(link.expires_at),
            used_at: Set(link.used_at),
            created_at: Set(link.created_at),
        }
        .insert(&self.db)
        .await
        .context("create magic link")?;
        Ok(())
    }

    async fn consume(&self, token: &str, email: &str) -> Result<Option<MagicLink>, GateError> {
        let now = Utc::now();
        let result = magic_links::Entity::update_many()
            .filter(magic_links::Column::Token.eq(token))
            .filter(magic_links::Column::Email.eq(email))
            .filter(magic_links::Column::UsedAt.is_null())
            .filter(magic_links::Column::ExpiresAt.gt(now))
            .col_expr(magic_links::Column::UsedAt, Expr::value(Some(now)))
            .exec(&self.db)
            .await
            .context("consume magic link")?;
        if result.rows_affected != 1 {
            return Ok(None);
        }
        let model = magic_links::Entity::find()
            .filter(magic_links::Column::Token.eq(token))
            .one(&self.db)
            .await
            .context("reload consumed magic link")?
            .ok_or_else(|| anyhow::anyhow!("consumed magic link vanished"))?;
        Ok(Some(magic_link_from_model(model)))
    }
}

fn magic_link_from_model(model: magic_links::Model) -> MagicLink {
    MagicLink {
        id: model.id,
        user_id: model.user_id,
        email: model.email,
        token: model.token,
        ip_address: model.ip_address,
        expires_at: model.expires_at,
        used_at: model.used_at,
        created_at: model.created_at,
    }
}

// ── Approval token repository ────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbApprovalTokenRepository {
    pub db: DatabaseConnection,
}

impl ApprovalTokenRepository for DbApprovalTokenRepository {
    async fn find_by_token(&self, token: &str) -> Result<Option<ApprovalToken>, GateError> {
        let model = approval_tokens::Entity::find()
            .filter(approval_tokens::Column::Token.eq(token))
            .one(&self.db)
            .await
            .context("find approval token")?;
        model.map(approval_token_from_model).transpose()
    }

    async fn invalidate_unused(
        &self,
        user_id: Uuid,
        action: ApprovalAction,
    ) -> Result<(), GateError> {
        approval_tokens::Entity::update_many()
            .filter(approval_tokens::Column::UserId.eq(user_id))
            .filter(approval_tokens::Column::Action.eq(action.as_str()))
            .filter(approval_tokens::Column::UsedAt.is_null())
            .col_expr(
                approval_tokens::Column::UsedAt,
                Expr::value(Some(Utc::now())),
            )
            .exec(&self.db)
            .await
            .context("invalidate unused approval tokens")?;
        Ok(())
    }

    async fn create(&self, token: &ApprovalToken) -> Result<(), GateError> {
        approval_tokens::ActiveModel {
            id: Set(token.id),
            user_id: Set(token.user_id),
            token: Set(token.token.clone()),
            action: Set(token.action.as_str().to_owned()),
            expires_at: Set(token.expires_at),
            used_at: Set(token.used_at),
            created_at: Set(token.created_at),
        }
        .insert(&self.db)
        .await
        .context("create approval token")?;
        Ok(())
    }

    async fn consume(&self, id: Uuid) -> Result<bool, GateError> {
        let result = approval_tokens::Entity::update_many()
            .filter(approval_tokens::Column::Id.eq(id))
            .filter(approval_tokens::Column::UsedAt.is_null())
            .col_expr(
                approval_tokens::Column::UsedAt,
                Expr::value(Some(Utc::now())),
            )
            .exec(&self.db)
            .await
            .context("consume approval token")?;
        Ok(result.rows_affected == 1)
    }
}

fn approval_token_from_model(model: approval_tokens::Model) -> Result<ApprovalToken, GateError> {
    let action = ApprovalAction::from_str(&model.action)
        .ok_or_else(|| anyhow::anyhow!("unknown approval action {:?}", model.action))?;
    Ok(ApprovalToken {
        id: model.id,
        user_id: model.user_id,
        token: model.token,
        action,
        expires_at: model.expires_at,
        used_at: model.used_at,
        created_at: model.created_at,
    })
}

// ── Approval decision repository ─────────────────────────────────────────────

#[derive(Clone)]
pub struct DbApprovalDecisionRepository {
    pub db: DatabaseConnection,
}

impl ApprovalDecisionRepository for DbApprovalDecisionRepository {
    async fn upsert(&self, decision: &ApprovalDecision) -> Result<(), GateError> {
        let model = approval_decisions::ActiveModel {
            user_id: Set(decision.user_id),
            approved: Set(decision.approved),
            decided_by: Set(decision.decided_by),
            decided_at: Set(decision.decided_at),
        };
        approval_decisions::Entity::insert(model)
            .on_conflict(
                OnConflict::column(approval_decisions::Column::UserId)
                    .update_columns([
                        approval_decisions::Column::Approved,
                        approval_decisions::Column::DecidedBy,
                        approval_decisions::Column::DecidedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .context("upsert approval decision")?;
        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<ApprovalDecision>, GateError> {
        let model = approval_decisions::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .context("find approval decision")?;
        Ok(model.map(|m| ApprovalDecision {
            user_id: m.user_id,
            approved: m.approved,
            decided_by: m.decided_by,
            decided_at: m.decided_at,
        }))
    }
}

// ── Login event repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLoginEventRepository {
    pub db: DatabaseConnection,
}

impl LoginEventRepository for DbLoginEventRepository {
    async fn record_login(&self, event: &LoginEvent) -> Result<(), GateError> {
        login_events::ActiveModel {
            id: Set(event.id),
            user_id: Set(event.user_id),
            ip_address: Set(event.ip_address.clone()),
            social_provider: Set(event.social_provider.clone()),
            created_at: Set(event.created_at),
            logged_out_at: Set(None),
        }
        .insert(&self.db)
        .await
        .context("record login event")?;
        Ok(())
    }

    async fn record_logout(&self, user_id: Uuid) -> Result<(), GateError> {
        let open = login_events::Entity::find()
            .filter(login_events::Column::UserId.eq(user_id))
            .filter(login_events::Column::LoggedOutAt.is_null())
            .order_by_desc(login_events::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find open login event")?;
        if let Some(open) = open {
            login_events::ActiveModel {
                id: Set(open.id),
                logged_out_at: Set(Some(Utc::now())),
                ..Default::default()
            }
            .update(&self.db)
            .await
            .context("record logout")?;
        }
        Ok(())
    }
}
