//! Admin approval workflow: token issuance, token consumption with its
//! diagnostic ladder, and the approve/deny side effects shared by the token
//! path and the authenticated admin endpoints.

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::repository::{
    AccountGateway, ApprovalDecisionRepository, ApprovalTokenRepository, LoginEventRepository,
    Notifier,
};
use crate::domain::types::{
    Account, ApprovalAction, ApprovalDecision, ApprovalToken, LoginEvent, Role, Template,
};
use crate::error::GateError;
use crate::usecase::otp;

/// Fresh token triple for a newly registered user.
pub struct IssuedTokens {
    pub approve: String,
    pub deny: String,
    pub auto_login: String,
}

/// Issue one token per action, invalidating any unused predecessor of the
/// same action first. Reissue therefore replaces rather than accumulates.
pub async fn issue_tokens<T>(repo: &T, user_id: Uuid) -> Result<IssuedTokens, GateError>
where
    T: ApprovalTokenRepository,
{
    let mut out = Vec::with_capacity(3);
    for action in [
        ApprovalAction::Approve,
        ApprovalAction::Deny,
        ApprovalAction::AutoLogin,
    ] {
        repo.invalidate_unused(user_id, action).await?;
        let now = Utc::now();
        let token = ApprovalToken {
            id: Uuid::new_v4(),
            user_id,
            token: otp::generate_token(),
            action,
            expires_at: now + Duration::seconds(action.ttl_secs()),
            used_at: None,
            created_at: now,
        };
        repo.create(&token).await?;
        out.push(token.token);
    }
    let mut out = out.into_iter();
    Ok(IssuedTokens {
        approve: out.next().unwrap_or_default(),
        deny: out.next().unwrap_or_default(),
        auto_login: out.next().unwrap_or_default(),
    })
}

pub fn action_url(base_url: &str, action: &str, token: &str) -> String {
    format!(
        "{}/approvals/{action}?token={token}",
        base_url.trim_end_matches('/')
    )
}

pub fn auto_login_url(base_url: &str, token: &str) -> String {
    format!(
        "{}/auth/auto-login?token={token}",
        base_url.trim_end_matches('/')
    )
}

/// Human-readable detail for a reused approve/deny link, naming who decided
/// last and when if a decision is on record.
async fn already_used_detail<D, G>(
    decisions: &D,
    accounts: &G,
    user_id: Uuid,
) -> Result<String, GateError>
where
    D: ApprovalDecisionRepository,
    G: AccountGateway,
{
    let Some(decision) = decisions.find(user_id).await? else {
        return Ok("this link has already been used".to_owned());
    };
    let verb = if decision.approved { "approved" } else { "denied" };
    let who = match decision.decided_by {
        Some(id) => accounts
            .find_by_id(id)
            .await?
            .map(|a| a.display_name)
            .unwrap_or_else(|| "an administrator".to_owned()),
        None => "an administrator".to_owned(),
    };
    Ok(format!(
        "this user was already {verb} by {who} on {}",
        decision.decided_at.format("%Y-%m-%d %H:%M UTC")
    ))
}

/// Apply an approve/deny decision to `target` and fan out notifications.
///
/// Privileged accounts keep their role and are never suspended; the decision
/// record and approval flag are still written so the audit trail stays
/// truthful. Notifications are best-effort.
pub async fn apply_decision<D, G, N>(
    decisions: &D,
    accounts: &G,
    notifier: &N,
    admin_emails: &[String],
    target: &Account,
    approved: bool,
    actor: Option<Uuid>,
) -> Result<(), GateError>
where
    D: ApprovalDecisionRepository,
    G: AccountGateway,
    N: Notifier,
{
    let now = Utc::now();
    decisions
        .upsert(&ApprovalDecision {
            user_id: target.id,
            approved,
            decided_by: actor,
            decided_at: now,
        })
        .await?;
    accounts.set_approval_flag(target.id, approved).await?;

    if !target.role.is_privileged() {
        let role = if approved { Role::Member } else { Role::Guest };
        accounts.set_role(target.id, role).await?;
        if approved {
            if target.suspended {
                accounts.set_suspended(target.id, false).await?;
            }
        } else {
            accounts.set_suspended(target.id, true).await?;
        }
    }

    let actor_account = match actor {
        Some(id) => accounts.find_by_id(id).await?,
        None => None,
    };
    let actor_name = actor_account
        .as_ref()
        .map(|a| a.display_name.clone())
        .unwrap_or_else(|| "an administrator".to_owned());
    let actor_email = actor_account.as_ref().map(|a| a.email.clone());

    let template = if approved {
        Template::AccountApproved
    } else {
        Template::AccountDenied
    };
    if let Err(e) = notifier
        .send(&target.email, template, json!({ "name": target.display_name }))
        .await
    {
        tracing::warn!(recipient = %target.email, error = %e, "decision notification failed");
    }

    // Notify the other admins; the actor already knows what they did
    let notice = json!({
        "actor": actor_name,
        "target_email": target.email,
        "action": if approved { "approved" } else { "denied" },
        "decided_at": now.to_rfc3339(),
    });
    for admin in admin_emails {
        if actor_email.as_deref() == Some(admin.as_str()) {
            continue;
        }
        if let Err(e) = notifier
            .send(admin, Template::AdminActionNotice, notice.clone())
            .await
        {
            tracing::warn!(recipient = %admin, error = %e, "admin action notice failed");
        }
    }

    Ok(())
}

pub struct ConsumeApprovalTokenInput {
    pub token: String,
    pub expected_action: ApprovalAction,
    /// Authenticated admin identity, when the link was opened logged-in.
    pub actor: Option<Uuid>,
}

#[derive(Debug)]
pub struct ConsumeApprovalTokenOutput {
    pub user_id: Uuid,
    pub approved: bool,
}

pub struct ConsumeApprovalTokenUseCase<T, D, G, N>
where
    T: ApprovalTokenRepository,
    D: ApprovalDecisionRepository,
    G: AccountGateway,
    N: Notifier,
{
    pub tokens: T,
    pub decisions: D,
    pub accounts: G,
    pub notifier: N,
    pub admin_emails: Vec<String>,
}

impl<T, D, G, N> ConsumeApprovalTokenUseCase<T, D, G, N>
where
    T: ApprovalTokenRepository,
    D: ApprovalDecisionRepository,
    G: AccountGateway,
    N: Notifier,
{
    pub async fn execute(
        &self,
        input: ConsumeApprovalTokenInput,
    ) -> Result<ConsumeApprovalTokenOutput, GateError> {
        // Diagnostic order matters: not-found, wrong type, already used
        // (with who/when), expired. A wrong-type hit leaves the token unused.
        let token = self
            .tokens
            .find_by_token(&input.token)
            .await?
            .ok_or(GateError::TokenNotFound)?;

        if token.action != input.expected_action {
            return Err(GateError::TokenWrongType);
        }
        if token.used_at.is_some() {
            let detail =
                already_used_detail(&self.decisions, &self.accounts, token.user_id).await?;
            return Err(GateError::TokenAlreadyUsed(detail));
        }
        if token.is_expired() {
            return Err(GateError::TokenExpired);
        }

        let target = self
            .accounts
            .find_by_id(token.user_id)
            .await?
            .ok_or_else(|| {
                GateError::Internal(anyhow::anyhow!(
                    "approval token {} references missing user {}",
                    token.id,
                    token.user_id
                ))
            })?;

        // CAS used; the loser of a race sees the already-used outcome
        if !self.tokens.consume(token.id).await? {
            let detail =
                already_used_detail(&self.decisions, &self.accounts, token.user_id).await?;
            return Err(GateError::TokenAlreadyUsed(detail));
        }

        let approved = input.expected_action == ApprovalAction::Approve;
        apply_decision(
            &self.decisions,
            &self.accounts,
            &self.notifier,
            &self.admin_emails,
            &target,
            approved,
            input.actor,
        )
        .await?;

        Ok(ConsumeApprovalTokenOutput {
            user_id: target.id,
            approved,
        })
    }
}

pub struct AdminDecisionInput {
    pub user_id: Uuid,
    pub approved: bool,
    pub actor: Uuid,
}

/// Authenticated approve/deny from the admin screens.
pub struct AdminDecisionUseCase<D, G, N>
where
    D: ApprovalDecisionRepository,
    G: AccountGateway,
    N: Notifier,
{
    pub decisions: D,
    pub accounts: G,
    pub notifier: N,
    pub admin_emails: Vec<String>,
}

impl<D, G, N> AdminDecisionUseCase<D, G, N>
where
    D: ApprovalDecisionRepository,
    G: AccountGateway,
    N: Notifier,
{
    pub async fn execute(&self, input: AdminDecisionInput) -> Result<(), GateError> {
        let actor = self
            .accounts
            .find_by_id(input.actor)
            .await?
            .ok_or(GateError::Unauthorized)?;
        if !actor.role.is_privileged() {
            return Err(GateError::Forbidden);
        }

        let target = self
            .accounts
            .find_by_id(input.user_id)
            .await?
            .ok_or_else(|| GateError::Validation("unknown user".to_owned()))?;

        apply_decision(
            &self.decisions,
            &self.accounts,
            &self.notifier,
            &self.admin_emails,
            &target,
            input.approved,
            Some(actor.id),
        )
        .await
    }
}

pub struct AutoLoginInput {
    pub token: String,
    pub ip: String,
}

#[derive(Debug)]
pub struct AutoLoginOutput {
    pub user_id: Uuid,
    pub session_token: String,
}

/// Single-use login link shipped in the welcome email.
pub struct AutoLoginUseCase<T, G, L>
where
    T: ApprovalTokenRepository,
    G: AccountGateway,
    L: LoginEventRepository,
{
    pub tokens: T,
    pub accounts: G,
    pub login_events: L,
}

impl<T, G, L> AutoLoginUseCase<T, G, L>
where
    T: ApprovalTokenRepository,
    G: AccountGateway,
    L: LoginEventRepository,
{
    pub async fn execute(&self, input: AutoLoginInput) -> Result<AutoLoginOutput, GateError> {
        let token = self
            .tokens
            .find_by_token(&input.token)
            .await?
            .ok_or(GateError::TokenNotFound)?;

        if token.action != ApprovalAction::AutoLogin {
            return Err(GateError::TokenWrongType);
        }
        if token.used_at.is_some() {
            return Err(GateError::TokenAlreadyUsed(
                "this login link has already been used".to_owned(),
            ));
        }
        if token.is_expired() {
            return Err(GateError::TokenExpired);
        }

        let account = self
            .accounts
            .find_by_id(token.user_id)
            .await?
            .ok_or(GateError::TokenNotFound)?;
        if account.suspended {
            return Err(GateError::AccountSuspended);
        }

        if !self.tokens.consume(token.id).await? {
            return Err(GateError::TokenAlreadyUsed(
                "this login link has already been used".to_owned(),
            ));
        }

        let session_token = self.accounts.start_session(account.id).await?;
        self.login_events
            .record_login(&LoginEvent {
                id: Uuid::new_v4(),
                user_id: account.id,
                ip_address: input.ip,
                social_provider: Some("auto_login".to_owned()),
                created_at: Utc::now(),
            })
            .await?;

        Ok(AutoLoginOutput {
            user_id: account.id,
            session_token,
        })
    }
}

pub struct ResendApprovalInput {
    /// Any previously issued approve/deny token for the user, expired or not.
    pub token: String,
}

/// Reissue the approval email after the original links expired. Identified by
/// the stale token itself so the expiry page can offer a one-click resend.
pub struct ResendApprovalUseCase<T, D, G, N>
where
    T: ApprovalTokenRepository,
    D: ApprovalDecisionRepository,
    G: AccountGateway,
    N: Notifier,
{
    pub tokens: T,
    pub decisions: D,
    pub accounts: G,
    pub notifier: N,
    pub base_url: String,
    pub admin_emails: Vec<String>,
}

impl<T, D, G, N> ResendApprovalUseCase<T, D, G, N>
where
    T: ApprovalTokenRepository,
    D: ApprovalDecisionRepository,
    G: AccountGateway,
    N: Notifier,
{
    pub async fn execute(&self, input: ResendApprovalInput) -> Result<(), GateError> {
        let stale = self
            .tokens
            .find_by_token(&input.token)
            .await?
            .ok_or(GateError::TokenNotFound)?;
        if stale.action == ApprovalAction::AutoLogin {
            return Err(GateError::TokenWrongType);
        }

        // Nothing to resend once a decision is on record
        if self.decisions.find(stale.user_id).await?.is_some() {
            let detail =
                already_used_detail(&self.decisions, &self.accounts, stale.user_id).await?;
            return Err(GateError::TokenAlreadyUsed(detail));
        }

        let target = self
            .accounts
            .find_by_id(stale.user_id)
            .await?
            .ok_or(GateError::TokenNotFound)?;

        let issued = issue_tokens(&self.tokens, target.id).await?;
        let data = json!({
            "applicant_email": target.email,
            "applicant_name": target.display_name,
            "approve_url": action_url(&self.base_url, "approve", &issued.approve),
            "deny_url": action_url(&self.base_url, "deny", &issued.deny),
        });
        for admin in &self.admin_emails {
            if let Err(e) = self
                .notifier
                .send(admin, Template::AdminApprovalRequest, data.clone())
                .await
            {
                tracing::warn!(recipient = %admin, error = %e, "approval resend failed");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    Approved,
    Denied,
    Pending,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Pending => "pending",
        }
    }
}

#[derive(Debug)]
pub struct ApprovalStatusOutput {
    pub status: ApprovalStatus,
    pub decided_at: Option<chrono::DateTime<Utc>>,
}

pub struct CheckApprovalStatusUseCase<D>
where
    D: ApprovalDecisionRepository,
{
    pub decisions: D,
}

impl<D> CheckApprovalStatusUseCase<D>
where
    D: ApprovalDecisionRepository,
{
    pub async fn execute(&self, user_id: Uuid) -> Result<ApprovalStatusOutput, GateError> {
        Ok(match self.decisions.find(user_id).await? {
            Some(d) => ApprovalStatusOutput {
                status: if d.approved {
                    ApprovalStatus::Approved
                } else {
                    ApprovalStatus::Denied
                },
                decided_at: Some(d.decided_at),
            },
            None => ApprovalStatusOutput {
                status: ApprovalStatus::Pending,
                decided_at: None,
            },
        })
    }
}
