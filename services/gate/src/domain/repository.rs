#![allow(async_fn_in_trait)]

use uuid::Uuid;

use crate::domain::types::{
    Account, ApprovalAction, ApprovalDecision, ApprovalToken, LoginEvent, MagicLink,
    RateLimitAction, RegistrationProfile, Role, Template, VerificationCode, VerificationPurpose,
};
use crate::error::GateError;

/// Store for 6-digit verification codes (registration and password reset).
pub trait VerificationCodeRepository: Send + Sync {
    /// Newest row for (email, purpose) regardless of state. Drives the
    /// resend cooldown, which counts from the last code sent even if it was
    /// since verified.
    async fn find_latest(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerificationCode>, GateError>;

    /// Newest unverified, unexpired row for (email, purpose).
    async fn find_active(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerificationCode>, GateError>;

    /// Delete unverified rows for (email, purpose). New code invalidates old.
    async fn delete_unverified(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<(), GateError>;

    async fn create(&self, code: &VerificationCode) -> Result<(), GateError>;

    /// Atomically increment the attempt counter; lock the row for
    /// `lock_secs` once the counter reaches `max_attempts`. Returns the
    /// post-increment count.
    async fn record_failed_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
        lock_secs: i64,
    ) -> Result<i32, GateError>;

    /// Compare-and-set unverified → verified (clears the code hash and, for
    /// registration, stamps the created account id). Returns false when a
    /// concurrent caller already won.
    async fn mark_verified(&self, id: Uuid, user_id: Uuid) -> Result<bool, GateError>;
}

/// Store for single-use magic links.
pub trait MagicLinkRepository: Send + Sync {
    /// Mark every unused link for the user used. Requesting a new link
    /// invalidates the rest.
    async fn invalidate_unused(&self, user_id: Uuid) -> Result<(), GateError>;

    async fn create(&self, link: &MagicLink) -> Result<(), GateError>;

    /// Compare-and-set consume of the link matching (token, email), unused
    /// and unexpired. `None` covers not-found, wrong email, already used and
    /// expired alike; callers must not tell those apart.
    async fn consume(&self, token: &str, email: &str) -> Result<Option<MagicLink>, GateError>;
}

/// Store for approve/deny/auto-login tokens.
pub trait ApprovalTokenRepository: Send + Sync {
    async fn find_by_token(&self, token: &str) -> Result<Option<ApprovalToken>, GateError>;

    /// Mark unused tokens of one action for a user used. Reissue invalidates.
    async fn invalidate_unused(&self, user_id: Uuid, action: ApprovalAction)
    -> Result<(), GateError>;

    async fn create(&self, token: &ApprovalToken) -> Result<(), GateError>;

    /// Compare-and-set unused → used. Returns false when a concurrent caller
    /// already consumed the token.
    async fn consume(&self, id: Uuid) -> Result<bool, GateError>;
}

/// Store for the latest approve/deny decision per user.
pub trait ApprovalDecisionRepository: Send + Sync {
    /// Insert or replace the decision for the user (last-write-wins).
    async fn upsert(&self, decision: &ApprovalDecision) -> Result<(), GateError>;

    async fn find(&self, user_id: Uuid) -> Result<Option<ApprovalDecision>, GateError>;
}

/// Audit log of session starts.
pub trait LoginEventRepository: Send + Sync {
    async fn record_login(&self, event: &LoginEvent) -> Result<(), GateError>;

    /// Stamp the newest open login row for the user, if any.
    async fn record_logout(&self, user_id: Uuid) -> Result<(), GateError>;
}

/// Sliding-window counter keyed by (ip, action). A denied check records
/// nothing; an allowed check records the attempt in the same call.
pub trait RateLimiter: Send + Sync {
    async fn check_and_record(
        &self,
        ip: &str,
        action: RateLimitAction,
        max_attempts: u32,
        window_secs: i64,
    ) -> Result<bool, GateError>;
}

/// Port to the CMS user store. The gateway owns accounts, credentials and
/// roles; the gate only addresses them by opaque id.
pub trait AccountGateway: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, GateError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, GateError>;

    /// Create an account. Returns `GateError::AccountExists` on conflict.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        profile: &RegistrationProfile,
    ) -> Result<Uuid, GateError>;

    /// Check credentials. `None` for unknown email and wrong password alike.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Uuid>, GateError>;

    /// Assign a role. The gateway ignores the call for privileged accounts;
    /// the orchestrator additionally never asks for a privileged downgrade.
    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<(), GateError>;

    async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), GateError>;

    async fn set_email_verified(&self, user_id: Uuid) -> Result<(), GateError>;

    async fn set_suspended(&self, user_id: Uuid, suspended: bool) -> Result<(), GateError>;

    /// Mirror of the approval decision, kept on the account for downstream
    /// content gating.
    async fn set_approval_flag(&self, user_id: Uuid, approved: bool) -> Result<(), GateError>;

    /// Open an authenticated session; returns the opaque session token the
    /// CMS minted.
    async fn start_session(&self, user_id: Uuid) -> Result<String, GateError>;

    async fn end_session(&self, user_id: Uuid) -> Result<(), GateError>;
}

/// Templated email dispatch. Bounded timeout; never retried.
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        template: Template,
        data: serde_json::Value,
    ) -> Result<(), GateError>;
}

/// Opaque CAPTCHA verification against the configured provider.
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: &str, action: &str) -> Result<bool, GateError>;
}
