use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::repository::{
    AccountGateway, LoginEventRepository, Notifier, RateLimiter, VerificationCodeRepository,
};
use crate::domain::types::{
    CODE_LOCKOUT_SECS, CODE_MAX_ATTEMPTS, CODE_RESEND_COOLDOWN_SECS, LoginEvent,
    RATE_LIMIT_WINDOW_SECS, RateLimitAction, REQUEST_RATE_LIMIT, Template, VERIFY_RATE_LIMIT,
    VerificationCode, VerificationPurpose,
};
use crate::error::GateError;
use crate::usecase::otp;
use crate::usecase::registration::{normalize_email, validate_password};

pub struct RequestPasswordResetInput {
    pub email: String,
    pub ip: String,
}

pub struct RequestPasswordResetUseCase<V, R, G, N>
where
    V: VerificationCodeRepository,
    R: RateLimiter,
    G: AccountGateway,
    N: Notifier,
{
    pub codes: V,
    pub rate_limiter: R,
    pub accounts: G,
    pub notifier: N,
}

impl<V, R, G, N> RequestPasswordResetUseCase<V, R, G, N>
where
    V: VerificationCodeRepository,
    R: RateLimiter,
    G: AccountGateway,
    N: Notifier,
{
    /// Enumeration-safe: an unknown email gets the same success as a known
    /// one, it just produces no code.
    pub async fn execute(&self, input: RequestPasswordResetInput) -> Result<(), GateError> {
        let allowed = self
            .rate_limiter
            .check_and_record(
                &input.ip,
                RateLimitAction::PasswordReset,
                REQUEST_RATE_LIMIT,
                RATE_LIMIT_WINDOW_SECS,
            )
            .await?;
        if !allowed {
            return Err(GateError::RateLimited);
        }

        let email = normalize_email(&input.email)?;

        let Some(account) = self.accounts.find_by_email(&email).await? else {
            return Ok(());
        };

        let latest = self
            .codes
            .find_latest(&email, VerificationPurpose::PasswordReset)
            .await?;
        if let Some(latest) = latest {
            if latest.created_at > Utc::now() - Duration::seconds(CODE_RESEND_COOLDOWN_SECS) {
                return Err(GateError::CooldownActive);
            }
        }

        self.codes
            .delete_unverified(&email, VerificationPurpose::PasswordReset)
            .await?;

        let plaintext = otp::generate_code();
        let now = Utc::now();
        let record = VerificationCode {
            id: Uuid::new_v4(),
            purpose: VerificationPurpose::PasswordReset,
            email: email.clone(),
            user_id: Some(account.id),
            token: otp::generate_token(),
            code_hash: Some(otp::hash_code(&plaintext)?),
            attempt_count: 0,
            locked_until: None,
            expires_at: now + Duration::seconds(VerificationPurpose::PasswordReset.ttl_secs()),
            verified_at: None,
            created_at: now,
        };
        self.codes.create(&record).await?;

        self.notifier
            .send(
                &email,
                Template::PasswordResetCode,
                json!({
                    "code": plaintext,
                    "expires_in_minutes": VerificationPurpose::PasswordReset.ttl_secs() / 60,
                }),
            )
            .await?;

        Ok(())
    }
}

pub struct VerifyPasswordResetInput {
    pub email: String,
    pub code: String,
    pub new_password: String,
    pub ip: String,
}

#[derive(Debug)]
pub struct VerifyPasswordResetOutput {
    pub user_id: Uuid,
    pub session_token: String,
}

pub struct VerifyPasswordResetUseCase<V, R, G, L>
where
    V: VerificationCodeRepository,
    R: RateLimiter,
    G: AccountGateway,
    L: LoginEventRepository,
{
    pub codes: V,
    pub rate_limiter: R,
    pub accounts: G,
    pub login_events: L,
}

impl<V, R, G, L> VerifyPasswordResetUseCase<V, R, G, L>
where
    V: VerificationCodeRepository,
    R: RateLimiter,
    G: AccountGateway,
    L: LoginEventRepository,
{
    pub async fn execute(
        &self,
        input: VerifyPasswordResetInput,
    ) -> Result<VerifyPasswordResetOutput, GateError> {
        let allowed = self
            .rate_limiter
            .check_and_record(
                &input.ip,
                RateLimitAction::PasswordResetVerify,
                VERIFY_RATE_LIMIT,
                RATE_LIMIT_WINDOW_SECS,
            )
            .await?;
        if !allowed {
            return Err(GateError::RateLimited);
        }

        let email = normalize_email(&input.email)?;
        validate_password(&input.new_password)?;
        let code = input.code.trim();
        if code.len() != otp::CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(GateError::Validation("the code is 6 digits".to_owned()));
        }

        let record = self
            .codes
            .find_active(&email, VerificationPurpose::PasswordReset)
            .await?
            .ok_or(GateError::CodeNotFound)?;

        if record.is_locked() {
            return Err(GateError::TooManyAttempts);
        }

        let hash = record.code_hash.as_deref().ok_or(GateError::CodeNotFound)?;
        if !otp::verify_code(code, hash)? {
            let attempts = self
                .codes
                .record_failed_attempt(record.id, CODE_MAX_ATTEMPTS, CODE_LOCKOUT_SECS)
                .await?;
            if attempts >= CODE_MAX_ATTEMPTS {
                return Err(GateError::TooManyAttempts);
            }
            return Err(GateError::InvalidCode {
                remaining: CODE_MAX_ATTEMPTS - attempts,
            });
        }

        let user_id = record.user_id.ok_or_else(|| {
            GateError::Internal(anyhow::anyhow!(
                "password reset record {} has no user id",
                record.id
            ))
        })?;

        // Consume before writing the password: racing verifies must not both
        // reach set_password. A gateway failure past this point burns the
        // code and the user requests a fresh one after the cooldown.
        if !self.codes.mark_verified(record.id, user_id).await? {
            return Err(GateError::CodeNotFound);
        }

        self.accounts
            .set_password(user_id, &input.new_password)
            .await?;

        // Reset success implies login, no second step
        let session_token = self.accounts.start_session(user_id).await?;
        self.login_events
            .record_login(&LoginEvent {
                id: Uuid::new_v4(),
                user_id,
                ip_address: input.ip,
                social_provider: Some("password_reset".to_owned()),
                created_at: Utc::now(),
            })
            .await?;

        Ok(VerifyPasswordResetOutput {
            user_id,
            session_token,
        })
    }
}
