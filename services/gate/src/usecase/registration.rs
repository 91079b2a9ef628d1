use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::repository::{
    AccountGateway, ApprovalTokenRepository, CaptchaVerifier, Notifier, RateLimiter,
    VerificationCodeRepository,
};
use crate::domain::types::{
    CODE_LOCKOUT_SECS, CODE_MAX_ATTEMPTS, CODE_RESEND_COOLDOWN_SECS, MIN_PASSWORD_LEN,
    RATE_LIMIT_WINDOW_SECS, REQUEST_RATE_LIMIT, RateLimitAction, RegistrationProfile, Template,
    VERIFY_RATE_LIMIT, VerificationCode, VerificationPurpose,
};
use crate::error::GateError;
use crate::usecase::approval::{self, IssuedTokens};
use crate::usecase::otp;

pub(crate) fn normalize_email(email: &str) -> Result<String, GateError> {
    let email = email.trim().to_ascii_lowercase();
    let valid = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(GateError::Validation(
            "a valid email address is required".to_owned(),
        ));
    }
    Ok(email)
}

pub(crate) fn validate_password(password: &str) -> Result<(), GateError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(GateError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_profile(profile: &RegistrationProfile) -> Result<(), GateError> {
    if profile.first_name.trim().is_empty() || profile.last_name.trim().is_empty() {
        return Err(GateError::Validation(
            "first and last name are required".to_owned(),
        ));
    }
    Ok(())
}

pub struct RequestRegistrationCodeInput {
    pub email: String,
    pub captcha_token: Option<String>,
    /// Honeypot field, hidden in the form. Humans leave it empty.
    pub website: String,
    pub ip: String,
}

#[derive(Debug)]
pub struct RequestRegistrationCodeOutput {
    pub resend_after_secs: i64,
}

pub struct RequestRegistrationCodeUseCase<V, R, G, N, C>
where
    V: VerificationCodeRepository,
    R: RateLimiter,
    G: AccountGateway,
    N: Notifier,
    C: CaptchaVerifier,
{
    pub codes: V,
    pub rate_limiter: R,
    pub accounts: G,
    pub notifier: N,
    pub captcha: C,
}

impl<V, R, G, N, C> RequestRegistrationCodeUseCase<V, R, G, N, C>
where
    V: VerificationCodeRepository,
    R: RateLimiter,
    G: AccountGateway,
    N: Notifier,
    C: CaptchaVerifier,
{
    pub async fn execute(
        &self,
        input: RequestRegistrationCodeInput,
    ) -> Result<RequestRegistrationCodeOutput, GateError> {
        // 1. CAPTCHA → 400 on failure
        let captcha_token = input.captcha_token.as_deref().unwrap_or_default();
        if !self
            .captcha
            .verify(captcha_token, &input.ip, "register")
            .await?
        {
            return Err(GateError::CaptchaFailed);
        }

        // 2. Rate limit (3/hour/IP) → 429
        let allowed = self
            .rate_limiter
            .check_and_record(
                &input.ip,
                RateLimitAction::RegistrationCode,
                REQUEST_RATE_LIMIT,
                RATE_LIMIT_WINDOW_SECS,
            )
            .await?;
        if !allowed {
            return Err(GateError::RateLimited);
        }

        // 3. Honeypot tripped: answer as if a code was sent, create nothing
        if !input.website.trim().is_empty() {
            tracing::info!(ip = %input.ip, "registration honeypot tripped");
            return Ok(RequestRegistrationCodeOutput {
                resend_after_secs: CODE_RESEND_COOLDOWN_SECS,
            });
        }

        let email = normalize_email(&input.email)?;

        // 4. Existing account → 409, surfaced plainly for registration
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(GateError::AccountExists);
        }

        // 5. Resend cooldown counts from the latest code, verified or not
        let latest = self
            .codes
            .find_latest(&email, VerificationPurpose::Registration)
            .await?;
        if let Some(latest) = latest {
            if latest.created_at > Utc::now() - Duration::seconds(CODE_RESEND_COOLDOWN_SECS) {
                return Err(GateError::CooldownActive);
            }
        }

        // 6. New code invalidates prior unverified ones
        self.codes
            .delete_unverified(&email, VerificationPurpose::Registration)
            .await?;

        let plaintext = otp::generate_code();
        let now = Utc::now();
        let record = VerificationCode {
            id: Uuid::new_v4(),
            purpose: VerificationPurpose::Registration,
            email: email.clone(),
            user_id: None,
            token: otp::generate_token(),
            code_hash: Some(otp::hash_code(&plaintext)?),
            attempt_count: 0,
            locked_until: None,
            expires_at: now + Duration::seconds(VerificationPurpose::Registration.ttl_secs()),
            verified_at: None,
            created_at: now,
        };
        self.codes.create(&record).await?;

        // 7. Delivery failure is fatal: a code the user never saw is useless
        self.notifier
            .send(
                &email,
                Template::RegistrationCode,
                json!({
                    "code": plaintext,
                    "expires_in_minutes": VerificationPurpose::Registration.ttl_secs() / 60,
                }),
            )
            .await?;

        Ok(RequestRegistrationCodeOutput {
            resend_after_secs: CODE_RESEND_COOLDOWN_SECS,
        })
    }
}

pub struct VerifyRegistrationCodeInput {
    pub email: String,
    pub code: String,
    pub password: String,
    pub profile: RegistrationProfile,
    pub ip: String,
}

#[derive(Debug)]
pub struct VerifyRegistrationCodeOutput {
    pub user_id: Uuid,
}

pub struct VerifyRegistrationCodeUseCase<V, T, R, G, N>
where
    V: VerificationCodeRepository,
    T: ApprovalTokenRepository,
    R: RateLimiter,
    G: AccountGateway,
    N: Notifier,
{
    pub codes: V,
    pub tokens: T,
    pub rate_limiter: R,
    pub accounts: G,
    pub notifier: N,
    pub base_url: String,
    pub admin_emails: Vec<String>,
}

impl<V, T, R, G, N> VerifyRegistrationCodeUseCase<V, T, R, G, N>
where
    V: VerificationCodeRepository,
    T: ApprovalTokenRepository,
    R: RateLimiter,
    G: AccountGateway,
    N: Notifier,
{
    pub async fn execute(
        &self,
        input: VerifyRegistrationCodeInput,
    ) -> Result<VerifyRegistrationCodeOutput, GateError> {
        // 1. Verify attempts get their own, looser limit (10/hour/IP)
        let allowed = self
            .rate_limiter
            .check_and_record(
                &input.ip,
                RateLimitAction::RegistrationVerify,
                VERIFY_RATE_LIMIT,
                RATE_LIMIT_WINDOW_SECS,
            )
            .await?;
        if !allowed {
            return Err(GateError::RateLimited);
        }

        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;
        validate_profile(&input.profile)?;
        let code = input.code.trim();
        if code.len() != otp::CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(GateError::Validation(
                "the code is 6 digits".to_owned(),
            ));
        }

        // 2. Latest unverified, unexpired record for this email
        let record = self
            .codes
            .find_active(&email, VerificationPurpose::Registration)
            .await?
            .ok_or(GateError::CodeNotFound)?;

        // 3. A live lock rejects without consuming an attempt
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

        // 4. Race guard: the email may have been claimed since the code was sent
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(GateError::AccountExists);
        }

        // 5. The only path that creates an account
        let user_id = self
            .accounts
            .create_account(&email, &input.password, &input.profile)
            .await?;

        // 6. CAS unverified → verified; a concurrent winner means our record
        //    is gone from under us
        if !self.codes.mark_verified(record.id, user_id).await? {
            return Err(GateError::CodeNotFound);
        }

        // 7. Admin approval request + user welcome are best-effort: the
        //    account exists either way
        let issued = approval::issue_tokens(&self.tokens, user_id).await?;
        self.send_notifications(&email, &input.profile, &issued)
            .await;

        Ok(VerifyRegistrationCodeOutput { user_id })
    }

    async fn send_notifications(
        &self,
        email: &str,
        profile: &RegistrationProfile,
        issued: &IssuedTokens,
    ) {
        let admin_data = json!({
            "applicant_email": email,
            "applicant_name": profile.full_name(),
            "company_name": profile.company_name,
            "approve_url": approval::action_url(&self.base_url, "approve", &issued.approve),
            "deny_url": approval::action_url(&self.base_url, "deny", &issued.deny),
        });
        for admin in &self.admin_emails {
            if let Err(e) = self
                .notifier
                .send(admin, Template::AdminApprovalRequest, admin_data.clone())
                .await
            {
                tracing::warn!(recipient = %admin, error = %e, "admin approval notification failed");
            }
        }

        let welcome_data = json!({
            "name": profile.full_name(),
            "auto_login_url": approval::auto_login_url(&self.base_url, &issued.auto_login),
        });
        if let Err(e) = self
            .notifier
            .send(email, Template::UserWelcome, welcome_data)
            .await
        {
            tracing::warn!(recipient = %email, error = %e, "welcome notification failed");
        }
    }
}
