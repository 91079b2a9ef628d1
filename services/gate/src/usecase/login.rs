use chrono::Utc;
use uuid::Uuid;

use crate::domain::repository::{
    AccountGateway, ApprovalDecisionRepository, CaptchaVerifier, LoginEventRepository,
};
use crate::domain::types::LoginEvent;
use crate::error::GateError;
use crate::usecase::approval::ApprovalStatus;
use crate::usecase::registration::normalize_email;

pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub captcha_token: Option<String>,
    pub ip: String,
}

#[derive(Debug)]
pub struct LoginOutput {
    pub user_id: Uuid,
    pub session_token: String,
    pub approval_status: ApprovalStatus,
}

pub struct LoginUseCase<G, D, L, C>
where
    G: AccountGateway,
    D: ApprovalDecisionRepository,
    L: LoginEventRepository,
    C: CaptchaVerifier,
{
    pub accounts: G,
    pub decisions: D,
    pub login_events: L,
    pub captcha: C,
}

impl<G, D, L, C> LoginUseCase<G, D, L, C>
where
    G: AccountGateway,
    D: ApprovalDecisionRepository,
    L: LoginEventRepository,
    C: CaptchaVerifier,
{
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutput, GateError> {
        // 1. CAPTCHA before anything touches the credential store
        let captcha_token = input.captcha_token.as_deref().unwrap_or_default();
        if !self
            .captcha
            .verify(captcha_token, &input.ip, "login")
            .await?
        {
            return Err(GateError::CaptchaFailed);
        }

        // 2. One failure for unknown email and wrong password alike
        let email = normalize_email(&input.email)?;
        let user_id = self
            .accounts
            .authenticate(&email, &input.password)
            .await?
            .ok_or(GateError::InvalidCredentials)?;

        let account = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or(GateError::InvalidCredentials)?;

        // 3. Suspension wins over everything else
        if account.suspended {
            return Err(GateError::AccountSuspended);
        }

        // 4. Approved accounts predate the verification requirement and are
        //    treated as verified; stamp the flag so the rule applies once
        let status = match self.decisions.find(user_id).await? {
            Some(d) if d.approved => ApprovalStatus::Approved,
            Some(_) => ApprovalStatus::Denied,
            None => ApprovalStatus::Pending,
        };
        if !account.email_verified {
            if status != ApprovalStatus::Approved {
                return Err(GateError::EmailNotVerified);
            }
            self.accounts.set_email_verified(user_id).await?;
        }

        // 5. Session + audit record
        let session_token = self.accounts.start_session(user_id).await?;
        self.login_events
            .record_login(&LoginEvent {
                id: Uuid::new_v4(),
                user_id,
                ip_address: input.ip,
                social_provider: None,
                created_at: Utc::now(),
            })
            .await?;

        Ok(LoginOutput {
            user_id,
            session_token,
            approval_status: status,
        })
    }
}

pub struct LogoutUseCase<G, L>
where
    G: AccountGateway,
    L: LoginEventRepository,
{
    pub accounts: G,
    pub login_events: L,
}

impl<G, L> LogoutUseCase<G, L>
where
    G: AccountGateway,
    L: LoginEventRepository,
{
    pub async fn execute(&self, user_id: Uuid) -> Result<(), GateError> {
        self.accounts.end_session(user_id).await?;
        self.login_events.record_logout(user_id).await?;
        Ok(())
    }
}
