use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::repository::{
    AccountGateway, LoginEventRepository, MagicLinkRepository, Notifier, RateLimiter,
};
use crate::domain::types::{
    LoginEvent, MAGIC_LINK_TTL_SECS, MagicLink, RATE_LIMIT_WINDOW_SECS, RateLimitAction,
    REQUEST_RATE_LIMIT, Template,
};
use crate::error::GateError;
use crate::usecase::otp;
use crate::usecase::registration::normalize_email;

pub struct RequestMagicLinkInput {
    pub email: String,
    pub ip: String,
}

pub struct RequestMagicLinkUseCase<M, R, G, N>
where
    M: MagicLinkRepository,
    R: RateLimiter,
    G: AccountGateway,
    N: Notifier,
{
    pub links: M,
    pub rate_limiter: R,
    pub accounts: G,
    pub notifier: N,
    pub base_url: String,
}

impl<M, R, G, N> RequestMagicLinkUseCase<M, R, G, N>
where
    M: MagicLinkRepository,
    R: RateLimiter,
    G: AccountGateway,
    N: Notifier,
{
    /// Succeeds with the same outcome whether or not the email has an
    /// account. No enumeration signal leaves this function.
    pub async fn execute(&self, input: RequestMagicLinkInput) -> Result<(), GateError> {
        let allowed = self
            .rate_limiter
            .check_and_record(
                &input.ip,
                RateLimitAction::MagicLink,
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
        if account.suspended {
            return Ok(());
        }

        // One unused link per user: a new request replaces the old link
        self.links.invalidate_unused(account.id).await?;

        let now = Utc::now();
        let link = MagicLink {
            id: Uuid::new_v4(),
            user_id: account.id,
            email: email.clone(),
            token: otp::generate_token(),
            ip_address: input.ip,
            expires_at: now + Duration::seconds(MAGIC_LINK_TTL_SECS),
            used_at: None,
            created_at: now,
        };
        self.links.create(&link).await?;

        let url = format!(
            "{}/auth/magic-link/verify?token={}&email={}",
            self.base_url.trim_end_matches('/'),
            link.token,
            email,
        );
        self.notifier
            .send(
                &email,
                Template::MagicLink,
                json!({
                    "login_url": url,
                    "expires_in_minutes": MAGIC_LINK_TTL_SECS / 60,
                }),
            )
            .await?;

        Ok(())
    }
}

pub struct VerifyMagicLinkInput {
    pub token: String,
    pub email: String,
    pub ip: String,
}

#[derive(Debug)]
pub struct VerifyMagicLinkOutput {
    pub user_id: Uuid,
    pub session_token: String,
}

pub struct VerifyMagicLinkUseCase<M, G, L>
where
    M: MagicLinkRepository,
    G: AccountGateway,
    L: LoginEventRepository,
{
    pub links: M,
    pub accounts: G,
    pub login_events: L,
}

impl<M, G, L> VerifyMagicLinkUseCase<M, G, L>
where
    M: MagicLinkRepository,
    G: AccountGateway,
    L: LoginEventRepository,
{
    pub async fn execute(
        &self,
        input: VerifyMagicLinkInput,
    ) -> Result<VerifyMagicLinkOutput, GateError> {
        let email = normalize_email(&input.email).map_err(|_| GateError::InvalidOrExpiredLink)?;

        // One failure covers wrong token, wrong email, used and expired; no
        // feedback for token guessing
        let link = self
            .links
            .consume(&input.token, &email)
            .await?
            .ok_or(GateError::InvalidOrExpiredLink)?;

        let account = self
            .accounts
            .find_by_id(link.user_id)
            .await?
            .ok_or(GateError::InvalidOrExpiredLink)?;
        if account.suspended {
            return Err(GateError::AccountSuspended);
        }

        let session_token = self.accounts.start_session(account.id).await?;
        self.login_events
            .record_login(&LoginEvent {
                id: Uuid::new_v4(),
                user_id: account.id,
                ip_address: input.ip,
                social_provider: Some("magic_link".to_owned()),
                created_at: Utc::now(),
            })
            .await?;

        Ok(VerifyMagicLinkOutput {
            user_id: account.id,
            session_token,
        })
    }
}
