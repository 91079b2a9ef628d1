use std::sync::Arc;

use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;

use crate::config::GateConfig;
use crate::infra::cache::RedisRateLimiter;
use crate::infra::captcha::HttpCaptchaVerifier;
use crate::infra::db::{
    DbApprovalDecisionRepository, DbApprovalTokenRepository, DbLoginEventRepository,
    DbMagicLinkRepository, DbVerificationCodeRepository,
};
use crate::infra::gateway::HttpAccountGateway;
use crate::infra::notify::HttpNotifier;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub http: reqwest::Client,
    pub config: Arc<GateConfig>,
}

impl AppState {
    pub fn code_repo(&self) -> DbVerificationCodeRepository {
        DbVerificationCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn magic_link_repo(&self) -> DbMagicLinkRepository {
        DbMagicLinkRepository {
            db: self.db.clone(),
        }
    }

    pub fn approval_token_repo(&self) -> DbApprovalTokenRepository {
        DbApprovalTokenRepository {
            db: self.db.clone(),
        }
    }

    pub fn decision_repo(&self) -> DbApprovalDecisionRepository {
        DbApprovalDecisionRepository {
            db: self.db.clone(),
        }
    }

    pub fn login_event_repo(&self) -> DbLoginEventRepository {
        DbLoginEventRepository {
            db: self.db.clone(),
        }
    }

    pub fn rate_limiter(&self) -> RedisRateLimiter {
        RedisRateLimiter {
            pool: self.redis.clone(),
        }
    }

    pub fn account_gateway(&self) -> HttpAccountGateway {
        HttpAccountGateway {
            client: self.http.clone(),
            base_url: self.config.gateway_url.clone(),
        }
    }

    pub fn notifier(&self) -> HttpNotifier {
        HttpNotifier {
            client: self.http.clone(),
            base_url: self.config.mailer_url.clone(),
        }
    }

    pub fn captcha(&self) -> HttpCaptchaVerifier {
        HttpCaptchaVerifier {
            client: self.http.clone(),
            enabled: self.config.captcha_enabled,
            provider: self.config.captcha_provider,
            secret: self.config.captcha_secret.clone(),
            min_score: self.config.captcha_min_score,
        }
    }
}
