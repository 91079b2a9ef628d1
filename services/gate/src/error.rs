use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Gate service error variants. Every expected business failure is a variant
/// with a stable kind; `Internal` is the fatal channel for storage and other
/// unexpected failures.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("{0}")]
    Validation(String),
    #[error("an account with this email already exists")]
    AccountExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("this account has been suspended")]
    AccountSuspended,
    #[error("please verify your email before logging in")]
    EmailNotVerified,
    #[error("please wait before requesting a new code")]
    CooldownActive,
    #[error("too many attempts, please try again later")]
    RateLimited,
    #[error("CAPTCHA verification failed")]
    CaptchaFailed,
    #[error("code expired or not found, please request a new code")]
    CodeNotFound,
    #[error("invalid code, {remaining} attempt(s) remaining")]
    InvalidCode { remaining: i32 },
    #[error("too many incorrect attempts, please wait and try again later")]
    TooManyAttempts,
    #[error("link not found")]
    TokenNotFound,
    #[error("{0}")]
    TokenAlreadyUsed(String),
    #[error("link expired")]
    TokenExpired,
    #[error("wrong link type")]
    TokenWrongType,
    #[error("invalid or expired magic link, please request a new one")]
    InvalidOrExpiredLink,
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("a required service is unavailable, please try again later")]
    ExternalService,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl GateError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::AccountExists => "ACCOUNT_EXISTS",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountSuspended => "ACCOUNT_SUSPENDED",
            Self::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            Self::CooldownActive => "COOLDOWN_ACTIVE",
            Self::RateLimited => "RATE_LIMITED",
            Self::CaptchaFailed => "CAPTCHA_FAILED",
            Self::CodeNotFound => "CODE_NOT_FOUND",
            Self::InvalidCode { .. } => "INVALID_CODE",
            Self::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            Self::TokenNotFound => "TOKEN_NOT_FOUND",
            Self::TokenAlreadyUsed(_) => "TOKEN_ALREADY_USED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenWrongType => "TOKEN_WRONG_TYPE",
            Self::InvalidOrExpiredLink => "INVALID_OR_EXPIRED_LINK",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::CaptchaFailed | Self::InvalidCode { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::InvalidOrExpiredLink | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::AccountSuspended | Self::EmailNotVerified | Self::Forbidden => {
                StatusCode::FORBIDDEN
            }
            Self::CodeNotFound | Self::TokenNotFound => StatusCode::NOT_FOUND,
            Self::AccountExists | Self::TokenAlreadyUsed(_) | Self::TokenWrongType => {
                StatusCode::CONFLICT
            }
            Self::TokenExpired => StatusCode::GONE,
            Self::CooldownActive | Self::RateLimited | Self::TooManyAttempts => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::ExternalService => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // only 500s carry a cause worth logging; the rest are client errors
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
