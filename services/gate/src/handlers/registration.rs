use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::domain::types::RegistrationProfile;
use crate::error::GateError;
use crate::handlers::{client_ip, require_nonce};
use crate::state::AppState;
use crate::usecase::registration::{
    RequestRegistrationCodeInput, RequestRegistrationCodeUseCase, VerifyRegistrationCodeInput,
    VerifyRegistrationCodeUseCase,
};

// ── POST /auth/registration/code ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
    pub captcha_token: Option<String>,
    /// Honeypot; real users never see or fill this field.
    #[serde(default)]
    pub website: String,
}

pub async fn request_code(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<RequestCodeRequest>,
) -> Result<impl IntoResponse, GateError> {
    require_nonce(&headers, &jar)?;

    let usecase = RequestRegistrationCodeUseCase {
        codes: state.code_repo(),
        rate_limiter: state.rate_limiter(),
        accounts: state.account_gateway(),
        notifier: state.notifier(),
        captcha: state.captcha(),
    };

    let out = usecase
        .execute(RequestRegistrationCodeInput {
            email: body.email,
            captcha_token: body.captcha_token,
            website: body.website,
            ip: client_ip(&headers, addr),
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "check your email for a 6-digit code",
            "resend_after_secs": out.resend_after_secs,
        })),
    ))
}

// ── POST /auth/registration/verify ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company_name: String,
}

pub async fn verify_code(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse, GateError> {
    require_nonce(&headers, &jar)?;

    let usecase = VerifyRegistrationCodeUseCase {
        codes: state.code_repo(),
        tokens: state.approval_token_repo(),
        rate_limiter: state.rate_limiter(),
        accounts: state.account_gateway(),
        notifier: state.notifier(),
        base_url: state.config.site_base_url.clone(),
        admin_emails: state.config.admin_emails.clone(),
    };

    let out = usecase
        .execute(VerifyRegistrationCodeInput {
            email: body.email,
            code: body.code,
            password: body.password,
            profile: RegistrationProfile {
                first_name: body.first_name,
                last_name: body.last_name,
                company_name: body.company_name,
            },
            ip: client_ip(&headers, addr),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user_id": out.user_id,
            "message": "account created and awaiting admin approval",
        })),
    ))
}
