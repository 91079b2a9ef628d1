use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::error::GateError;
use crate::handlers::{client_ip, require_nonce, set_nonce_cookie, set_session_cookie};
use crate::state::AppState;
use crate::usecase::otp;
use crate::usecase::password_reset::{
    RequestPasswordResetInput, RequestPasswordResetUseCase, VerifyPasswordResetInput,
    VerifyPasswordResetUseCase,
};

// ── POST /auth/password-reset ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

pub async fn request_reset(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<RequestResetRequest>,
) -> Result<impl IntoResponse, GateError> {
    require_nonce(&headers, &jar)?;

    let usecase = RequestPasswordResetUseCase {
        codes: state.code_repo(),
        rate_limiter: state.rate_limiter(),
        accounts: state.account_gateway(),
        notifier: state.notifier(),
    };
    usecase
        .execute(RequestPasswordResetInput {
            email: body.email,
            ip: client_ip(&headers, addr),
        })
        .await?;

    // Same body whether or not the account exists
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "if an account exists for that address, a reset code is on its way",
        })),
    ))
}

// ── POST /auth/password-reset/verify ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyResetRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

pub async fn verify_reset(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<VerifyResetRequest>,
) -> Result<impl IntoResponse, GateError> {
    require_nonce(&headers, &jar)?;

    let usecase = VerifyPasswordResetUseCase {
        codes: state.code_repo(),
        rate_limiter: state.rate_limiter(),
        accounts: state.account_gateway(),
        login_events: state.login_event_repo(),
    };
    let out = usecase
        .execute(VerifyPasswordResetInput {
            email: body.email,
            code: body.code,
            new_password: body.new_password,
            ip: client_ip(&headers, addr),
        })
        .await?;

    // Reset success logs the user straight in; the nonce rotates with it
    let jar = set_session_cookie(
        jar,
        out.session_token,
        state.config.cookie_domain.clone(),
        state.config.session_timeout_minutes,
    );
    let nonce = otp::generate_token();
    let jar = set_nonce_cookie(jar, nonce.clone(), state.config.cookie_domain.clone());
    Ok((
        StatusCode::OK,
        jar,
        Json(json!({ "user_id": out.user_id, "nonce": nonce })),
    ))
}
