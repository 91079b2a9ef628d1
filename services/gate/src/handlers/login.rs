use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::error::GateError;
use crate::handlers::{
    clear_session_cookie, client_ip, require_identity, require_nonce, set_nonce_cookie,
    set_session_cookie,
};
use crate::state::AppState;
use crate::usecase::login::{LoginInput, LoginUseCase, LogoutUseCase};
use crate::usecase::otp;

// ── POST /auth/login ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub captcha_token: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, GateError> {
    require_nonce(&headers, &jar)?;

    let usecase = LoginUseCase {
        accounts: state.account_gateway(),
        decisions: state.decision_repo(),
        login_events: state.login_event_repo(),
        captcha: state.captcha(),
    };

    let out = usecase
        .execute(LoginInput {
            email: body.email,
            password: body.password,
            captcha_token: body.captcha_token,
            ip: client_ip(&headers, addr),
        })
        .await?;

    let jar = set_session_cookie(
        jar,
        out.session_token,
        state.config.cookie_domain.clone(),
        state.config.session_timeout_minutes,
    );
    // Session start rotates the nonce
    let nonce = otp::generate_token();
    let jar = set_nonce_cookie(jar, nonce.clone(), state.config.cookie_domain.clone());

    Ok((
        StatusCode::OK,
        jar,
        Json(json!({
            "user_id": out.user_id,
            "approval_status": out.approval_status.as_str(),
            "nonce": nonce,
        })),
    ))
}

// ── POST /auth/logout ─────────────────────────────────────────────────────────

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, GateError> {
    require_nonce(&headers, &jar)?;
    let (user_id, _) = require_identity(&headers)?;

    let usecase = LogoutUseCase {
        accounts: state.account_gateway(),
        login_events: state.login_event_repo(),
    };
    usecase.execute(user_id).await?;

    let jar = clear_session_cookie(jar, state.config.cookie_domain.clone());
    Ok((StatusCode::NO_CONTENT, jar))
}
