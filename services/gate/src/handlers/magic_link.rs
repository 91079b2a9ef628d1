use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::error::GateError;
use crate::handlers::{client_ip, require_nonce, set_nonce_cookie, set_session_cookie};
use crate::state::AppState;
use crate::usecase::magic_link::{
    RequestMagicLinkInput, RequestMagicLinkUseCase, VerifyMagicLinkInput, VerifyMagicLinkUseCase,
};
use crate::usecase::otp;

// ── POST /auth/magic-link ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestMagicLinkRequest {
    pub email: String,
}

pub async fn request_magic_link(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<RequestMagicLinkRequest>,
) -> Result<impl IntoResponse, GateError> {
    require_nonce(&headers, &jar)?;

    let usecase = RequestMagicLinkUseCase {
        links: state.magic_link_repo(),
        rate_limiter: state.rate_limiter(),
        accounts: state.account_gateway(),
        notifier: state.notifier(),
        base_url: state.config.site_base_url.clone(),
    };
    usecase
        .execute(RequestMagicLinkInput {
            email: body.email,
            ip: client_ip(&headers, addr),
        })
        .await?;

    // Same body whether or not the account exists
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "if an account exists for that address, a login link is on its way",
        })),
    ))
}

// ── GET /auth/magic-link/verify ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyMagicLinkQuery {
    pub token: String,
    pub email: String,
}

/// Emailed link; authenticated by the token itself, no nonce.
pub async fn verify_magic_link(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<VerifyMagicLinkQuery>,
) -> Result<impl IntoResponse, GateError> {
    let usecase = VerifyMagicLinkUseCase {
        links: state.magic_link_repo(),
        accounts: state.account_gateway(),
        login_events: state.login_event_repo(),
    };
    let out = usecase
        .execute(VerifyMagicLinkInput {
            token: query.token,
            email: query.email,
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
        Json(json!({ "user_id": out.user_id, "nonce": nonce })),
    ))
}
