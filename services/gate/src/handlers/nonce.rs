use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::handlers::set_nonce_cookie;
use crate::state::AppState;
use crate::usecase::otp;

// ── POST /auth/nonce ──────────────────────────────────────────────────────────

/// Issue the double-submit nonce: the value goes out both as a cookie and in
/// the body, and mutating calls must echo it in `x-gate-nonce`.
pub async fn create_nonce(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let nonce = otp::generate_token();
    let jar = set_nonce_cookie(jar, nonce.clone(), state.config.cookie_domain.clone());
    (jar, Json(json!({ "nonce": nonce })))
}
