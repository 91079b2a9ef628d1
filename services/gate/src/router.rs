use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    approval::{
        admin_approve, admin_deny, approval_status, approve_by_token, auto_login, deny_by_token,
        resend_approval,
    },
    health::{healthz, readyz},
    login::{login, logout},
    magic_link::{request_magic_link, verify_magic_link},
    nonce::create_nonce,
    password_reset::{request_reset, verify_reset},
    registration::{request_code, verify_code},
};
use crate::middleware::request_id_layer;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Anti-replay nonce
        .route("/auth/nonce", post(create_nonce))
        // Credential login
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        // OTP registration
        .route("/auth/registration/code", post(request_code))
        .route("/auth/registration/verify", post(verify_code))
        // Magic link
        .route("/auth/magic-link", post(request_magic_link))
        .route("/auth/magic-link/verify", get(verify_magic_link))
        // Password reset
        .route("/auth/password-reset", post(request_reset))
        .route("/auth/password-reset/verify", post(verify_reset))
        // Approval status + emailed links
        .route("/auth/approval/status", get(approval_status))
        .route("/auth/auto-login", get(auto_login))
        .route("/approvals/approve", get(approve_by_token))
        .route("/approvals/deny", get(deny_by_token))
        .route("/approvals/resend", get(resend_approval))
        // Authenticated admin decisions
        .route("/admin/users/{user_id}/approve", post(admin_approve))
        .route("/admin/users/{user_id}/deny", post(admin_deny))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
