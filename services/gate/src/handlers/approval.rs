use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::types::ApprovalAction;
use crate::error::GateError;
use crate::handlers::{
    client_ip, identity, require_identity, require_nonce, set_nonce_cookie, set_session_cookie,
};
use crate::state::AppState;
use crate::usecase::approval::{
    AdminDecisionInput, AdminDecisionUseCase, ApprovalStatus, AutoLoginInput, AutoLoginUseCase,
    CheckApprovalStatusUseCase, ConsumeApprovalTokenInput, ConsumeApprovalTokenUseCase,
    ResendApprovalInput, ResendApprovalUseCase,
};
use crate::usecase::otp;

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

// ── GET /approvals/approve and /approvals/deny ────────────────────────────────

async fn consume(
    state: AppState,
    headers: HeaderMap,
    token: String,
    expected_action: ApprovalAction,
) -> Result<impl IntoResponse, GateError> {
    let usecase = ConsumeApprovalTokenUseCase {
        tokens: state.approval_token_repo(),
        decisions: state.decision_repo(),
        accounts: state.account_gateway(),
        notifier: state.notifier(),
        admin_emails: state.config.admin_emails.clone(),
    };
    let out = usecase
        .execute(ConsumeApprovalTokenInput {
            token,
            expected_action,
            actor: identity(&headers).map(|(id, _)| id),
        })
        .await?;

    let message = if out.approved {
        "registration approved"
    } else {
        "registration denied"
    };
    Ok((
        StatusCode::OK,
        Json(json!({
            "user_id": out.user_id,
            "approved": out.approved,
            "message": message,
        })),
    ))
}

pub async fn approve_by_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, GateError> {
    consume(state, headers, query.token, ApprovalAction::Approve).await
}

pub async fn deny_by_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, GateError> {
    consume(state, headers, query.token, ApprovalAction::Deny).await
}

// ── GET /approvals/resend ─────────────────────────────────────────────────────

pub async fn resend_approval(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, GateError> {
    let usecase = ResendApprovalUseCase {
        tokens: state.approval_token_repo(),
        decisions: state.decision_repo(),
        accounts: state.account_gateway(),
        notifier: state.notifier(),
        base_url: state.config.site_base_url.clone(),
        admin_emails: state.config.admin_emails.clone(),
    };
    usecase
        .execute(ResendApprovalInput { token: query.token })
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "a fresh approval request was sent to the admins" })),
    ))
}

// ── GET /auth/auto-login ──────────────────────────────────────────────────────

pub async fn auto_login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, GateError> {
    let usecase = AutoLoginUseCase {
        tokens: state.approval_token_repo(),
        accounts: state.account_gateway(),
        login_events: state.login_event_repo(),
    };
    let out = usecase
        .execute(AutoLoginInput {
            token: query.token,
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

// ── GET /auth/approval/status ─────────────────────────────────────────────────

pub async fn approval_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GateError> {
    let (user_id, _) = require_identity(&headers)?;

    let usecase = CheckApprovalStatusUseCase {
        decisions: state.decision_repo(),
    };
    let out = usecase.execute(user_id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": out.status.as_str(),
            "approved": out.status == ApprovalStatus::Approved,
            "decided_at": out.decided_at,
        })),
    ))
}

// ── POST /admin/users/{user_id}/approve and /deny ─────────────────────────────

async fn admin_decide(
    state: AppState,
    headers: HeaderMap,
    jar: CookieJar,
    user_id: Uuid,
    approved: bool,
) -> Result<impl IntoResponse, GateError> {
    require_nonce(&headers, &jar)?;
    let (actor, role) = require_identity(&headers)?;
    if !role.is_privileged() {
        return Err(GateError::Forbidden);
    }

    let usecase = AdminDecisionUseCase {
        decisions: state.decision_repo(),
        accounts: state.account_gateway(),
        notifier: state.notifier(),
        admin_emails: state.config.admin_emails.clone(),
    };
    usecase
        .execute(AdminDecisionInput {
            user_id,
            approved,
            actor,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, GateError> {
    admin_decide(state, headers, jar, user_id, true).await
}

pub async fn admin_deny(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, GateError> {
    admin_decide(state, headers, jar, user_id, false).await
}
