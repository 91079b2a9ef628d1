//! HTTP handlers plus the request plumbing they share: client IP resolution,
//! the double-submit nonce check for mutating calls, identity headers set by
//! the edge proxy, and session/nonce cookie builders.

pub mod approval;
pub mod health;
pub mod login;
pub mod magic_link;
pub mod nonce;
pub mod password_reset;
pub mod registration;

use std::net::SocketAddr;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use uuid::Uuid;

use crate::domain::types::Role;
use crate::error::GateError;

/// Cookie holding the CMS-minted session token.
pub const GATE_SESSION_COOKIE: &str = "gate_session";

/// Cookie half of the double-submit anti-replay nonce.
pub const GATE_NONCE_COOKIE: &str = "gate_nonce";

/// Header half of the double-submit anti-replay nonce.
pub const X_GATE_NONCE: &str = "x-gate-nonce";

/// Identity headers stamped by the edge proxy after session validation.
pub const X_GATE_USER_ID: &str = "x-gate-user-id";
pub const X_GATE_USER_ROLE: &str = "x-gate-user-role";

/// Nonce cookie lifetime in seconds (1 hour).
pub const NONCE_TTL_SECS: i64 = 3600;

pub(crate) fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// Double-submit check: the `x-gate-nonce` header must match the `gate_nonce`
/// cookie. Token-link GETs are exempt and never call this.
pub(crate) fn require_nonce(headers: &HeaderMap, jar: &CookieJar) -> Result<(), GateError> {
    let header = headers.get(X_GATE_NONCE).and_then(|v| v.to_str().ok());
    let cookie = jar.get(GATE_NONCE_COOKIE).map(|c| c.value());
    match (header, cookie) {
        (Some(h), Some(c)) if !h.is_empty() && h == c => Ok(()),
        _ => Err(GateError::Unauthorized),
    }
}

/// Authenticated caller identity, if the edge proxy attached one.
pub(crate) fn identity(headers: &HeaderMap) -> Option<(Uuid, Role)> {
    let user_id = headers
        .get(X_GATE_USER_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uuid>().ok())?;
    let role = headers
        .get(X_GATE_USER_ROLE)
        .and_then(|v| v.to_str().ok())
        .and_then(Role::from_str)?;
    Some((user_id, role))
}

pub(crate) fn require_identity(headers: &HeaderMap) -> Result<(Uuid, Role), GateError> {
    identity(headers).ok_or(GateError::Unauthorized)
}

pub(crate) fn set_session_cookie(
    jar: CookieJar,
    token: String,
    domain: String,
    timeout_minutes: i64,
) -> CookieJar {
    let cookie = Cookie::build((GATE_SESSION_COOKIE, token))
        .path("/")
        .domain(domain)
        .max_age(Duration::minutes(timeout_minutes))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

pub(crate) fn clear_session_cookie(jar: CookieJar, domain: String) -> CookieJar {
    let cookie = Cookie::build((GATE_SESSION_COOKIE, ""))
        .path("/")
        .domain(domain)
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// The nonce cookie is readable by the page script so it can echo the value
/// back in the `x-gate-nonce` header.
pub(crate) fn set_nonce_cookie(jar: CookieJar, value: String, domain: String) -> CookieJar {
    let cookie = Cookie::build((GATE_NONCE_COOKIE, value))
        .path("/")
        .domain(domain)
        .max_age(Duration::seconds(NONCE_TTL_SECS))
        .http_only(false)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}
