use anyhow::Context as _;
use axum::extract::State;

use crate::error::GateError;
use crate::state::AppState;

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn readyz(State(state): State<AppState>) -> Result<&'static str, GateError> {
    state.db.ping().await.context("database ping")?;
    Ok("ok")
}
