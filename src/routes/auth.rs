// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit OAuth redirect route.

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::UserProfile;
use crate::services::auth::{AuthHandoff, OAuthRedirect, MSG_LINKED};
use crate::AppState;

/// Shown in the browser when linking did not complete.
const PAGE_NOT_LINKED: &str = "Fitbit連携が完了しなかったよ。LINEのメッセージを確認してね。";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/fitbit/callback", get(fitbit_callback))
}

/// Complete an OAuth redirect, whichever way it arrived.
pub async fn complete_redirect(
    state: &AppState,
    redirect: &OAuthRedirect,
) -> Result<Option<UserProfile>> {
    let required = state.config.required_scopes();
    let handoff = AuthHandoff::new(
        &state.db,
        &state.line,
        &state.fitbit,
        &required,
        &state.config.oauth_state_key,
    );
    handoff.complete(redirect).await
}

/// Provider redirect after the user answers the consent page.
async fn fitbit_callback(
    State(state): State<Arc<AppState>>,
    Query(redirect): Query<OAuthRedirect>,
) -> Result<&'static str> {
    tracing::info!(
        state = %redirect.state,
        has_code = redirect.code.is_some(),
        error = ?redirect.error,
        "Fitbit OAuth callback"
    );

    if redirect.state.is_empty() {
        return Err(AppError::BadRequest("Missing OAuth state".to_string()));
    }

    let linked = complete_redirect(&state, &redirect).await?;
    Ok(if linked.is_some() {
        MSG_LINKED
    } else {
        PAGE_NOT_LINKED
    })
}
