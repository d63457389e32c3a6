// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Completion of the Fitbit OAuth redirect.
//!
//! The redirect carries the signed chat user id in `state`. A successful
//! grant is stored as that user's profile; every other outcome is
//! translated into a message pushed to the user (or only logged, for a
//! missing code). A state that fails verification is dropped without
//! contacting anyone.

use std::collections::HashSet;

use serde::Deserialize;

use crate::db::RecordStore;
use crate::error::AppError;
use crate::models::UserProfile;
use crate::services::fitbit::{unix_now, TokenExchange};
use crate::services::line::Messenger;
use crate::services::oauth_state::verify_state;

pub const MSG_DENIED: &str = "連携を許可してね。";
pub const MSG_SCOPE_MISMATCH: &str = "Fitbitとうまく連携できないよ。Fitbitのホームページ管理画面から後で削除もできるので、全てにチェックを入れて登録してみて。";
pub const MSG_LINKED: &str = "Fitbitと連携できたよ！";
pub const MSG_FAILED: &str = "Fitbit連携でエラーが起きたよ。時間をおいてもう一度試してみて。";

/// Provider redirect parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthRedirect {
    pub state: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Ways an OAuth redirect can fail to produce a profile.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("OAuth state is missing or not signed by us")]
    InvalidState,

    #[error("User denied Fitbit access")]
    Denied,

    #[error("Fitbit returned error: {0}")]
    Provider(String),

    #[error("Redirect carried neither error nor code")]
    MissingCode,

    #[error("Token exchange failed: {0}")]
    TokenExchange(AppError),

    #[error("Granted scopes do not match required scopes: {granted}")]
    ScopeMismatch { granted: String },

    #[error(transparent)]
    Store(AppError),
}

impl AuthError {
    /// Numeric code logged for operational failures.
    pub fn code(&self) -> Option<u8> {
        match self {
            AuthError::Provider(_) => Some(1),
            AuthError::MissingCode => Some(2),
            AuthError::TokenExchange(_) => Some(3),
            _ => None,
        }
    }

    /// Text pushed to the user, if any.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            AuthError::Denied => Some(MSG_DENIED),
            AuthError::ScopeMismatch { .. } => Some(MSG_SCOPE_MISMATCH),
            AuthError::Provider(_) | AuthError::TokenExchange(_) => Some(MSG_FAILED),
            AuthError::InvalidState | AuthError::MissingCode | AuthError::Store(_) => None,
        }
    }
}

/// Turns an OAuth redirect into a stored profile and a user message.
pub struct AuthHandoff<'a, S, M, X> {
    store: &'a S,
    messenger: &'a M,
    exchange: &'a X,
    required_scopes: HashSet<&'a str>,
    state_key: &'a [u8],
}

impl<'a, S, M, X> AuthHandoff<'a, S, M, X>
where
    S: RecordStore,
    M: Messenger,
    X: TokenExchange,
{
    pub fn new(
        store: &'a S,
        messenger: &'a M,
        exchange: &'a X,
        required_scopes: &[&'a str],
        state_key: &'a [u8],
    ) -> Self {
        Self {
            store,
            messenger,
            exchange,
            required_scopes: required_scopes.iter().copied().collect(),
            state_key,
        }
    }

    /// Validate the redirect, exchange the code and store the profile.
    pub async fn link(&self, redirect: &OAuthRedirect) -> Result<UserProfile, AuthError> {
        let user_id =
            verify_state(self.state_key, &redirect.state).ok_or(AuthError::InvalidState)?;
        self.link_user(&user_id, redirect).await
    }

    async fn link_user(
        &self,
        user_id: &str,
        redirect: &OAuthRedirect,
    ) -> Result<UserProfile, AuthError> {
        match redirect.error.as_deref() {
            Some("access_denied") => return Err(AuthError::Denied),
            Some(error) if !error.is_empty() => return Err(AuthError::Provider(error.to_string())),
            _ => {}
        }

        let code = redirect
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let token = self
            .exchange
            .exchange_code(code)
            .await
            .map_err(AuthError::TokenExchange)?;

        if token.scopes() != self.required_scopes {
            return Err(AuthError::ScopeMismatch {
                granted: token.scope.clone(),
            });
        }

        let profile = token.to_profile(user_id, unix_now());
        self.store
            .put_profile(&profile)
            .await
            .map_err(AuthError::Store)?;

        Ok(profile)
    }

    /// Run [`Self::link`] and tell the user how it went.
    ///
    /// Only store failures are returned; everything else ends here.
    pub async fn complete(&self, redirect: &OAuthRedirect) -> Result<Option<UserProfile>, AppError> {
        let Some(user_id) = verify_state(self.state_key, &redirect.state) else {
            tracing::warn!(state = %redirect.state, "Dropping OAuth redirect with invalid state");
            return Ok(None);
        };
        let user_id = user_id.as_str();

        let (outcome, text) = match self.link_user(user_id, redirect).await {
            Ok(profile) => {
                tracing::info!(
                    user_id,
                    fitbit_user_id = %profile.fitbit_user_id,
                    "Fitbit account linked"
                );
                (Some(profile), Some(MSG_LINKED))
            }
            Err(AuthError::Store(e)) => return Err(e),
            Err(e) => {
                match e.code() {
                    Some(code) => tracing::error!(user_id, error_code = code, error = %e, "Fitbit auth failed"),
                    None => tracing::info!(user_id, reason = %e, "Fitbit auth not completed"),
                }
                (None, e.user_message())
            }
        };

        if let Some(text) = text {
            if let Err(e) = self.messenger.push(user_id, text).await {
                tracing::error!(user_id, error = %e, "Failed to notify user of auth result");
            }
        }

        Ok(outcome)
    }
}
