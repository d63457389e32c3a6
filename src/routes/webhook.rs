// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for inbound triggers.
//!
//! One endpoint receives every trigger shape: LINE chat deliveries, OAuth
//! redirects forwarded as JSON, and scheduled invocations.

use crate::error::Result;
use crate::services::auth::OAuthRedirect;
use crate::services::chat::{ChatHandler, LineEvent};
use crate::services::condition::FitbitCondition;
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde_json::Value;
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(handle_trigger))
}

/// Inbound trigger, by payload shape.
#[derive(Debug)]
pub enum Trigger {
    Chat(Vec<LineEvent>),
    OAuth(OAuthRedirect),
    Scheduled,
    Unknown,
}

impl Trigger {
    /// Classify a raw payload. Checked in order: `events`, a non-empty
    /// `state`, `CloudWatchEvent`.
    pub fn classify(payload: &Value) -> Self {
        if let Some(events) = payload.get("events").and_then(Value::as_array) {
            let parsed = events
                .iter()
                .filter_map(|ev| match serde_json::from_value::<LineEvent>(ev.clone()) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        tracing::warn!(error = %e, event = %ev, "Skipping malformed chat event");
                        None
                    }
                })
                .collect();
            return Trigger::Chat(parsed);
        }

        let oauth_state = payload
            .get("state")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        if let Some(oauth_state) = oauth_state {
            let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
            return Trigger::OAuth(OAuthRedirect {
                state: oauth_state.to_string(),
                code: text("code"),
                error: text("error"),
            });
        }

        if payload.get("CloudWatchEvent").is_some() {
            return Trigger::Scheduled;
        }

        Trigger::Unknown
    }
}

/// Handle one trigger to completion.
///
/// Sync and scoring failures fail the request.
async fn handle_trigger(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<StatusCode> {
    tracing::info!(payload = %payload, "Webhook trigger received (raw)");

    match Trigger::classify(&payload) {
        Trigger::Chat(events) => {
            let condition = FitbitCondition::new(&state.db, &state.fitbit, &state.messages);
            let authorize_url = state.config.fitbit_authorize_url();
            let chat = ChatHandler::new(
                &state.db,
                &state.line,
                &condition,
                &authorize_url,
                &state.config.oauth_state_key,
            );

            for event in &events {
                let outcome = chat.handle(event).await?;
                tracing::info!(event_type = %event.kind, outcome = ?outcome, "Chat event handled");
            }
        }
        Trigger::OAuth(redirect) => {
            super::auth::complete_redirect(&state, &redirect).await?;
        }
        Trigger::Scheduled => {
            tracing::info!("Scheduled trigger received, nothing to do");
        }
        Trigger::Unknown => {
            tracing::debug!("Ignoring unrecognized trigger payload");
        }
    }

    Ok(StatusCode::OK)
}
