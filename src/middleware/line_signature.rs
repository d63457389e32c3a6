// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! LINE webhook signature middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Largest webhook body accepted.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Base64 HMAC-SHA256 of `body` keyed by the channel secret.
pub fn sign(channel_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check a signature header value against the body.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    match sign(channel_secret, body) {
        Some(expected) => bool::from(expected.as_bytes().ct_eq(signature.trim().as_bytes())),
        None => false,
    }
}

/// True if the body is a JSON object with an `events` key.
fn carries_chat_events(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .is_some_and(|v| v.get("events").is_some())
}

/// Require a valid `X-Line-Signature` on chat event deliveries.
///
/// Skipped when no channel secret is configured, and for payloads that
/// carry no `events` (OAuth redirects, scheduled triggers).
pub async fn require_line_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(secret) = state.config.line_channel_secret.as_deref() else {
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return AppError::BadRequest(format!("Unreadable body: {}", e)).into_response(),
    };

    if carries_chat_events(&bytes) {
        let signature = parts
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok());

        let valid = signature.is_some_and(|sig| verify_signature(secret, &bytes, sig));
        if !valid {
            tracing::warn!(
                has_header = signature.is_some(),
                "Blocked webhook with invalid LINE signature"
            );
            return AppError::InvalidSignature.into_response();
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
