// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` values.
//!
//! The state handed to Fitbit is `<user id>.<signature>`, where the
//! signature is the URL-safe base64 HMAC-SHA256 of the user id. Only a
//! state minted by the bot can complete a link for that user.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

fn signature(key: &[u8], user_id: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(user_id.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Sign a chat user id for use as the OAuth `state`.
pub fn sign_state(key: &[u8], user_id: &str) -> Result<String> {
    Ok(format!("{}.{}", user_id, signature(key, user_id)?))
}

/// Return the user id carried by a state this key signed.
pub fn verify_state(key: &[u8], state: &str) -> Option<String> {
    let (user_id, sig) = state.rsplit_once('.')?;
    if user_id.is_empty() {
        return None;
    }

    let expected = signature(key, user_id).ok()?;
    if !bool::from(expected.as_bytes().ct_eq(sig.as_bytes())) {
        tracing::warn!(user_id, "OAuth state signature mismatch");
        return None;
    }

    Some(user_id.to_string())
}
