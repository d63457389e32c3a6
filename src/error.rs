// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// Synchronization and scoring failures are returned from handlers as-is,
/// which fails the invocation with a 5xx.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Fitbit API error: {0}")]
    FitbitApi(String),

    #[error("LINE API error: {0}")]
    LineApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("No message mapped for score key {0}")]
    MissingScoreMapping(String),

    #[error("Not enough joined data to score")]
    InsufficientData,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker for expired or revoked Fitbit access tokens.
    pub const FITBIT_TOKEN_EXPIRED: &'static str = "Token expired";

    /// Marker for Fitbit rate limiting (HTTP 429).
    pub const FITBIT_RATE_LIMIT: &'static str = "Rate limit exceeded";

    /// True if this is a Fitbit error that a token refresh can fix.
    pub fn is_fitbit_token_expired(&self) -> bool {
        matches!(self, AppError::FitbitApi(msg) if msg == Self::FITBIT_TOKEN_EXPIRED)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::FitbitApi(msg) => {
                tracing::error!(error = %msg, "Fitbit API error");
                (StatusCode::BAD_GATEWAY, "fitbit_error", Some(msg.clone()))
            }
            AppError::LineApi(msg) => {
                tracing::error!(error = %msg, "LINE API error");
                (StatusCode::BAD_GATEWAY, "line_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::MissingScoreMapping(key) => {
                tracing::error!(score_key = %key, "Score key has no message");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "missing_score_mapping",
                    Some(key.clone()),
                )
            }
            AppError::InsufficientData => {
                tracing::error!("Scoring attempted with no joined rows");
                (StatusCode::INTERNAL_SERVER_ERROR, "insufficient_data", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
