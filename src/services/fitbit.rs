// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit API client and per-user session.
//!
//! Handles:
//! - Sleep logs and per-metric time series over a date range
//! - Authorization code exchange
//! - Token refresh when expired, with the new pair persisted immediately
//! - Rate limit and expired-token detection

use crate::config::Config;
use crate::db::RecordStore;
use crate::error::AppError;
use crate::models::{SleepLog, UserProfile};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: f64 = 5.0 * 60.0;

/// Fitbit API client.
#[derive(Clone)]
pub struct FitbitClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl FitbitClient {
    /// Create a new Fitbit client with OAuth credentials.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.fitbit_api_url.trim_end_matches('/').to_string(),
            client_id: config.fitbit_client_id.clone(),
            client_secret: config.fitbit_client_secret.clone(),
            redirect_uri: config.fitbit_redirect_uri.clone(),
        }
    }

    /// Sleep logs whose date of sleep falls in `[base_date, end_date]`.
    pub async fn sleep_range(
        &self,
        access_token: &str,
        base_date: &str,
        end_date: &str,
    ) -> Result<Vec<SleepLog>, AppError> {
        let url = format!(
            "{}/1/user/-/sleep/date/{}/{}.json",
            self.base_url, base_date, end_date
        );
        let response: SleepRangeResponse = self.get_json(&url, access_token).await?;
        Ok(response.sleep)
    }

    /// One metric's daily values over `[base_date, end_date]`.
    ///
    /// `resource` is a path such as `activities/steps`; the response holds
    /// the series under the same path with `/` replaced by `-`.
    pub async fn time_series(
        &self,
        access_token: &str,
        resource: &str,
        base_date: &str,
        end_date: &str,
    ) -> Result<Vec<TimeSeriesPoint>, AppError> {
        let url = format!(
            "{}/1/user/-/{}/date/{}/{}.json",
            self.base_url, resource, base_date, end_date
        );
        let mut body: serde_json::Value = self.get_json(&url, access_token).await?;

        let key = resource.replace('/', "-");
        let series = body
            .get_mut(&key)
            .map(serde_json::Value::take)
            .ok_or_else(|| AppError::FitbitApi(format!("Response missing '{}'", key)))?;

        serde_json::from_value(series)
            .map_err(|e| AppError::FitbitApi(format!("Malformed '{}' series: {}", key, e)))
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::FitbitApi(format!("Token refresh request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::FitbitApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Fitbit rate limit hit (429)");
                return Err(AppError::FitbitApi(AppError::FITBIT_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 && body.contains("expired_token") {
                return Err(AppError::FitbitApi(
                    AppError::FITBIT_TOKEN_EXPIRED.to_string(),
                ));
            }

            return Err(AppError::FitbitApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::FitbitApi(format!("JSON parse error: {}", e)))
    }
}

/// Exchanges an OAuth authorization code for a token pair.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError>;
}

#[async_trait]
impl TokenExchange for FitbitClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let url = format!("{}/oauth2/token", self.base_url);
        tracing::info!(url = %url, redirect_uri = %self.redirect_uri, "Exchanging authorization code");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("clientId", self.client_id.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AppError::FitbitApi(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Fitbit token exchange failed");
            return Err(AppError::FitbitApi(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::FitbitApi(format!("Failed to parse token response: {}", e)))
    }
}

/// Token response from the Fitbit token endpoint (both grant types).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub scope: String,
    pub user_id: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Granted scopes as a set.
    pub fn scopes(&self) -> HashSet<&str> {
        self.scope.split_whitespace().collect()
    }

    /// Build the profile to persist for `line_user_id`, with the expiry
    /// measured from `issued_at` (Unix seconds).
    pub fn to_profile(&self, line_user_id: &str, issued_at: f64) -> UserProfile {
        UserProfile {
            line_user_id: line_user_id.to_string(),
            fitbit_user_id: self.user_id.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            scope: self.scope.clone(),
            expires_in: self.expires_in,
            expires_at: issued_at + self.expires_in as f64,
        }
    }
}

/// Current time as fractional Unix seconds.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Sleep range endpoint body.
#[derive(Debug, Deserialize)]
struct SleepRangeResponse {
    #[serde(default)]
    sleep: Vec<SleepLog>,
}

/// One entry of a time-series response.
///
/// `value` is a decimal string for activity metrics and an object for
/// `activities/heart`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub date_time: String,
    pub value: serde_json::Value,
}

impl TimeSeriesPoint {
    /// Numeric value of an activity metric. Fitbit sends these as strings.
    pub fn metric_value(&self) -> Result<f64, AppError> {
        match &self.value {
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            serde_json::Value::Number(n) => n.as_f64(),
            _ => None,
        }
        .ok_or_else(|| {
            AppError::FitbitApi(format!(
                "Non-numeric metric value on {}: {}",
                self.date_time, self.value
            ))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FitbitSession - per-user calls with token management
// ─────────────────────────────────────────────────────────────────────────────

/// Source of raw time-series data for one user.
#[async_trait]
pub trait TimeSeriesProvider: Send + Sync {
    /// Sleep logs for dates in `[base_date, end_date]`.
    async fn sleep_range(&self, base_date: &str, end_date: &str)
        -> Result<Vec<SleepLog>, AppError>;

    /// Daily values of one resource for dates in `[base_date, end_date]`.
    async fn time_series(
        &self,
        resource: &str,
        base_date: &str,
        end_date: &str,
    ) -> Result<Vec<TimeSeriesPoint>, AppError>;
}

/// Notified whenever a session obtains a new token pair.
#[async_trait]
pub trait TokenRefreshHandler: Send + Sync {
    async fn token_refreshed(
        &self,
        line_user_id: &str,
        token: &TokenResponse,
    ) -> Result<(), AppError>;
}

/// Persists refreshed tokens to the user's profile.
pub struct PersistRefreshedToken<'a, S> {
    store: &'a S,
}

impl<'a, S: RecordStore> PersistRefreshedToken<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: RecordStore> TokenRefreshHandler for PersistRefreshedToken<'_, S> {
    async fn token_refreshed(
        &self,
        line_user_id: &str,
        token: &TokenResponse,
    ) -> Result<(), AppError> {
        tracing::info!(user_id = line_user_id, "Fitbit token refreshed, storing");
        let profile = token.to_profile(line_user_id, unix_now());
        self.store.put_profile(&profile).await
    }
}

/// Token pair held by a session.
struct SessionTokens {
    access_token: String,
    refresh_token: String,
    expires_at: f64,
}

/// Authenticated Fitbit access for one user.
///
/// Wraps a shared [`FitbitClient`] and refreshes the user's token when it
/// is about to expire or when Fitbit reports it expired, retrying the
/// failed call once. Each refresh is reported to the injected handler.
pub struct FitbitSession<'a, H> {
    client: &'a FitbitClient,
    line_user_id: String,
    tokens: Mutex<SessionTokens>,
    on_refresh: H,
}

impl<'a, H: TokenRefreshHandler> FitbitSession<'a, H> {
    pub fn new(client: &'a FitbitClient, profile: &UserProfile, on_refresh: H) -> Self {
        Self {
            client,
            line_user_id: profile.line_user_id.clone(),
            tokens: Mutex::new(SessionTokens {
                access_token: profile.access_token.clone(),
                refresh_token: profile.refresh_token.clone(),
                expires_at: profile.expires_at,
            }),
            on_refresh,
        }
    }

    /// Access token valid for at least the refresh margin.
    async fn access_token(&self) -> Result<String, AppError> {
        let mut tokens = self.tokens.lock().await;
        if unix_now() + TOKEN_REFRESH_MARGIN_SECS >= tokens.expires_at {
            tracing::info!(user_id = %self.line_user_id, "Access token expiring, refreshing");
            self.refresh(&mut tokens).await?;
        }
        Ok(tokens.access_token.clone())
    }

    /// Refresh unconditionally and return the new access token.
    async fn force_refresh(&self) -> Result<String, AppError> {
        let mut tokens = self.tokens.lock().await;
        self.refresh(&mut tokens).await?;
        Ok(tokens.access_token.clone())
    }

    async fn refresh(&self, tokens: &mut SessionTokens) -> Result<(), AppError> {
        let new_tokens = self.client.refresh_token(&tokens.refresh_token).await?;

        self.on_refresh
            .token_refreshed(&self.line_user_id, &new_tokens)
            .await?;

        tokens.access_token = new_tokens.access_token;
        tokens.refresh_token = new_tokens.refresh_token;
        tokens.expires_at = unix_now() + new_tokens.expires_in as f64;
        Ok(())
    }

    /// Run `call` with a valid token, refreshing and retrying once if
    /// Fitbit reports the token expired.
    async fn with_token<T, F, Fut>(&self, call: F) -> Result<T, AppError>
    where
        F: Fn(String) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, AppError>> + Send,
        T: Send,
    {
        let token = self.access_token().await?;
        match call(token).await {
            Err(e) if e.is_fitbit_token_expired() => {
                tracing::info!(user_id = %self.line_user_id, "Fitbit rejected expired token, refreshing");
                let token = self.force_refresh().await?;
                call(token).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl<H: TokenRefreshHandler> TimeSeriesProvider for FitbitSession<'_, H> {
    async fn sleep_range(
        &self,
        base_date: &str,
        end_date: &str,
    ) -> Result<Vec<SleepLog>, AppError> {
        self.with_token(|token| async move {
            self.client.sleep_range(&token, base_date, end_date).await
        })
        .await
    }

    async fn time_series(
        &self,
        resource: &str,
        base_date: &str,
        end_date: &str,
    ) -> Result<Vec<TimeSeriesPoint>, AppError> {
        self.with_token(|token| async move {
            self.client
                .time_series(&token, resource, base_date, end_date)
                .await
        })
        .await
    }
}
