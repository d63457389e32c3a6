//! Application configuration loaded from environment variables.
//!
//! The set of variables is fixed; nothing is discovered at runtime.

use std::env;

/// Scopes the bot needs from Fitbit. A grant must match this set exactly.
pub const DEFAULT_FITBIT_SCOPES: &str =
    "activity heartrate location nutrition profile settings sleep social weight";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP project hosting the Firestore database
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Fitbit OAuth client ID (public)
    pub fitbit_client_id: String,
    /// Redirect URI registered with Fitbit (points at `/fitbit/callback`)
    pub fitbit_redirect_uri: String,
    /// Space-separated scope list requested during authorization
    pub fitbit_scopes: String,
    /// Fitbit Web API base URL
    pub fitbit_api_url: String,
    /// Fitbit authorization page base URL
    pub fitbit_auth_url: String,
    /// LINE Messaging API base URL
    pub line_api_url: String,

    // --- Secrets ---
    /// Fitbit OAuth client secret
    pub fitbit_client_secret: String,
    /// LINE channel access token (bearer)
    pub line_channel_access_token: String,
    /// LINE channel secret for webhook signatures; verification is skipped when unset
    pub line_channel_secret: Option<String>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Config for tests only. Base URLs point at a closed local port so
    /// outbound calls fail fast instead of reaching real services.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            fitbit_client_id: "test_client_id".to_string(),
            fitbit_redirect_uri: "http://localhost:8080/fitbit/callback".to_string(),
            fitbit_scopes: DEFAULT_FITBIT_SCOPES.to_string(),
            fitbit_api_url: "http://127.0.0.1:9".to_string(),
            fitbit_auth_url: "https://www.fitbit.com".to_string(),
            line_api_url: "http://127.0.0.1:9".to_string(),
            fitbit_client_secret: "test_secret".to_string(),
            line_channel_access_token: "test_line_token".to_string(),
            line_channel_secret: Some("test_channel_secret".to_string()),
            oauth_state_key: b"test_state_key".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            fitbit_client_id: env::var("FITBIT_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("FITBIT_CLIENT_ID"))?,
            fitbit_redirect_uri: env::var("FITBIT_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("FITBIT_REDIRECT_URI"))?,
            fitbit_scopes: env::var("FITBIT_SCOPES")
                .unwrap_or_else(|_| DEFAULT_FITBIT_SCOPES.to_string()),
            fitbit_api_url: env::var("FITBIT_API_URL")
                .unwrap_or_else(|_| "https://api.fitbit.com".to_string()),
            fitbit_auth_url: env::var("FITBIT_AUTH_URL")
                .unwrap_or_else(|_| "https://www.fitbit.com".to_string()),
            line_api_url: env::var("LINE_API_URL")
                .unwrap_or_else(|_| "https://api.line.me".to_string()),

            fitbit_client_secret: env::var("FITBIT_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FITBIT_CLIENT_SECRET"))?,
            line_channel_access_token: env::var("LINE_CHANNEL_ACCESS_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("LINE_CHANNEL_ACCESS_TOKEN"))?,
            line_channel_secret: env::var("LINE_CHANNEL_SECRET")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map(|v| v.trim().as_bytes().to_vec())
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing("OAUTH_STATE_KEY"))?,
        })
    }

    /// Required scopes as individual entries.
    pub fn required_scopes(&self) -> Vec<&str> {
        self.fitbit_scopes.split_whitespace().collect()
    }

    /// URL a user follows to link their Fitbit account.
    ///
    /// The caller appends `&state=<signed user id>`.
    pub fn fitbit_authorize_url(&self) -> String {
        format!(
            "{}/oauth2/authorize?\
             response_type=code&\
             client_id={}&\
             redirect_uri={}&\
             scope={}&\
             expires_in=3600000",
            self.fitbit_auth_url,
            self.fitbit_client_id,
            urlencoding::encode(&self.fitbit_redirect_uri),
            urlencoding::encode(&self.fitbit_scopes)
        )
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
