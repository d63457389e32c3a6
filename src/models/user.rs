//! User profile linking a LINE user to their Fitbit account.

use serde::{Deserialize, Serialize};

/// Profile stored in `m_user`, keyed by LINE user ID.
///
/// Created when the OAuth handoff succeeds and rewritten on every token
/// refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// LINE user ID (also used as document ID)
    pub line_user_id: String,
    /// Fitbit encoded user ID
    pub fitbit_user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Space-separated scopes granted by the user
    pub scope: String,
    /// Access token lifetime in seconds, as reported at issue time
    pub expires_in: i64,
    /// Access token expiry (Unix seconds, fractional)
    pub expires_at: f64,
}

