//! Session model

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::UserRole;

/// Claims carried inside the signed session cookie.
///
/// Timestamps are Unix seconds to keep the token compact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Logged-in user ID
    #[serde(rename = "uid")]
    pub user_id: i64,
    pub role: UserRole,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl SessionClaims {
    /// Claims issued now that expire after `ttl`.
    ///
    /// Returns `None` when the expiry falls outside the representable range.
    pub fn new(user_id: i64, role: UserRole, ttl: Duration) -> Option<Self> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl)?;
        Some(Self {
            user_id,
            role,
            issued_at: now.timestamp(),
            expires_at: expires_at.timestamp(),
        })
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp()
    }
}
