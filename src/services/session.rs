//! Signed session tokens
//!
//! A session is a stateless cookie of the form `payload.signature`, where
//! `payload` is the base64url JSON of [`SessionClaims`] and `signature` is
//! the base64url HMAC-SHA256 of `payload`. Nothing is stored server-side.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::Duration;
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SessionConfig;
use crate::models::{SessionClaims, UserRole};

type HmacSha256 = Hmac<Sha256>;

/// Length of a generated signing key, in bytes
pub const GENERATED_KEY_LEN: usize = 32;

/// Session token errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Malformed session token")]
    Malformed,
    #[error("Session signature mismatch")]
    BadSignature,
    #[error("Session expired")]
    Expired,
    #[error("Invalid signing key")]
    InvalidKey,
    #[error("Session lifetime out of range")]
    TtlOutOfRange,
    #[error("Failed to encode session claims: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Issues and validates session cookies.
#[derive(Clone)]
pub struct SessionManager {
    key: Vec<u8>,
    ttl: Duration,
    cookie_name: String,
    secure: bool,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(key: impl Into<Vec<u8>>, ttl: Duration, cookie_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl,
            cookie_name: cookie_name.into(),
            secure: false,
        }
    }

    /// Build from configuration, generating a random key when no secret is set.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let ttl = Duration::try_hours(config.ttl_hours).ok_or(SessionError::TtlOutOfRange)?;
        let key = match &config.secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::warn!("No session secret configured; sessions will not survive a restart");
                let mut key = vec![0u8; GENERATED_KEY_LEN];
                OsRng.fill_bytes(&mut key);
                key
            }
        };

        Ok(Self {
            key,
            ttl,
            cookie_name: config.cookie_name.clone(),
            secure: config.secure,
        })
    }

    /// Mark issued cookies `Secure`
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| SessionError::InvalidKey)
    }

    /// Issue a signed token for a freshly authenticated user.
    pub fn establish(&self, user_id: i64, role: UserRole) -> Result<String, SessionError> {
        let claims = SessionClaims::new(user_id, role, self.ttl).ok_or(SessionError::TtlOutOfRange)?;
        self.encode(&claims)
    }

    /// Sign arbitrary claims.
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        let payload = BASE64URL_NOPAD.encode(&serde_json::to_vec(claims)?);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = BASE64URL_NOPAD.encode(&mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked in constant time before the payload is parsed.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let (payload, signature) = token.split_once('.').ok_or(SessionError::Malformed)?;
        let signature = BASE64URL_NOPAD
            .decode(signature.as_bytes())
            .map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let json = BASE64URL_NOPAD
            .decode(payload.as_bytes())
            .map_err(|_| SessionError::Malformed)?;
        let claims: SessionClaims =
            serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)?;

        if claims.is_expired() {
            return Err(SessionError::Expired);
        }

        Ok(claims)
    }

    /// Claims of a valid token, `None` for anything else.
    pub fn validate(&self, token: &str) -> Option<SessionClaims> {
        match self.decode(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                None
            }
        }
    }

    /// `Set-Cookie` value carrying a session token
    pub fn set_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.cookie_name,
            token,
            self.ttl.num_seconds(),
            if self.secure { "; Secure" } else { "" }
        )
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            self.cookie_name,
            if self.secure { "; Secure" } else { "" }
        )
    }
}
