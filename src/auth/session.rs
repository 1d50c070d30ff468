//! Signed session tokens
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.
//!
//! Two token kinds share the format: federated identity tokens minted by
//! the identity provider, and operator session tokens minted by
//! `POST /api/admin/login`. They are signed with different secrets.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a signed token
pub trait SignedClaims: Serialize + DeserializeOwned {
    fn expires_at(&self) -> DateTime<Utc>;

    /// Check if the token is expired
    fn is_expired(&self) -> bool {
        self.expires_at() < Utc::now()
    }
}

/// Caller identity issued by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Opaque user id
    pub user_id: String,
    /// Primary email
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdentityClaims {
    pub fn new(
        user_id: impl Into<String>,
        email: Option<String>,
        display_name: Option<String>,
        max_age_seconds: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            email,
            display_name,
            issued_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }
}

impl SignedClaims for IdentityClaims {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Operator session stored in the `admin-session` cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSession {
    /// Normalized operator email
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    /// Operator sessions last 24 hours
    pub const MAX_AGE_SECONDS: i64 = 24 * 60 * 60;

    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            email: email.into(),
            issued_at: now,
            expires_at: now + Duration::seconds(Self::MAX_AGE_SECONDS),
        }
    }
}

impl SignedClaims for AdminSession {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Create a signed token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `claims` - Claims to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_token<T: SignedClaims>(claims: &T, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(claims).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a signed token
///
/// # Errors
/// `InvalidSignature` if the MAC does not match, `Unauthorized` if the
/// token is malformed or expired
pub fn verify_token<T: SignedClaims>(token: &str, secret: &str) -> Result<T, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidSignature)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let claims: T = serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    if claims.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}
