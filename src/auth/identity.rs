//! Identity provider adapter
//!
//! Regular users authenticate against an external identity provider. The
//! core only consumes "who is calling" and "what do you know about this
//! user id"; it never manages passwords or tokens for them.

use axum::async_trait;
use chrono::{Duration, Utc};

use super::session::{IdentityClaims, verify_token};
use crate::error::AppError;

/// A caller identity as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    /// Primary email
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<IdentityClaims> for Identity {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            display_name: claims.display_name,
        }
    }
}

/// External identity provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a request credential to an identity.
    ///
    /// Returns `Ok(None)` for missing, expired or forged credentials;
    /// `Err` only when the provider itself failed.
    async fn authenticate(&self, token: &str) -> Result<Option<Identity>, AppError>;

    /// Look up profile data for a user id.
    async fn lookup(&self, user_id: &str) -> Result<Option<Identity>, AppError>;
}

/// Provider accepting HMAC-signed identity tokens
///
/// The provider signs tokens with a secret shared with this service, so
/// verification needs no network round-trip. It has no by-id API;
/// directory data comes from the synced mirror table instead.
///
/// Tokens whose claimed lifetime exceeds `max_age`, or that were issued
/// more than `max_age` ago, are rejected whatever their `expires_at` says.
pub struct SignedTokenProvider {
    secret: String,
    max_age: Duration,
}

impl SignedTokenProvider {
    pub fn new(secret: impl Into<String>, max_age_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            max_age: Duration::seconds(max_age_seconds),
        }
    }

    fn within_max_age(&self, claims: &IdentityClaims) -> bool {
        claims.expires_at - claims.issued_at <= self.max_age
            && claims.issued_at + self.max_age >= Utc::now()
    }
}

#[async_trait]
impl IdentityProvider for SignedTokenProvider {
    async fn authenticate(&self, token: &str) -> Result<Option<Identity>, AppError> {
        match verify_token::<IdentityClaims>(token, &self.secret) {
            Ok(claims) if self.within_max_age(&claims) => Ok(Some(claims.into())),
            Ok(claims) => {
                tracing::debug!(
                    user_id = %claims.user_id,
                    "Rejected identity token exceeding the configured max age"
                );
                Ok(None)
            }
            Err(AppError::Encryption(message)) => Err(AppError::Encryption(message)),
            Err(error) => {
                tracing::debug!(%error, "Rejected identity token");
                Ok(None)
            }
        }
    }

    async fn lookup(&self, _user_id: &str) -> Result<Option<Identity>, AppError> {
        Ok(None)
    }
}
