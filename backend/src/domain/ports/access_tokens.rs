//! Port for issuing and verifying API access tokens.
use chrono::{DateTime, Utc};

use crate::domain::{AccessClaims, UserId};

use super::define_port_error;

define_port_error! {
    /// Failures raised by access token adapters.
    pub enum AccessTokenError {
        /// Signature, encoding or claims were not acceptable.
        Invalid { message: String } => "access token is invalid: {message}",
        /// The token was valid but has expired.
        Expired => "access token has expired",
        /// A token could not be signed.
        Signing { message: String } => "access token signing failed: {message}",
    }
}

/// Signed token plus its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
pub trait AccessTokens: Send + Sync {
    /// Sign a token for `user` valid from `now`.
    fn issue(&self, user: &UserId, now: DateTime<Utc>) -> Result<IssuedToken, AccessTokenError>;

    /// Check signature and expiry against `now` and return the claims.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, AccessTokenError>;
}
