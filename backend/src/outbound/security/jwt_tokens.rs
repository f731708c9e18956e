//! HS256 bearer tokens for the REST API.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::domain::AccessClaims;
use crate::domain::UserId;
use crate::domain::ports::{AccessTokenError, AccessTokens, IssuedToken};

/// Signs and verifies access tokens with a shared secret.
///
/// Expiry is checked against the caller-supplied clock rather than system
/// time so tests can move time forward deterministically.
#[derive(Clone)]
pub struct JwtAccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl JwtAccessTokens {
    /// # Examples
    /// ```
    /// use chrono::{TimeDelta, Utc};
    /// use prakriti_backend::domain::UserId;
    /// use prakriti_backend::domain::ports::AccessTokens;
    /// use prakriti_backend::outbound::security::JwtAccessTokens;
    ///
    /// let tokens = JwtAccessTokens::new(b"a-long-shared-secret", TimeDelta::hours(1));
    /// let user = UserId::random();
    /// let now = Utc::now();
    /// let issued = tokens.issue(&user, now).expect("sign");
    /// let claims = tokens.verify(&issued.token, now).expect("verify");
    /// assert_eq!(claims.user_id().expect("uuid subject"), user);
    /// ```
    pub fn new(secret: &[u8], ttl: TimeDelta) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }
}

impl AccessTokens for JwtAccessTokens {
    fn issue(&self, user: &UserId, now: DateTime<Utc>) -> Result<IssuedToken, AccessTokenError> {
        let expires_at = now + self.ttl;
        let claims = AccessClaims {
            sub: user.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AccessTokenError::signing(err.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, AccessTokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AccessTokenError::expired(),
                _ => AccessTokenError::invalid(err.to_string()),
            },
        )?;
        if data.claims.exp <= now.timestamp() {
            return Err(AccessTokenError::expired());
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn tokens() -> JwtAccessTokens {
        JwtAccessTokens::new(b"test-secret-test-secret", TimeDelta::days(7))
    }

    #[rstest]
    fn tokens_expire_after_ttl(tokens: JwtAccessTokens) {
        let now = Utc::now();
        let issued = tokens.issue(&UserId::random(), now).expect("sign");
        assert_eq!(issued.expires_at, now + TimeDelta::days(7));

        assert!(tokens.verify(&issued.token, now + TimeDelta::days(6)).is_ok());
        assert_eq!(
            tokens.verify(&issued.token, now + TimeDelta::days(8)),
            Err(AccessTokenError::expired())
        );
    }

    #[rstest]
    fn foreign_signatures_are_rejected(tokens: JwtAccessTokens) {
        let other = JwtAccessTokens::new(b"another-secret-entirely", TimeDelta::days(7));
        let now = Utc::now();
        let issued = other.issue(&UserId::random(), now).expect("sign");
        assert!(matches!(
            tokens.verify(&issued.token, now),
            Err(AccessTokenError::Invalid { .. })
        ));
        assert!(matches!(
            tokens.verify("not.a.token", now),
            Err(AccessTokenError::Invalid { .. })
        ));
    }
}
