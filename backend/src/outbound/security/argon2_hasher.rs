//! Argon2id password hashing.
//!
//! Hashing is CPU bound, so both operations run on Tokio's blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier};
use async_trait::async_trait;
use tokio::task::spawn_blocking;
use zeroize::Zeroizing;

use crate::domain::TraceId;
use crate::domain::ports::{PasswordHashError, PasswordHasher};

/// Produces PHC strings (`$argon2id$v=19$...`) with the crate defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2PasswordHasher;

async fn blocking<T, F>(work: F) -> Result<T, PasswordHashError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PasswordHashError> + Send + 'static,
{
    let trace_id = TraceId::current();
    spawn_blocking(move || match trace_id {
        Some(id) => TraceId::sync_scope(id, work),
        None => work(),
    })
    .await
    .map_err(|err| PasswordHashError::hashing(format!("hashing task failed: {err}")))?
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, password: Zeroizing<String>) -> Result<String, PasswordHashError> {
        blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| PasswordHashError::hashing(err.to_string()))
        })
        .await
    }

    async fn verify(
        &self,
        password: Zeroizing<String>,
        hash: String,
    ) -> Result<bool, PasswordHashError> {
        blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|err| PasswordHashError::malformed_hash(err.to_string()))?;
            match Argon2::default().verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(err) => Err(PasswordHashError::hashing(err.to_string())),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> Zeroizing<String> {
        Zeroizing::new(value.to_owned())
    }

    #[tokio::test]
    async fn hashes_verify_only_the_original_password() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash(secret("secret1")).await.expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(secret("secret1"), hash.clone()).await.expect("verify"));
        assert!(!hasher.verify(secret("secret2"), hash).await.expect("verify"));
    }

    #[tokio::test]
    async fn malformed_hashes_are_reported() {
        let err = Argon2PasswordHasher
            .verify(secret("secret1"), "plain-text".into())
            .await
            .expect_err("malformed");
        assert!(matches!(err, PasswordHashError::MalformedHash { .. }));
    }
}
