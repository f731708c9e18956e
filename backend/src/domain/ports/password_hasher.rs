//! Port for password hashing and verification.
use async_trait::async_trait;
use zeroize::Zeroizing;

use super::define_port_error;

define_port_error! {
    /// Failures raised by password hashing adapters.
    pub enum PasswordHashError {
        /// Hashing could not be performed.
        Hashing { message: String } => "password hashing failed: {message}",
        /// The stored hash could not be parsed.
        MalformedHash { message: String } => "stored password hash is malformed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Produce a self-describing hash string for `password`.
    async fn hash(&self, password: Zeroizing<String>) -> Result<String, PasswordHashError>;

    /// Whether `password` matches `hash`.
    async fn verify(
        &self,
        password: Zeroizing<String>,
        hash: String,
    ) -> Result<bool, PasswordHashError>;
}
