//! Port for user account persistence.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BoundingBox, Email, NewUser, Role, StoredCredentials, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another account already uses this email address.
        DuplicateEmail => "email address is already registered",
    }
}

/// Candidate filter for proximity searches over users.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyUsersFilter {
    pub bounds: BoundingBox,
    pub role: Option<Role>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account; fails with `DuplicateEmail` when taken.
    async fn insert(&self, user: &NewUser) -> Result<(), UserPersistenceError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch every user whose id is listed; unknown ids are ignored.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, UserPersistenceError>;

    /// Load an account and its password hash for a credential check.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, UserPersistenceError>;

    /// Persist profile fields of an existing user.
    async fn update_profile(&self, user: &User) -> Result<(), UserPersistenceError>;

    async fn record_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), UserPersistenceError>;

    /// Every active user with a location inside `filter.bounds`.
    ///
    /// The result is deliberately uncapped; callers refine by exact
    /// distance and apply the result limit afterwards.
    async fn find_in_bounds(
        &self,
        filter: NearbyUsersFilter,
    ) -> Result<Vec<User>, UserPersistenceError>;
}
