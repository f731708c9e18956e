//! Conversions from driven-port failures into domain errors.
//!
//! Connection failures surface as `service_unavailable`; anything else is an
//! internal error whose detail only reaches the logs.

use tracing::error;

use super::Error;
use super::ports::{
    AccessTokenError, DonationPersistenceError, PasswordHashError, ProductPersistenceError,
    UserPersistenceError,
};

const DATABASE_UNAVAILABLE: &str = "database is unavailable";

impl From<UserPersistenceError> for Error {
    fn from(value: UserPersistenceError) -> Self {
        match value {
            UserPersistenceError::Connection { message } => {
                error!(%message, "user store connection failed");
                Error::service_unavailable(DATABASE_UNAVAILABLE)
            }
            UserPersistenceError::Query { message } => {
                error!(%message, "user store query failed");
                Error::internal(message)
            }
            UserPersistenceError::DuplicateEmail => {
                Error::invalid_request("User already exists with this email")
            }
        }
    }
}

impl From<ProductPersistenceError> for Error {
    fn from(value: ProductPersistenceError) -> Self {
        match value {
            ProductPersistenceError::Connection { message } => {
                error!(%message, "product store connection failed");
                Error::service_unavailable(DATABASE_UNAVAILABLE)
            }
            ProductPersistenceError::Query { message } => {
                error!(%message, "product store query failed");
                Error::internal(message)
            }
        }
    }
}

impl From<DonationPersistenceError> for Error {
    fn from(value: DonationPersistenceError) -> Self {
        match value {
            DonationPersistenceError::Connection { message } => {
                error!(%message, "donation store connection failed");
                Error::service_unavailable(DATABASE_UNAVAILABLE)
            }
            DonationPersistenceError::Query { message } => {
                error!(%message, "donation store query failed");
                Error::internal(message)
            }
        }
    }
}

impl From<PasswordHashError> for Error {
    fn from(value: PasswordHashError) -> Self {
        error!(error = %value, "password hashing failed");
        Error::internal(value.to_string())
    }
}

impl From<AccessTokenError> for Error {
    fn from(value: AccessTokenError) -> Self {
        match value {
            AccessTokenError::Invalid { .. } | AccessTokenError::Expired => {
                Error::unauthorized("Invalid or expired token")
            }
            AccessTokenError::Signing { message } => {
                error!(%message, "access token signing failed");
                Error::internal(message)
            }
        }
    }
}
