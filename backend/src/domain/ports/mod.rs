//! Driven ports: the traits domain services use to reach persistence,
//! credential handling and the chat provider.
//!
//! Each port exposes a typed error generated by [`define_port_error!`] so
//! adapters map their failures into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod access_tokens;
mod chat_provider;
mod donation_repository;
mod password_hasher;
mod product_repository;
mod user_repository;

#[cfg(test)]
pub use access_tokens::MockAccessTokens;
pub use access_tokens::{AccessTokenError, AccessTokens, IssuedToken};
#[cfg(test)]
pub use chat_provider::MockChatProvider;
pub use chat_provider::{ChatProvider, ChatProviderError};
#[cfg(test)]
pub use donation_repository::MockDonationRepository;
pub use donation_repository::{DonationFilter, DonationPersistenceError, DonationRepository};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use product_repository::MockProductRepository;
pub use product_repository::{
    ProductFilter, ProductPersistenceError, ProductRepository, Window,
};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{NearbyUsersFilter, UserPersistenceError, UserRepository};
