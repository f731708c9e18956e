//! Port for the hosted chat provider.
//!
//! Message delivery, presence and channel state belong to the provider; the
//! backend only registers users, mints client tokens and creates channels.
use async_trait::async_trait;

use crate::domain::{ChannelSpec, ChatProfile, UserId};

use super::define_port_error;

define_port_error! {
    /// Failures raised by chat provider adapters.
    pub enum ChatProviderError {
        /// The provider could not be reached.
        Transport { message: String } => "chat provider transport failed: {message}",
        /// The provider answered with an error status.
        Rejected { status: u16, message: String } =>
            "chat provider rejected the request with {status}: {message}",
        /// A token could not be minted.
        Token { message: String } => "chat token could not be created: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Public key clients use to connect.
    fn api_key(&self) -> String;

    /// Mint a client token for `user`.
    fn user_token(&self, user: &UserId) -> Result<String, ChatProviderError>;

    /// Create or update the provider's copy of a user.
    async fn upsert_user(&self, profile: &ChatProfile) -> Result<(), ChatProviderError>;

    /// Get or create a channel with the given members.
    async fn create_channel(&self, channel: &ChannelSpec) -> Result<(), ChatProviderError>;
}
