//! Account use-cases: signup, login, bearer authentication and profile
//! maintenance.
//!
//! Every account is mirrored to the chat provider on signup and on profile
//! changes. Provider failures never block the account operation itself.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info, warn};

use super::ports::{AccessTokens, ChatProvider, PasswordHasher, UserRepository};
use super::{
    ChatProfile, Error, LoginCredentials, NewUser, ProfileUpdateRequest, SignupRequest, User,
};

/// Token and account returned by signup and login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn AccessTokens>,
    chat: Option<Arc<dyn ChatProvider>>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Create the service without a chat provider; see
    /// [`with_chat_provider`](Self::with_chat_provider).
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn AccessTokens>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            chat: None,
            clock,
        }
    }

    /// Mirror accounts to `chat` on signup and profile updates.
    #[must_use]
    pub fn with_chat_provider(mut self, chat: Arc<dyn ChatProvider>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Register a new account and sign the caller in.
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthSession, Error> {
        let signup = request.validate().map_err(Error::validation)?;
        if self.users.find_credentials(&signup.email).await?.is_some() {
            return Err(Error::invalid_request("User already exists with this email"));
        }

        let password_hash = self.hasher.hash(signup.password).await?;
        let now = self.clock.utc();
        let user = User {
            id: super::UserId::random(),
            name: signup.name,
            email: signup.email,
            roles: signup.roles,
            phone: signup.phone,
            address: signup.address,
            location: signup.location,
            donation_score: 0,
            profile_image: signup.profile_image,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        self.users
            .insert(&NewUser {
                user: user.clone(),
                password_hash,
            })
            .await?;
        info!(user_id = %user.id, "account created");

        self.sync_chat_profile(&user).await;
        let token = self.tokens.issue(&user.id, now)?;
        Ok(AuthSession {
            token: token.token,
            user,
        })
    }

    /// Check credentials, stamp `lastLogin` and issue a token.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<AuthSession, Error> {
        let invalid = || Error::unauthorized("Invalid credentials");
        let Some(stored) = self.users.find_credentials(credentials.email()).await? else {
            return Err(invalid());
        };

        let password = zeroize::Zeroizing::new(credentials.password().to_owned());
        if !self.hasher.verify(password, stored.password_hash).await? {
            return Err(invalid());
        }
        let mut user = stored.user;
        if !user.is_active {
            return Err(Error::unauthorized("Account is deactivated"));
        }

        let now = self.clock.utc();
        self.users.record_login(&user.id, now).await?;
        user.last_login = Some(now);
        debug!(user_id = %user.id, "login succeeded");

        let token = self.tokens.issue(&user.id, now)?;
        Ok(AuthSession {
            token: token.token,
            user,
        })
    }

    /// Resolve a bearer token to an active account.
    pub async fn authenticate_token(&self, token: Option<&str>) -> Result<User, Error> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::unauthorized("Access token required"))?;
        let claims = self.tokens.verify(token, self.clock.utc())?;
        let id = claims
            .user_id()
            .map_err(|_| Error::unauthorized("Invalid or expired token"))?;

        match self.users.find_by_id(&id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(Error::unauthorized("User not found or inactive")),
        }
    }

    /// Reload the caller's account.
    pub async fn profile(&self, user: &User) -> Result<User, Error> {
        self.users
            .find_by_id(&user.id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Apply a validated partial update to the caller's profile.
    ///
    /// Only supplied fields change, and the location moves only when both
    /// coordinates are given. The chat provider's copy is refreshed
    /// afterwards; provider failures are logged, not returned.
    pub async fn update_profile(
        &self,
        user: &User,
        request: ProfileUpdateRequest,
    ) -> Result<User, Error> {
        let update = request.validate().map_err(Error::validation)?;
        let mut updated = self.profile(user).await?;
        updated.apply_profile_update(update, self.clock.utc());
        self.users.update_profile(&updated).await?;
        info!(user_id = %updated.id, "profile updated");

        self.sync_chat_profile(&updated).await;
        Ok(updated)
    }

    async fn sync_chat_profile(&self, user: &User) {
        let Some(chat) = &self.chat else {
            warn!(user_id = %user.id, "chat provider not configured; skipping user sync");
            return;
        };
        if let Err(error) = chat.upsert_user(&ChatProfile::from_user(user)).await {
            warn!(user_id = %user.id, %error, "chat user sync failed");
        }
    }
}
