//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    AccessTokens, ChatProvider, DonationRepository, PasswordHasher, ProductRepository,
    UserRepository,
};
use crate::domain::{
    AccountService, ChatService, DashboardService, DirectoryService, DonationService,
    ProductService,
};

/// Parameter object bundling the driven-port implementations.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub donations: Arc<dyn DonationRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn AccessTokens>,
    /// `None` when the chat provider credentials are not configured.
    pub chat: Option<Arc<dyn ChatProvider>>,
    pub clock: Arc<dyn Clock>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: AccountService,
    pub products: ProductService,
    pub donations: DonationService,
    pub directory: DirectoryService,
    pub dashboard: DashboardService,
    pub chat: ChatService,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Wire every domain service from one set of ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use chrono::TimeDelta;
    /// use mockable::DefaultClock;
    /// use prakriti_backend::inbound::http::state::{HttpState, HttpStatePorts};
    /// use prakriti_backend::outbound::security::JwtAccessTokens;
    /// use prakriti_backend::test_support::{InMemoryStore, PlainTextHasher};
    ///
    /// let store = InMemoryStore::new();
    /// let state = HttpState::new(HttpStatePorts {
    ///     users: store.clone(),
    ///     products: store.clone(),
    ///     donations: store,
    ///     hasher: Arc::new(PlainTextHasher),
    ///     tokens: Arc::new(JwtAccessTokens::new(b"doc-secret", TimeDelta::hours(1))),
    ///     chat: None,
    ///     clock: Arc::new(DefaultClock),
    /// });
    /// let _accounts = state.accounts.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            users,
            products,
            donations,
            hasher,
            tokens,
            chat,
            clock,
        } = ports;

        let accounts = AccountService::new(users.clone(), hasher, tokens, clock.clone());
        let accounts = match &chat {
            Some(provider) => accounts.with_chat_provider(provider.clone()),
            None => accounts,
        };
        let directory = DirectoryService::new(users.clone());
        Self {
            accounts,
            products: ProductService::new(products.clone(), clock.clone()),
            donations: DonationService::new(donations.clone(), products.clone(), clock),
            dashboard: DashboardService::new(directory.clone(), products, donations),
            directory,
            chat: ChatService::new(users, chat),
        }
    }
}
