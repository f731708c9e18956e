//! In-memory adapters for unit and integration tests.
//!
//! [`InMemoryStore`] implements every repository port over mutex-guarded
//! vectors, [`PlainTextHasher`] skips the cost of Argon2, and
//! [`RecordingChatProvider`] captures provider calls and can be told to fail.
//! [`TestContext`] wires them into the HTTP state the handlers expect.

use std::sync::{Arc, Mutex, MutexGuard};

use actix_web::{http::header, web};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use zeroize::Zeroizing;

use crate::domain::ports::{
    AccessTokens, ChatProvider, ChatProviderError, DonationFilter, DonationPersistenceError,
    DonationRepository, NearbyUsersFilter, PasswordHashError, PasswordHasher, ProductFilter,
    ProductPersistenceError, ProductRepository, UserPersistenceError, UserRepository, Window,
};
use crate::domain::{
    BoundingBox, ChannelSpec, ChatProfile, Donation, DonationId, DonationStatus, Email, GeoPoint,
    LocatedDonation, NewUser, PersonName, PhoneNumber, PostalAddress, Product, ProductId, Role,
    Roles, StoredCredentials, User, UserId,
};
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::outbound::security::JwtAccessTokens;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Clock whose time only moves when a test says so.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Clock fixed at 2024-06-01T10:00:00Z.
    pub fn fixed() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 6, 1, 10, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::new(start)
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Active user holding `role` at the given coordinates.
///
/// Panics on out-of-range coordinates; fixtures are expected to be valid.
pub fn sample_user(role: Role, latitude: f64, longitude: f64) -> User {
    let now = Utc::now();
    let id = UserId::random();
    let parts = (
        PersonName::new("Sample Person"),
        Email::new(format!("{id}@example.org")),
        Roles::new([role]),
        PhoneNumber::new("9876543210"),
        PostalAddress::new("1 Sample Street"),
    );
    let (Ok(name), Ok(email), Ok(roles), Ok(phone), Ok(address)) = parts else {
        panic!("sample user fields must validate");
    };
    let location = match GeoPoint::new(latitude, longitude) {
        Ok(point) => point,
        Err(error) => panic!("sample user location must validate: {error}"),
    };
    User {
        id,
        name,
        email,
        roles,
        phone,
        address,
        location,
        donation_score: 0,
        profile_image: None,
        is_active: true,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

/// Repository double backing users, products and donations.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<Vec<StoredCredentials>>,
    products: Mutex<Vec<Product>>,
    donations: Mutex<Vec<Donation>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of a stored user, for assertions.
    pub fn user(&self, id: &UserId) -> Option<User> {
        lock(&self.users)
            .iter()
            .find(|stored| &stored.user.id == id)
            .map(|stored| stored.user.clone())
    }

    /// Flip the active flag of a stored user.
    pub fn set_user_active(&self, id: &UserId, active: bool) {
        if let Some(stored) = lock(&self.users)
            .iter_mut()
            .find(|stored| &stored.user.id == id)
        {
            stored.user.is_active = active;
        }
    }

    /// Store `user` directly, bypassing signup.
    pub fn seed_user(&self, user: &User, password_hash: &str) {
        lock(&self.users).push(StoredCredentials {
            user: user.clone(),
            password_hash: password_hash.to_owned(),
        });
    }

    /// Store `product` directly, bypassing the listing rules.
    pub fn seed_product(&self, product: &Product) {
        lock(&self.products).push(product.clone());
    }

    pub fn product(&self, id: &ProductId) -> Option<Product> {
        lock(&self.products).iter().find(|p| &p.id == id).cloned()
    }

    /// Store `donation` directly, in whatever state the test needs.
    pub fn seed_donation(&self, donation: &Donation) {
        lock(&self.donations).push(donation.clone());
    }

    pub fn donation(&self, id: &DonationId) -> Option<Donation> {
        lock(&self.donations).iter().find(|d| &d.id == id).cloned()
    }
}

fn newest_first<T: Clone>(items: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut sorted: Vec<T> = items.iter().rev().cloned().collect();
    sorted.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    sorted
}

fn product_matches(filter: &ProductFilter, product: &Product) -> bool {
    (!filter.active_only || product.is_active)
        && filter
            .category
            .as_ref()
            .is_none_or(|category| category == &product.category)
        && filter
            .vendor_id
            .as_ref()
            .is_none_or(|vendor| vendor == &product.vendor_id)
        && filter
            .bounds
            .as_ref()
            .is_none_or(|bounds| bounds.contains(&product.location))
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, user: &NewUser) -> Result<(), UserPersistenceError> {
        let mut users = lock(&self.users);
        if users.iter().any(|stored| stored.user.email == user.user.email) {
            return Err(UserPersistenceError::duplicate_email());
        }
        users.push(StoredCredentials {
            user: user.user.clone(),
            password_hash: user.password_hash.clone(),
        });
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.user(id))
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, UserPersistenceError> {
        Ok(lock(&self.users)
            .iter()
            .filter(|stored| ids.contains(&stored.user.id))
            .map(|stored| stored.user.clone())
            .collect())
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, UserPersistenceError> {
        Ok(lock(&self.users)
            .iter()
            .find(|stored| &stored.user.email == email)
            .cloned())
    }

    async fn update_profile(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut users = lock(&self.users);
        let stored = users
            .iter_mut()
            .find(|stored| stored.user.id == user.id)
            .ok_or_else(|| UserPersistenceError::query("user does not exist"))?;
        stored.user = user.clone();
        Ok(())
    }

    async fn record_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), UserPersistenceError> {
        if let Some(stored) = lock(&self.users)
            .iter_mut()
            .find(|stored| &stored.user.id == id)
        {
            stored.user.last_login = Some(at);
        }
        Ok(())
    }

    async fn find_in_bounds(
        &self,
        filter: NearbyUsersFilter,
    ) -> Result<Vec<User>, UserPersistenceError> {
        Ok(lock(&self.users)
            .iter()
            .map(|stored| &stored.user)
            .filter(|user| user.is_active && filter.bounds.contains(&user.location))
            .filter(|user| filter.role.is_none_or(|role| user.has_role(role)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn insert(&self, product: &Product) -> Result<(), ProductPersistenceError> {
        lock(&self.products).push(product.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ProductId,
    ) -> Result<Option<Product>, ProductPersistenceError> {
        Ok(self.product(id))
    }

    async fn update(&self, product: &Product) -> Result<(), ProductPersistenceError> {
        let mut products = lock(&self.products);
        let stored = products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| ProductPersistenceError::query("product does not exist"))?;
        *stored = product.clone();
        Ok(())
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        window: Window,
    ) -> Result<Vec<Product>, ProductPersistenceError> {
        let products = lock(&self.products);
        let matching: Vec<Product> = products
            .iter()
            .filter(|p| product_matches(filter, p))
            .cloned()
            .collect();
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        Ok(newest_first(&matching, |p| p.created_at)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, ProductPersistenceError> {
        let count = lock(&self.products)
            .iter()
            .filter(|p| product_matches(filter, p))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl DonationRepository for InMemoryStore {
    async fn insert(&self, donation: &Donation) -> Result<(), DonationPersistenceError> {
        lock(&self.donations).push(donation.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &DonationId,
    ) -> Result<Option<Donation>, DonationPersistenceError> {
        Ok(self.donation(id))
    }

    async fn apply_transition(
        &self,
        next: &Donation,
        expected: DonationStatus,
        vendor_credit: Option<i32>,
    ) -> Result<bool, DonationPersistenceError> {
        let mut users = lock(&self.users);
        let mut donations = lock(&self.donations);
        let stored = donations
            .iter_mut()
            .find(|d| d.id == next.id)
            .ok_or_else(|| DonationPersistenceError::query("donation does not exist"))?;
        if stored.status != expected {
            return Ok(false);
        }
        if let Some(delta) = vendor_credit {
            let vendor = users
                .iter_mut()
                .find(|u| u.user.id == next.vendor_id)
                .ok_or_else(|| DonationPersistenceError::query("vendor does not exist"))?;
            vendor.user.donation_score += delta;
        }
        *stored = next.clone();
        Ok(true)
    }

    async fn list(
        &self,
        filter: &DonationFilter,
    ) -> Result<Vec<Donation>, DonationPersistenceError> {
        let matching: Vec<Donation> = lock(&self.donations)
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |d| d.created_at))
    }

    async fn count(&self, filter: &DonationFilter) -> Result<u64, DonationPersistenceError> {
        let count = lock(&self.donations)
            .iter()
            .filter(|d| filter.matches(d))
            .count();
        Ok(count as u64)
    }

    async fn count_distinct_vendors(
        &self,
        filter: &DonationFilter,
    ) -> Result<u64, DonationPersistenceError> {
        let mut vendors: Vec<UserId> = Vec::new();
        for donation in lock(&self.donations).iter().filter(|d| filter.matches(d)) {
            if !vendors.contains(&donation.vendor_id) {
                vendors.push(donation.vendor_id.clone());
            }
        }
        Ok(vendors.len() as u64)
    }

    async fn available_in_bounds(
        &self,
        bounds: BoundingBox,
    ) -> Result<Vec<LocatedDonation>, DonationPersistenceError> {
        let products = lock(&self.products);
        let donations = lock(&self.donations);
        Ok(donations
            .iter()
            .filter(|d| d.status == DonationStatus::Available)
            .filter_map(|d| {
                products
                    .iter()
                    .find(|p| p.id == d.product_id && p.is_active)
                    .filter(|p| bounds.contains(&p.location))
                    .map(|p| LocatedDonation {
                        donation: d.clone(),
                        location: p.location,
                    })
            })
            .collect())
    }
}

/// Reversible "hash" for tests: `plain$<password>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextHasher;

#[async_trait]
impl PasswordHasher for PlainTextHasher {
    async fn hash(&self, password: Zeroizing<String>) -> Result<String, PasswordHashError> {
        Ok(format!("plain${}", password.as_str()))
    }

    async fn verify(
        &self,
        password: Zeroizing<String>,
        hash: String,
    ) -> Result<bool, PasswordHashError> {
        let stored = hash
            .strip_prefix("plain$")
            .ok_or_else(|| PasswordHashError::malformed_hash("missing plain$ prefix"))?;
        Ok(stored == password.as_str())
    }
}

/// Chat provider double that records every call.
#[derive(Default)]
pub struct RecordingChatProvider {
    fail: Mutex<bool>,
    upserts: Mutex<Vec<ChatProfile>>,
    channels: Mutex<Vec<ChannelSpec>>,
}

impl RecordingChatProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent provider calls fail.
    pub fn fail_requests(&self, fail: bool) {
        *lock(&self.fail) = fail;
    }

    pub fn upserted(&self) -> Vec<ChatProfile> {
        lock(&self.upserts).clone()
    }

    pub fn channels(&self) -> Vec<ChannelSpec> {
        lock(&self.channels).clone()
    }

    fn check(&self) -> Result<(), ChatProviderError> {
        if *lock(&self.fail) {
            return Err(ChatProviderError::rejected(500_u16, "simulated outage"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for RecordingChatProvider {
    fn api_key(&self) -> String {
        "test-api-key".to_owned()
    }

    fn user_token(&self, user: &UserId) -> Result<String, ChatProviderError> {
        self.check()?;
        Ok(format!("chat-token-{user}"))
    }

    async fn upsert_user(&self, profile: &ChatProfile) -> Result<(), ChatProviderError> {
        self.check()?;
        lock(&self.upserts).push(profile.clone());
        Ok(())
    }

    async fn create_channel(&self, channel: &ChannelSpec) -> Result<(), ChatProviderError> {
        self.check()?;
        lock(&self.channels).push(channel.clone());
        Ok(())
    }
}

const TEST_TOKEN_SECRET: &[u8] = b"test-secret-test-secret-test-secret";

/// `Authorization` header carrying `token` as a bearer credential.
pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

/// HTTP state wired over the in-memory adapters, plus handles for
/// arranging and inspecting it.
///
/// Tokens are real HS256 JWTs so the bearer extractor runs unchanged.
pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub chat: Arc<RecordingChatProvider>,
    pub clock: Arc<MutableClock>,
    tokens: Arc<JwtAccessTokens>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
            chat: RecordingChatProvider::new(),
            clock: Arc::new(MutableClock::fixed()),
            tokens: Arc::new(JwtAccessTokens::new(TEST_TOKEN_SECRET, TimeDelta::hours(1))),
        }
    }

    fn ports(&self, chat: Option<Arc<dyn ChatProvider>>) -> HttpStatePorts {
        HttpStatePorts {
            users: self.store.clone(),
            products: self.store.clone(),
            donations: self.store.clone(),
            hasher: Arc::new(PlainTextHasher),
            tokens: self.tokens.clone(),
            chat,
            clock: self.clock.clone(),
        }
    }

    /// State with the recording chat provider configured.
    pub fn state(&self) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(self.ports(Some(self.chat.clone()))))
    }

    /// State as it looks when chat credentials are missing.
    pub fn state_without_chat(&self) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(self.ports(None)))
    }

    /// Seed an active user in Bengaluru and sign a token for it.
    ///
    /// The stored password is `secret1`.
    pub fn signed_in(&self, role: Role) -> (User, String) {
        self.signed_in_at(role, 12.9716, 77.5946)
    }

    pub fn signed_in_at(&self, role: Role, latitude: f64, longitude: f64) -> (User, String) {
        let user = sample_user(role, latitude, longitude);
        self.store.seed_user(&user, "plain$secret1");
        let token = self.token_for(&user.id);
        (user, token)
    }

    /// Sign a token for an already stored user.
    pub fn token_for(&self, user: &UserId) -> String {
        match self.tokens.issue(user, self.clock.utc()) {
            Ok(issued) => issued.token,
            Err(error) => panic!("test token must sign: {error}"),
        }
    }
}
