//! Domain primitives, aggregates and use-case services.
//!
//! Purpose: Define strongly typed entities for the donation marketplace and
//! the services that drive them through the ports in [`ports`]. Types keep
//! their invariants in constructors and document serialisation contracts
//! (serde, camelCase on the wire) in their Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - User, Product, Donation: marketplace aggregates.
//! - AccountService, ProductService, DonationService, DirectoryService,
//!   DashboardService, ChatService: use-cases called by inbound adapters.

pub mod account_service;
pub mod auth;
pub mod chat;
pub mod chat_service;
pub mod dashboard_service;
pub mod directory_service;
pub mod donation;
pub mod donation_service;
pub mod error;
pub mod geo;
mod identifier;
mod port_error_mapping;
pub mod ports;
pub mod product;
pub mod product_service;
pub mod trace_id;
pub mod user;

pub use self::account_service::{AccountService, AuthSession};
pub use self::auth::{
    AccessClaims, LoginCredentials, LoginValidationError, ProfileUpdateRequest, SignupRequest,
    ValidatedSignup,
};
pub use self::chat::{
    ChannelRequest, ChannelSpec, ChannelSummary, ChatCredentials, ChatProfile,
    DEFAULT_CHANNEL_TYPE, fallback_avatar,
};
pub use self::chat_service::ChatService;
pub use self::dashboard_service::{CustomerStats, DashboardService, NgoStats, VendorStats};
pub use self::directory_service::{DirectoryService, NearbyUser, PublicProfile};
pub use self::donation::{
    COMPLETION_SCORE, Donation, DonationId, DonationStatus, LocatedDonation, TransitionError,
    UnknownStatus,
};
pub use self::donation_service::{DonationOffer, DonationService, NearbyDonation};
pub use self::error::{Error, ErrorCode, ErrorValidationError, FieldViolation, TRACE_ID_HEADER};
pub use self::geo::{BoundingBox, GeoPoint, GeoValidationError, Proximity};
pub use self::identifier::InvalidIdentifier;
pub use self::product::{Page, Product, ProductDraft, ProductId, ProductInput, ProductPatch};
pub use self::product_service::{ProductPage, ProductQuery, ProductService};
pub use self::trace_id::TraceId;
pub use self::user::{
    Email, NewUser, PersonName, PhoneNumber, PostalAddress, ProfileUpdate, Role, Roles,
    StoredCredentials, User, UserId, UserValidationError,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use prakriti_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
