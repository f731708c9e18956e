//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint from the inbound layer together
//! with the bearer-token security scheme. The document backs Swagger UI in
//! debug builds.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{
    ChannelSummary, ChatCredentials, CustomerStats, Donation, DonationStatus, Error, ErrorCode,
    FieldViolation, GeoPoint, NearbyDonation, NearbyUser, NgoStats, Product, ProductPage,
    PublicProfile, Role, User, VendorStats,
};
use crate::inbound::http::{accounts, dashboard, donations, health, products, stream, users};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_owned());
        bearer.description =
            Some("Access token returned by POST /api/auth/signup or /api/auth/login.".to_owned());
        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Prakriti Setu API",
        description = "Donation matching between vendors, NGOs and customers."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerAuth" = [])),
    paths(
        health::status,
        health::ready,
        health::live,
        accounts::signup,
        accounts::login,
        accounts::get_profile,
        accounts::update_profile,
        products::list_products,
        products::list_own_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        donations::list_donations,
        donations::list_own_donations,
        donations::list_available_donations,
        donations::get_donation,
        donations::create_donation,
        donations::update_donation_status,
        users::nearby_users,
        users::public_profile,
        stream::issue_token,
        stream::open_channel,
        dashboard::customer_stats,
        dashboard::vendor_stats,
        dashboard::ngo_stats,
    ),
    components(schemas(
        Error,
        ErrorCode,
        FieldViolation,
        GeoPoint,
        Role,
        User,
        PublicProfile,
        NearbyUser,
        Product,
        ProductPage,
        Donation,
        DonationStatus,
        NearbyDonation,
        ChatCredentials,
        ChannelSummary,
        CustomerStats,
        VendorStats,
        NgoStats,
        health::HealthStatus,
        accounts::SignupBody,
        accounts::LoginBody,
        accounts::ProfileBody,
        accounts::AuthResponse,
        accounts::UserResponse,
        products::ProductBody,
        products::ProductResponse,
        products::ProductsResponse,
        products::MessageResponse,
        donations::DonationBody,
        donations::StatusBody,
        donations::DonationResponse,
        donations::DonationsResponse,
        donations::NearbyDonationsResponse,
        users::NearbyUsersResponse,
        users::PublicProfileResponse,
        stream::ChannelBody,
    )),
    tags(
        (name = "health", description = "Status and probes"),
        (name = "auth", description = "Signup, login and the caller's profile"),
        (name = "products", description = "Vendor listings"),
        (name = "donations", description = "Donation offers and their lifecycle"),
        (name = "users", description = "Public user directory"),
        (name = "stream", description = "Chat provider credentials and channels"),
        (name = "dashboard", description = "Role dashboards")
    )
)]
pub struct ApiDoc;
