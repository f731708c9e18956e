//! Donation handlers.
//!
//! ```text
//! POST  /api/donations {"productId":"…","quantity":5}
//! PATCH /api/donations/{id}/status {"status":"requested"}
//! ```

use actix_web::{HttpResponse, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Donation, DonationId, DonationOffer, DonationStatus, Error, FieldViolation, NearbyDonation,
    ProductId, UnknownStatus,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::error::invalid_identifier;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DonationListQuery {
    /// One of `available`, `requested`, `confirmed`, `picked_up`, `completed`.
    pub status: Option<String>,
}

fn parse_status(raw: &str) -> Result<DonationStatus, Error> {
    raw.parse()
        .map_err(|err: UnknownStatus| Error::invalid_request(err.to_string()))
}

/// Offer body for `POST /api/donations`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct DonationBody {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub product_id: String,
    /// Defaults to the whole product quantity.
    pub quantity: Option<i64>,
    pub notes: Option<String>,
}

impl TryFrom<DonationBody> for DonationOffer {
    type Error = Error;

    fn try_from(body: DonationBody) -> Result<Self, Self::Error> {
        let product_id = ProductId::new(&body.product_id).map_err(|err| {
            Error::validation(vec![FieldViolation::new("productId", err.to_string())])
        })?;
        Ok(Self {
            product_id,
            quantity: body.quantity,
            notes: body.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct StatusBody {
    #[schema(example = "requested")]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub donation: Donation,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DonationsResponse {
    pub donations: Vec<Donation>,
}

/// Available donations with their distance from the caller.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NearbyDonationsResponse {
    pub donations: Vec<NearbyDonation>,
}

fn donation_id(raw: &str) -> Result<DonationId, Error> {
    DonationId::new(raw).map_err(invalid_identifier)
}

#[utoipa::path(
    get,
    path = "/api/donations",
    params(DonationListQuery),
    responses(
        (status = 200, description = "Donations, newest first", body = DonationsResponse),
        (status = 400, description = "Unknown status", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error)
    ),
    tags = ["donations"],
    operation_id = "listDonations"
)]
#[get("")]
pub async fn list_donations(
    state: web::Data<HttpState>,
    _user: Authenticated,
    query: web::Query<DonationListQuery>,
) -> ApiResult<web::Json<DonationsResponse>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let donations = state.donations.list(status).await?;
    Ok(web::Json(DonationsResponse { donations }))
}

/// Donations the caller offered or requested.
#[utoipa::path(
    get,
    path = "/api/donations/mine",
    responses(
        (status = 200, description = "Own donations", body = DonationsResponse),
        (status = 401, description = "Missing or invalid token", body = Error)
    ),
    tags = ["donations"],
    operation_id = "listOwnDonations"
)]
#[get("/mine")]
pub async fn list_own_donations(
    state: web::Data<HttpState>,
    user: Authenticated,
) -> ApiResult<web::Json<DonationsResponse>> {
    let donations = state.donations.list_mine(&user).await?;
    Ok(web::Json(DonationsResponse { donations }))
}

/// Available donations within 50 km of the caller, closest first.
#[utoipa::path(
    get,
    path = "/api/donations/available",
    responses(
        (status = 200, description = "Nearby available donations", body = NearbyDonationsResponse),
        (status = 401, description = "Missing or invalid token", body = Error)
    ),
    tags = ["donations"],
    operation_id = "listAvailableDonations"
)]
#[get("/available")]
pub async fn list_available_donations(
    state: web::Data<HttpState>,
    user: Authenticated,
) -> ApiResult<web::Json<NearbyDonationsResponse>> {
    let donations = state.donations.list_available_nearby(&user).await?;
    Ok(web::Json(NearbyDonationsResponse { donations }))
}

#[utoipa::path(
    get,
    path = "/api/donations/{id}",
    params(("id" = String, Path, description = "Donation id")),
    responses(
        (status = 200, description = "Donation", body = DonationResponse),
        (status = 400, description = "Malformed id", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 404, description = "Unknown donation", body = Error)
    ),
    tags = ["donations"],
    operation_id = "getDonation"
)]
#[get("/{id}")]
pub async fn get_donation(
    state: web::Data<HttpState>,
    _user: Authenticated,
    path: web::Path<String>,
) -> ApiResult<web::Json<DonationResponse>> {
    let donation = state.donations.get(&donation_id(&path)?).await?;
    Ok(web::Json(DonationResponse {
        message: None,
        donation,
    }))
}

/// Offer an owned product. Vendors only.
#[utoipa::path(
    post,
    path = "/api/donations",
    request_body = DonationBody,
    responses(
        (status = 201, description = "Donation offered", body = DonationResponse),
        (status = 400, description = "Validation failed", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "Vendor role required or not the product owner", body = Error),
        (status = 404, description = "Unknown product", body = Error)
    ),
    tags = ["donations"],
    operation_id = "createDonation"
)]
#[post("")]
pub async fn create_donation(
    state: web::Data<HttpState>,
    user: Authenticated,
    payload: web::Json<DonationBody>,
) -> ApiResult<HttpResponse> {
    let offer = DonationOffer::try_from(payload.into_inner())?;
    let donation = state.donations.create(&user, offer).await?;
    Ok(HttpResponse::Created().json(DonationResponse {
        message: Some("Donation created successfully".to_owned()),
        donation,
    }))
}

/// Move a donation one step along its lifecycle.
#[utoipa::path(
    patch,
    path = "/api/donations/{id}/status",
    params(("id" = String, Path, description = "Donation id")),
    request_body = StatusBody,
    responses(
        (status = 200, description = "Status changed", body = DonationResponse),
        (status = 400, description = "Unknown status or invalid transition", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "Caller may not make this change", body = Error),
        (status = 404, description = "Unknown donation", body = Error),
        (status = 409, description = "Status changed concurrently", body = Error)
    ),
    tags = ["donations"],
    operation_id = "updateDonationStatus"
)]
#[patch("/{id}/status")]
pub async fn update_donation_status(
    state: web::Data<HttpState>,
    user: Authenticated,
    path: web::Path<String>,
    payload: web::Json<StatusBody>,
) -> ApiResult<web::Json<DonationResponse>> {
    let id = donation_id(&path)?;
    let status = parse_status(&payload.status)?;
    let donation = state.donations.update_status(&user, &id, status).await?;
    Ok(web::Json(DonationResponse {
        message: Some("Donation status updated successfully".to_owned()),
        donation,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/donations")
            .service(list_donations)
            .service(create_donation)
            .service(list_own_donations)
            .service(list_available_donations)
            .service(get_donation)
            .service(update_donation_status),
    );
}
