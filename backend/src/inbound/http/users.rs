//! Public user directory handlers.
//!
//! ```text
//! GET /api/users/nearby?role=ngo&radiusKm=10
//! GET /api/users/{id}
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Error, NearbyUser, PublicProfile, Role, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NearbyQuery {
    /// `customer`, `vendor` or `ngo`; every role when omitted.
    pub role: Option<String>,
    /// Search radius around the caller, 50 km when omitted.
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NearbyUsersResponse {
    pub users: Vec<NearbyUser>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicProfileResponse {
    pub user: PublicProfile,
}

/// Active users around the caller, closest first.
#[utoipa::path(
    get,
    path = "/api/users/nearby",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Nearby users", body = NearbyUsersResponse),
        (status = 400, description = "Unknown role", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error)
    ),
    tags = ["users"],
    operation_id = "listNearbyUsers"
)]
#[get("/nearby")]
pub async fn nearby_users(
    state: web::Data<HttpState>,
    user: Authenticated,
    query: web::Query<NearbyQuery>,
) -> ApiResult<web::Json<NearbyUsersResponse>> {
    let NearbyQuery { role, radius_km } = query.into_inner();
    let role = role
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| raw.parse::<Role>())
        .transpose()
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    let users = state.directory.nearby(&user, role, radius_km).await?;
    Ok(web::Json(NearbyUsersResponse { users }))
}

/// Public profile of an active user; contact details are omitted.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Public profile", body = PublicProfileResponse),
        (status = 400, description = "Malformed id", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 404, description = "Unknown or inactive user", body = Error)
    ),
    tags = ["users"],
    operation_id = "getPublicProfile"
)]
#[get("/{id}")]
pub async fn public_profile(
    state: web::Data<HttpState>,
    _user: Authenticated,
    path: web::Path<String>,
) -> ApiResult<web::Json<PublicProfileResponse>> {
    let id = UserId::new(path.as_str()).map_err(|err| Error::invalid_request(err.to_string()))?;
    let user = state.directory.public_profile(&id).await?;
    Ok(web::Json(PublicProfileResponse { user }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .service(nearby_users)
            .service(public_profile),
    );
}
