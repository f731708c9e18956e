//! Role dashboards. Each endpoint wraps its counters as `{"stats": {...}}`.

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CustomerStats, Error, NgoStats, VendorStats};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse<T> {
    pub stats: T,
}

#[utoipa::path(
    get,
    path = "/api/dashboard/customer/stats",
    responses(
        (status = 200, description = "Customer counters", body = StatsResponse<CustomerStats>),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "Customer role required", body = Error)
    ),
    tags = ["dashboard"],
    operation_id = "customerStats"
)]
#[get("/customer/stats")]
pub async fn customer_stats(
    state: web::Data<HttpState>,
    user: Authenticated,
) -> ApiResult<web::Json<StatsResponse<CustomerStats>>> {
    let stats = state.dashboard.customer_stats(&user).await?;
    Ok(web::Json(StatsResponse { stats }))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/vendor/stats",
    responses(
        (status = 200, description = "Vendor counters", body = StatsResponse<VendorStats>),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "Vendor role required", body = Error)
    ),
    tags = ["dashboard"],
    operation_id = "vendorStats"
)]
#[get("/vendor/stats")]
pub async fn vendor_stats(
    state: web::Data<HttpState>,
    user: Authenticated,
) -> ApiResult<web::Json<StatsResponse<VendorStats>>> {
    let stats = state.dashboard.vendor_stats(&user).await?;
    Ok(web::Json(StatsResponse { stats }))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/ngo/stats",
    responses(
        (status = 200, description = "NGO counters", body = StatsResponse<NgoStats>),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "NGO role required", body = Error)
    ),
    tags = ["dashboard"],
    operation_id = "ngoStats"
)]
#[get("/ngo/stats")]
pub async fn ngo_stats(
    state: web::Data<HttpState>,
    user: Authenticated,
) -> ApiResult<web::Json<StatsResponse<NgoStats>>> {
    let stats = state.dashboard.ngo_stats(&user).await?;
    Ok(web::Json(StatsResponse { stats }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/dashboard")
            .service(customer_stats)
            .service(vendor_stats)
            .service(ngo_stats),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode, Role};
    use crate::test_support::{TestContext, bearer};
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[case(Role::Vendor, "/api/dashboard/customer/stats", "Access denied. Customer role required.")]
    #[case(Role::Customer, "/api/dashboard/vendor/stats", "Access denied. Vendor role required.")]
    #[case(Role::Vendor, "/api/dashboard/ngo/stats", "Access denied. NGO role required.")]
    #[actix_web::test]
    async fn dashboards_are_role_gated(
        #[case] role: Role,
        #[case] uri: &str,
        #[case] message: &str,
    ) {
        let ctx = TestContext::new();
        let (_, token) = ctx.signed_in(role);
        let app = test::init_service(
            App::new()
                .app_data(ctx.state())
                .configure(crate::inbound::http::configure),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(uri)
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let err: Error = test::read_body_json(res).await;
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.message(), message);
    }

    #[actix_web::test]
    async fn customer_counts_nearby_partners() {
        let ctx = TestContext::new();
        let (_, token) = ctx.signed_in_at(Role::Customer, 18.5204, 73.8567);
        ctx.signed_in_at(Role::Vendor, 18.53, 73.86);
        ctx.signed_in_at(Role::Ngo, 18.60, 73.90);
        ctx.signed_in_at(Role::Ngo, 28.6139, 77.2090);
        let app = test::init_service(
            App::new()
                .app_data(ctx.state())
                .configure(crate::inbound::http::configure),
        )
        .await;

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/dashboard/customer/stats")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(body["stats"]["nearbyVendors"], 1);
        assert_eq!(body["stats"]["nearbyNGOs"], 1);
        assert_eq!(body["stats"]["availableProducts"], 0);
        assert_eq!(body["stats"]["unreadMessages"], 0);
    }
}
