//! Product listing handlers.
//!
//! Browsing is public; writes require a vendor token and only the owning
//! vendor may change or remove a listing.

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Error, GeoPoint, Page, Product, ProductId, ProductInput, ProductPage, ProductQuery, Proximity,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::error::invalid_identifier;
use crate::inbound::http::state::HttpState;

/// Query string for `GET /api/products`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    /// Exact category match.
    pub category: Option<String>,
    /// Search centre; requires `longitude`.
    pub latitude: Option<f64>,
    /// Search centre; requires `latitude`.
    pub longitude: Option<f64>,
    /// Search radius, 50 km when omitted.
    pub radius_km: Option<f64>,
    /// One-based page number.
    pub page: Option<u32>,
    /// Page size, at most 100.
    pub limit: Option<u32>,
}

impl TryFrom<ProductListQuery> for ProductQuery {
    type Error = Error;

    fn try_from(query: ProductListQuery) -> Result<Self, Self::Error> {
        let near = match (query.latitude, query.longitude) {
            (None, None) => None,
            (Some(latitude), Some(longitude)) => {
                let centre = GeoPoint::new(latitude, longitude)
                    .map_err(|err| Error::invalid_request(err.to_string()))?;
                Some(Proximity::with_radius_km(centre, query.radius_km))
            }
            _ => {
                return Err(Error::invalid_request(
                    "latitude and longitude must be supplied together",
                ));
            }
        };
        Ok(Self {
            category: query.category,
            near,
            page: Page::clamped(query.page, query.limit),
        })
    }
}

/// Listing fields sent by a vendor. Updates may omit any field.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductBody {
    #[schema(example = "Surplus bread")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(example = "bakery")]
    pub category: Option<String>,
    #[schema(example = 12)]
    pub quantity: Option<i64>,
    #[schema(example = "loaves")]
    pub unit: Option<String>,
    pub price: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub image_urls: Option<Vec<String>>,
    /// Pickup point; the vendor's location is used when omitted.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<ProductBody> for ProductInput {
    fn from(body: ProductBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            category: body.category,
            quantity: body.quantity,
            unit: body.unit,
            price: body.price,
            expires_at: body.expires_at,
            image_urls: body.image_urls,
            latitude: body.latitude,
            longitude: body.longitude,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub product: Product,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn product_id(raw: &str) -> Result<ProductId, Error> {
    ProductId::new(raw).map_err(invalid_identifier)
}

/// Browse active listings, newest first.
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "One page of listings", body = ProductPage),
        (status = 400, description = "Invalid query", body = Error)
    ),
    tags = ["products"],
    operation_id = "listProducts",
    security([])
)]
#[get("")]
pub async fn list_products(
    state: web::Data<HttpState>,
    query: web::Query<ProductListQuery>,
) -> ApiResult<web::Json<ProductPage>> {
    let query = ProductQuery::try_from(query.into_inner())?;
    Ok(web::Json(state.products.list(query).await?))
}

/// The caller's own active listings.
#[utoipa::path(
    get,
    path = "/api/products/mine",
    responses(
        (status = 200, description = "Own listings", body = ProductsResponse),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "Vendor role required", body = Error)
    ),
    tags = ["products"],
    operation_id = "listOwnProducts"
)]
#[get("/mine")]
pub async fn list_own_products(
    state: web::Data<HttpState>,
    user: Authenticated,
) -> ApiResult<web::Json<ProductsResponse>> {
    let products = state.products.list_for_vendor(&user).await?;
    Ok(web::Json(ProductsResponse { products }))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Listing", body = ProductResponse),
        (status = 400, description = "Malformed id", body = Error),
        (status = 404, description = "Unknown or removed listing", body = Error)
    ),
    tags = ["products"],
    operation_id = "getProduct",
    security([])
)]
#[get("/{id}")]
pub async fn get_product(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ProductResponse>> {
    let id = product_id(&path)?;
    let product = state.products.get(&id).await?;
    Ok(web::Json(ProductResponse {
        message: None,
        product,
    }))
}

/// List a product. Vendors only.
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = ProductBody,
    responses(
        (status = 201, description = "Listing created", body = ProductResponse),
        (status = 400, description = "Validation failed", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "Vendor role required", body = Error)
    ),
    tags = ["products"],
    operation_id = "createProduct"
)]
#[post("")]
pub async fn create_product(
    state: web::Data<HttpState>,
    user: Authenticated,
    payload: web::Json<ProductBody>,
) -> ApiResult<HttpResponse> {
    let product = state
        .products
        .create(&user, ProductInput::from(payload.into_inner()))
        .await?;
    Ok(HttpResponse::Created().json(ProductResponse {
        message: Some("Product created successfully".to_owned()),
        product,
    }))
}

/// Change the supplied fields of an owned listing.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    request_body = ProductBody,
    responses(
        (status = 200, description = "Listing updated", body = ProductResponse),
        (status = 400, description = "Validation failed", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown listing", body = Error)
    ),
    tags = ["products"],
    operation_id = "updateProduct"
)]
#[put("/{id}")]
pub async fn update_product(
    state: web::Data<HttpState>,
    user: Authenticated,
    path: web::Path<String>,
    payload: web::Json<ProductBody>,
) -> ApiResult<web::Json<ProductResponse>> {
    let id = product_id(&path)?;
    let product = state
        .products
        .update(&user, &id, ProductInput::from(payload.into_inner()))
        .await?;
    Ok(web::Json(ProductResponse {
        message: Some("Product updated successfully".to_owned()),
        product,
    }))
}

/// Withdraw an owned listing. The record is kept but hidden.
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Listing removed", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown listing", body = Error)
    ),
    tags = ["products"],
    operation_id = "deleteProduct"
)]
#[delete("/{id}")]
pub async fn delete_product(
    state: web::Data<HttpState>,
    user: Authenticated,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = product_id(&path)?;
    state.products.deactivate(&user, &id).await?;
    Ok(web::Json(MessageResponse {
        message: "Product removed successfully".to_owned(),
    }))
}

/// `/mine` is registered before `/{id}` so it is not taken for an id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/products")
            .service(list_products)
            .service(create_product)
            .service(list_own_products)
            .service(get_product)
            .service(update_product)
            .service(delete_product),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode, Role};
    use crate::test_support::{TestContext, bearer};
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::{Value, json};

    macro_rules! init_app {
        ($ctx:expr) => {
            actix_test::init_service(
                App::new()
                    .app_data($ctx.state())
                    .configure(crate::inbound::http::configure),
            )
            .await
        };
    }

    fn bread() -> Value {
        json!({"name": "Surplus bread", "category": "bakery", "quantity": 12, "unit": "loaves"})
    }

    #[rstest]
    #[case(Some(1.0), None)]
    #[case(None, Some(1.0))]
    fn lone_coordinates_are_rejected(#[case] latitude: Option<f64>, #[case] longitude: Option<f64>) {
        let query = ProductListQuery {
            latitude,
            longitude,
            ..ProductListQuery::default()
        };
        let err = ProductQuery::try_from(query).expect_err("lone coordinate");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn query_clamps_paging_and_builds_proximity() {
        let query = ProductListQuery {
            latitude: Some(18.5),
            longitude: Some(73.8),
            radius_km: Some(5.0),
            limit: Some(1000),
            ..ProductListQuery::default()
        };
        let parsed = ProductQuery::try_from(query).expect("valid query");
        assert_eq!(parsed.page.size, 100);
        let near = parsed.near.expect("proximity");
        assert!((near.radius_metres - 5000.0).abs() < f64::EPSILON);
    }

    #[actix_web::test]
    async fn vendor_lifecycle_over_http() {
        let ctx = TestContext::new();
        let (_, token) = ctx.signed_in(Role::Vendor);
        let app = init_app!(ctx);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/products")
                .insert_header(bearer(&token))
                .set_json(bread())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: ProductResponse = actix_test::read_body_json(res).await;
        let uri = format!("/api/products/{}", created.product.id);

        let updated: ProductResponse = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::put()
                .uri(&uri)
                .insert_header(bearer(&token))
                .set_json(json!({"quantity": 4}))
                .to_request(),
        )
        .await;
        assert_eq!(updated.product.quantity, 4);

        let mine: ProductsResponse = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/products/mine")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(mine.products.len(), 1);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&uri)
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn customers_cannot_list_products() {
        let ctx = TestContext::new();
        let (_, token) = ctx.signed_in(Role::Customer);
        let app = init_app!(ctx);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/products")
                .insert_header(bearer(&token))
                .set_json(bread())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn other_vendors_cannot_edit() {
        let ctx = TestContext::new();
        let (_, owner) = ctx.signed_in(Role::Vendor);
        let (_, rival) = ctx.signed_in(Role::Vendor);
        let app = init_app!(ctx);

        let created: ProductResponse = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/products")
                .insert_header(bearer(&owner))
                .set_json(bread())
                .to_request(),
        )
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/products/{}", created.product.id))
                .insert_header(bearer(&rival))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn public_listing_filters_by_distance() {
        let ctx = TestContext::new();
        let (_, pune) = ctx.signed_in_at(Role::Vendor, 18.5204, 73.8567);
        let (_, delhi) = ctx.signed_in_at(Role::Vendor, 28.6139, 77.2090);
        let app = init_app!(ctx);
        for token in [&pune, &delhi] {
            let res = actix_test::call_service(
                &app,
                actix_test::TestRequest::post()
                    .uri("/api/products")
                    .insert_header(bearer(token))
                    .set_json(bread())
                    .to_request(),
            )
            .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let all: ProductPage = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/products?category=bakery")
                .to_request(),
        )
        .await;
        assert_eq!(all.products.len(), 2);

        let near: ProductPage = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/products?latitude=18.52&longitude=73.85&radiusKm=10&limit=5")
                .to_request(),
        )
        .await;
        assert_eq!(near.products.len(), 1);
        assert_eq!(near.limit, 5);
    }

    #[actix_web::test]
    async fn malformed_ids_are_bad_requests() {
        let ctx = TestContext::new();
        let app = init_app!(ctx);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/products/abc").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: Error = actix_test::read_body_json(res).await;
        assert_eq!(err.message(), "Invalid product id");
    }
}
