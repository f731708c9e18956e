//! Account API handlers.
//!
//! ```text
//! POST /api/auth/signup {"name":"Green Grocers","email":"shop@example.org",...}
//! POST /api/auth/login {"email":"shop@example.org","password":"secret1"}
//! GET /api/auth/profile
//! PUT /api/auth/profile {"address":"14 Market Road"}
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use crate::domain::{
    AuthSession, Error, FieldViolation, LoginCredentials, LoginValidationError,
    ProfileUpdateRequest, SignupRequest, User,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::state::HttpState;

/// Signup body for `POST /api/auth/signup`.
///
/// Missing fields deserialise to empty values so validation can report them
/// alongside every other failing field.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SignupBody {
    #[schema(example = "Green Grocers")]
    pub name: String,
    #[schema(example = "shop@example.org")]
    pub email: String,
    #[schema(example = "secret1")]
    pub password: String,
    #[schema(example = json!(["vendor"]))]
    pub roles: Vec<String>,
    #[schema(example = "9876543210")]
    pub phone: String,
    #[schema(example = "12 Market Road, Pune")]
    pub address: String,
    #[schema(example = 18.5204)]
    pub latitude: Option<f64>,
    #[schema(example = 73.8567)]
    pub longitude: Option<f64>,
    pub profile_image: Option<String>,
}

impl From<SignupBody> for SignupRequest {
    fn from(body: SignupBody) -> Self {
        Self {
            name: body.name,
            email: body.email,
            password: Zeroizing::new(body.password),
            roles: body.roles,
            phone: body.phone,
            address: body.address,
            latitude: body.latitude,
            longitude: body.longitude,
            profile_image: body.profile_image,
        }
    }
}

/// Login body for `POST /api/auth/login`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginBody {
    #[schema(example = "shop@example.org")]
    pub email: String,
    #[schema(example = "secret1")]
    pub password: String,
}

impl TryFrom<LoginBody> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(body: LoginBody) -> Result<Self, Self::Error> {
        Self::try_from_parts(&body.email, &body.password)
    }
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    let field = match err {
        LoginValidationError::InvalidEmail => "email",
        LoginValidationError::EmptyPassword => "password",
    };
    Error::validation(vec![FieldViolation::new(field, err.to_string())])
}

/// Partial profile change for `PUT /api/auth/profile`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileBody {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Applied only together with `longitude`.
    pub latitude: Option<f64>,
    /// Applied only together with `latitude`.
    pub longitude: Option<f64>,
    pub profile_image: Option<String>,
}

impl From<ProfileBody> for ProfileUpdateRequest {
    fn from(body: ProfileBody) -> Self {
        Self {
            name: body.name,
            phone: body.phone,
            address: body.address,
            latitude: body.latitude,
            longitude: body.longitude,
            profile_image: body.profile_image,
        }
    }
}

/// Signed-in session returned by signup and login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub user: User,
}

impl AuthResponse {
    fn new(message: &str, session: AuthSession) -> Self {
        Self {
            message: message.to_owned(),
            token: session.token,
            user: session.user,
        }
    }
}

/// Account wrapper used by the profile endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: User,
}

/// Register an account and sign it in.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupBody,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed or email taken", body = Error),
        (status = 503, description = "Database unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "signup",
    security([])
)]
#[post("/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    payload: web::Json<SignupBody>,
) -> ApiResult<HttpResponse> {
    let session = state
        .accounts
        .signup(SignupRequest::from(payload.into_inner()))
        .await?;
    Ok(HttpResponse::Created().json(AuthResponse::new("User registered successfully", session)))
}

/// Exchange email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Login success", body = AuthResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials or deactivated account", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginBody>,
) -> ApiResult<web::Json<AuthResponse>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let session = state.accounts.login(credentials).await?;
    Ok(web::Json(AuthResponse::new("Login successful", session)))
}

/// Current account.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Signed-in account", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = Error)
    ),
    tags = ["auth"],
    operation_id = "getProfile"
)]
#[get("/profile")]
pub async fn get_profile(
    state: web::Data<HttpState>,
    user: Authenticated,
) -> ApiResult<web::Json<UserResponse>> {
    let user = state.accounts.profile(&user).await?;
    Ok(web::Json(UserResponse {
        message: None,
        user,
    }))
}

/// Change name, contact details, location or avatar.
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = ProfileBody,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation failed", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error)
    ),
    tags = ["auth"],
    operation_id = "updateProfile"
)]
#[put("/profile")]
pub async fn update_profile(
    state: web::Data<HttpState>,
    user: Authenticated,
    payload: web::Json<ProfileBody>,
) -> ApiResult<web::Json<UserResponse>> {
    let user = state
        .accounts
        .update_profile(&user, ProfileUpdateRequest::from(payload.into_inner()))
        .await?;
    Ok(web::Json(UserResponse {
        message: Some("Profile updated successfully".to_owned()),
        user,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .service(signup)
            .service(login)
            .service(get_profile)
            .service(update_profile),
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
    use serde_json::{Value, json};

    fn signup_json() -> Value {
        json!({
            "name": "Green Grocers",
            "email": "Shop@Example.org",
            "password": "secret1",
            "roles": ["vendor"],
            "phone": "9876543210",
            "address": "12 Market Road, Pune",
            "latitude": 18.5204,
            "longitude": 73.8567
        })
    }

    macro_rules! init_app {
        ($ctx:expr) => {
            test::init_service(
                App::new()
                    .app_data($ctx.state())
                    .configure(crate::inbound::http::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn signup_then_login_returns_tokens() {
        let ctx = TestContext::new();
        let app = init_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/signup")
                .set_json(signup_json())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: AuthResponse = test::read_body_json(res).await;
        assert_eq!(created.message, "User registered successfully");
        assert_eq!(created.user.email.as_ref(), "shop@example.org");
        assert_eq!(ctx.chat.upserted().len(), 1);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({"email": "shop@example.org", "password": "secret1"}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let session: AuthResponse = test::read_body_json(res).await;
        assert_eq!(session.user.id, created.user.id);
        assert!(session.user.last_login.is_some());
    }

    #[actix_web::test]
    async fn signup_reports_field_violations() {
        let ctx = TestContext::new();
        let app = init_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/signup")
                .set_json(json!({"name": "A", "email": "nope"}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "Validation failed");
        let fields: Vec<&str> = body["details"]["errors"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|v| v["field"].as_str())
            .collect();
        assert!(fields.contains(&"name"), "{body}");
        assert!(fields.contains(&"email"), "{body}");
        assert!(fields.contains(&"password"), "{body}");
    }

    #[actix_web::test]
    async fn signup_succeeds_when_chat_sync_fails() {
        let ctx = TestContext::new();
        ctx.chat.fail_requests(true);
        let app = init_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/signup")
                .set_json(signup_json())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[rstest]
    #[case(json!({"email": "bad", "password": "secret1"}), "email")]
    #[case(json!({"email": "shop@example.org", "password": ""}), "password")]
    #[actix_web::test]
    async fn login_validates_payload(#[case] body: Value, #[case] field: &str) {
        let ctx = TestContext::new();
        let app = init_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(body)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["errors"][0]["field"], field);
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorised() {
        let ctx = TestContext::new();
        let (user, _) = ctx.signed_in(Role::Ngo);
        let app = init_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({"email": user.email.as_ref(), "password": "wrong-password"}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let err: Error = test::read_body_json(res).await;
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), "Invalid credentials");
    }

    #[actix_web::test]
    async fn profile_round_trips_updates() {
        let ctx = TestContext::new();
        let (user, token) = ctx.signed_in(Role::Customer);
        let app = init_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/api/auth/profile")
                .insert_header(bearer(&token))
                .set_json(json!({"address": "14 Lake View", "latitude": 13.0}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let updated: UserResponse = test::read_body_json(res).await;
        assert_eq!(updated.message.as_deref(), Some("Profile updated successfully"));
        assert_eq!(updated.user.address.as_ref(), "14 Lake View");
        assert_eq!(updated.user.location, user.location);

        let fetched: UserResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/auth/profile")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(fetched.user.address.as_ref(), "14 Lake View");
        assert!(fetched.message.is_none());
    }

    #[actix_web::test]
    async fn malformed_json_uses_error_envelope() {
        let ctx = TestContext::new();
        let app = init_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .insert_header(("content-type", "application/json"))
                .set_payload("{not json")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: Error = test::read_body_json(res).await;
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
