//! Bearer-token authentication for HTTP handlers.
//!
//! Handlers take an [`Authenticated`] argument instead of reading headers, so
//! token parsing and account lookup stay out of the request/response mapping.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, User};

use super::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";

/// Active account resolved from the `Authorization: Bearer <token>` header.
///
/// Extraction fails with `401` when the header is missing, the token is
/// invalid or expired, or the account is gone or deactivated.
#[derive(Debug, Clone)]
pub struct Authenticated(pub User);

impl std::ops::Deref for Authenticated {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Token carried by the request, if any.
///
/// A header without the `Bearer` scheme counts as no token.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    value
        .get(..BEARER_PREFIX.len())
        .filter(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX))
        .and_then(|_| value.get(BEARER_PREFIX.len()..))
        .map(str::to_owned)
}

impl FromRequest for Authenticated {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move {
            let state = state
                .ok_or_else(|| Error::internal("HTTP state is not configured for this app"))?;
            let user = state
                .accounts
                .authenticate_token(token.as_deref())
                .await?;
            Ok(Self(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode, Role};
    use crate::test_support::{TestContext, bearer};
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test as actix_test};
    use rstest::rstest;

    async fn whoami(user: Authenticated) -> HttpResponse {
        HttpResponse::Ok().body(user.id.to_string())
    }

    #[rstest]
    #[case(Some("Bearer abc"), Some("abc"))]
    #[case(Some("bearer abc"), Some("abc"))]
    #[case(Some("Basic abc"), None)]
    #[case(Some("Bearer"), None)]
    #[case(None, None)]
    fn bearer_scheme_is_required(#[case] header: Option<&str>, #[case] expected: Option<&str>) {
        let mut request = actix_test::TestRequest::default();
        if let Some(value) = header {
            request = request.insert_header((AUTHORIZATION, value));
        }
        assert_eq!(bearer_token(&request.to_http_request()).as_deref(), expected);
    }

    #[actix_web::test]
    async fn valid_tokens_resolve_the_account() {
        let ctx = TestContext::new();
        let (user, token) = ctx.signed_in(Role::Customer);
        let app = actix_test::init_service(
            App::new()
                .app_data(ctx.state())
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let body = actix_test::call_and_read_body(
            &app,
            actix_test::TestRequest::get()
                .uri("/me")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(body, user.id.to_string());
    }

    #[actix_web::test]
    async fn missing_and_foreign_tokens_are_rejected() {
        let ctx = TestContext::new();
        let (user, token) = ctx.signed_in(Role::Vendor);
        let app = actix_test::init_service(
            App::new()
                .app_data(ctx.state())
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let err: Error = actix_test::read_body_json(res).await;
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), "Access token required");

        ctx.store.set_user_active(&user.id, false);
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/me")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
