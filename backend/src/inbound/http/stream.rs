//! Chat provider handlers: client tokens and channel set-up.
//!
//! Both endpoints answer `503` when the provider is not configured.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::domain::{ChannelRequest, ChannelSummary, ChatCredentials, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::state::HttpState;

/// Channel body for `POST /api/stream/channel`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelBody {
    /// Defaults to `messaging`.
    #[schema(example = "messaging")]
    pub channel_type: Option<String>,
    #[schema(example = "donation-3fa85f64")]
    pub channel_id: String,
    /// User ids to add next to the caller.
    pub members: Vec<String>,
    /// Extra channel fields such as `name`; cannot replace members or creator.
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
}

impl From<ChannelBody> for ChannelRequest {
    fn from(body: ChannelBody) -> Self {
        Self {
            channel_type: body.channel_type,
            channel_id: body.channel_id,
            members: body.members,
            metadata: body.metadata,
        }
    }
}

/// Credentials for the chat client SDK.
#[utoipa::path(
    post,
    path = "/api/stream/token",
    responses(
        (status = 200, description = "Chat credentials", body = ChatCredentials),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 500, description = "Token generation failed", body = Error),
        (status = 503, description = "Chat is not configured", body = Error)
    ),
    tags = ["stream"],
    operation_id = "issueChatToken"
)]
#[post("/token")]
pub async fn issue_token(
    state: web::Data<HttpState>,
    user: Authenticated,
) -> ApiResult<web::Json<ChatCredentials>> {
    Ok(web::Json(state.chat.issue_token(&user)?))
}

/// Create or join a channel, registering known members with the provider.
#[utoipa::path(
    post,
    path = "/api/stream/channel",
    request_body = ChannelBody,
    responses(
        (status = 200, description = "Channel ready", body = ChannelSummary),
        (status = 400, description = "Invalid channel type or id", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 500, description = "Provider rejected the channel", body = Error),
        (status = 503, description = "Chat is not configured", body = Error)
    ),
    tags = ["stream"],
    operation_id = "openChatChannel"
)]
#[post("/channel")]
pub async fn open_channel(
    state: web::Data<HttpState>,
    user: Authenticated,
    payload: web::Json<ChannelBody>,
) -> ApiResult<web::Json<ChannelSummary>> {
    let summary = state
        .chat
        .open_channel(&user, ChannelRequest::from(payload.into_inner()))
        .await?;
    Ok(web::Json(summary))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/stream")
            .service(issue_token)
            .service(open_channel),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode, Role};
    use crate::test_support::{TestContext, bearer};
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::json;

    #[actix_web::test]
    async fn token_carries_api_key_and_user() {
        let ctx = TestContext::new();
        let (user, token) = ctx.signed_in(Role::Ngo);
        let app = test::init_service(
            App::new()
                .app_data(ctx.state())
                .configure(crate::inbound::http::configure),
        )
        .await;

        let creds: ChatCredentials = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/stream/token")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(creds.api_key, "test-api-key");
        assert_eq!(creds.user_id, user.id.to_string());
        assert_eq!(creds.token, format!("chat-token-{}", user.id));
    }

    #[actix_web::test]
    async fn channel_puts_caller_first_and_registers_known_members() {
        let ctx = TestContext::new();
        let (caller, token) = ctx.signed_in(Role::Ngo);
        let (vendor, _) = ctx.signed_in(Role::Vendor);
        let app = test::init_service(
            App::new()
                .app_data(ctx.state())
                .configure(crate::inbound::http::configure),
        )
        .await;

        let summary: ChannelSummary = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/stream/channel")
                .insert_header(bearer(&token))
                .set_json(json!({
                    "channelId": "donation-1",
                    "members": [vendor.id.to_string(), caller.id.to_string(), "guest"],
                    "metadata": {"name": "Rice pickup"}
                }))
                .to_request(),
        )
        .await;
        assert_eq!(summary.channel_type, "messaging");
        assert_eq!(
            summary.members,
            vec![caller.id.to_string(), vendor.id.to_string(), "guest".to_owned()]
        );
        assert_eq!(ctx.chat.upserted().len(), 2);
        assert_eq!(ctx.chat.channels().len(), 1);
    }

    #[actix_web::test]
    async fn provider_failure_is_an_upstream_error() {
        let ctx = TestContext::new();
        let (_, token) = ctx.signed_in(Role::Customer);
        ctx.chat.fail_requests(true);
        let app = test::init_service(
            App::new()
                .app_data(ctx.state())
                .configure(crate::inbound::http::configure),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/stream/channel")
                .insert_header(bearer(&token))
                .set_json(json!({"channelId": "c1"}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: Error = test::read_body_json(res).await;
        assert_eq!(err.code(), ErrorCode::UpstreamError);
        assert_eq!(err.message(), "Failed to create chat channel");
    }

    #[actix_web::test]
    async fn unconfigured_provider_is_unavailable() {
        let ctx = TestContext::new();
        let (_, token) = ctx.signed_in(Role::Customer);
        let app = test::init_service(
            App::new()
                .app_data(ctx.state_without_chat())
                .configure(crate::inbound::http::configure),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/stream/token")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn invalid_channel_ids_are_rejected() {
        let ctx = TestContext::new();
        let (_, token) = ctx.signed_in(Role::Customer);
        let app = test::init_service(
            App::new()
                .app_data(ctx.state())
                .configure(crate::inbound::http::configure),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/stream/channel")
                .insert_header(bearer(&token))
                .set_json(json!({"channelId": "has spaces"}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
