//! Reqwest-backed Stream Chat adapter.
//!
//! This adapter owns transport details only: token signing, request
//! serialisation, timeout and HTTP error mapping.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{ChannelQueryRequest, ServerClaims, UpsertUsersRequest, UserClaims};
use crate::domain::ports::{ChatProvider, ChatProviderError};
use crate::domain::{ChannelSpec, ChatProfile, UserId};

/// Public REST endpoint used when none is configured.
pub const DEFAULT_STREAM_BASE_URL: &str = "https://chat.stream-io-api.com";

/// Stream application credentials.
pub struct StreamCredentials {
    pub api_key: String,
    pub api_secret: Zeroizing<String>,
}

/// Chat provider adapter that talks to one Stream application.
pub struct StreamHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
    signing_key: EncodingKey,
}

impl StreamHttpClient {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let chat = StreamHttpClient::new(credentials, DEFAULT_STREAM_BASE_URL, timeout)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        credentials: StreamCredentials,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: credentials.api_key,
            signing_key: EncodingKey::from_secret(credentials.api_secret.as_bytes()),
        })
    }

    fn sign<C: Serialize>(&self, claims: &C) -> Result<String, ChatProviderError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.signing_key)
            .map_err(|err| ChatProviderError::token(err.to_string()))
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ChatProviderError> {
        let server_token = self.sign(&ServerClaims { server: true })?;
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "calling chat provider");
        let response = self
            .client
            .post(url)
            .query(&[("api_key", self.api_key.as_str())])
            .header(reqwest::header::AUTHORIZATION, server_token)
            .header("stream-auth-type", "jwt")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

#[async_trait]
impl ChatProvider for StreamHttpClient {
    fn api_key(&self) -> String {
        self.api_key.clone()
    }

    fn user_token(&self, user: &UserId) -> Result<String, ChatProviderError> {
        let user_id = user.to_string();
        self.sign(&UserClaims { user_id: &user_id })
    }

    async fn upsert_user(&self, profile: &ChatProfile) -> Result<(), ChatProviderError> {
        self.post("users", &UpsertUsersRequest::single(profile)).await
    }

    async fn create_channel(&self, channel: &ChannelSpec) -> Result<(), ChatProviderError> {
        let path = format!(
            "channels/{}/{}/query",
            channel.channel_type, channel.channel_id
        );
        self.post(&path, &ChannelQueryRequest::from(channel)).await
    }
}

fn map_transport_error(error: reqwest::Error) -> ChatProviderError {
    ChatProviderError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ChatProviderError {
    ChatProviderError::rejected(status.as_u16(), body_preview(body))
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    const SECRET: &str = "stream-secret";

    #[fixture]
    fn client() -> StreamHttpClient {
        StreamHttpClient::new(
            StreamCredentials {
                api_key: "key".into(),
                api_secret: Zeroizing::new(SECRET.into()),
            },
            "https://chat.example.test/",
            Duration::from_secs(1),
        )
        .expect("client builds")
    }

    fn claims(token: &str) -> Value {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        decode::<Value>(token, &DecodingKey::from_secret(SECRET.as_bytes()), &validation)
            .expect("token decodes")
            .claims
    }

    #[rstest]
    fn user_tokens_carry_the_user_id(client: StreamHttpClient) {
        let user = UserId::random();
        let token = client.user_token(&user).expect("token");
        assert_eq!(claims(&token), json!({"user_id": user.to_string()}));
        let server = client.sign(&ServerClaims { server: true }).expect("token");
        assert_eq!(claims(&server), json!({"server": true}));
        assert_eq!(client.base_url, "https://chat.example.test");
    }

    #[rstest]
    fn channel_payload_protects_members_and_creator() {
        let creator = UserId::random();
        let mut metadata = serde_json::Map::new();
        metadata.insert("name".into(), json!("Bread pickup"));
        metadata.insert("members".into(), json!(["intruder"]));
        let spec = ChannelSpec {
            channel_type: "messaging".into(),
            channel_id: "pickup-1".into(),
            members: vec![creator.to_string()],
            created_by: creator.clone(),
            metadata,
        };
        let body = serde_json::to_value(ChannelQueryRequest::from(&spec)).expect("serialise");
        assert_eq!(body["data"]["members"], json!([creator.to_string()]));
        assert_eq!(body["data"]["created_by_id"], json!(creator.to_string()));
        assert_eq!(body["data"]["name"], "Bread pickup");
    }

    #[rstest]
    fn users_are_keyed_by_id() {
        let profile = ChatProfile {
            id: "u1".into(),
            name: "Asha".into(),
            email: "asha@example.org".into(),
            image: "https://img".into(),
            vendor_id: None,
            is_vendor: None,
            ngo_id: None,
            is_ngo: None,
            customer_id: Some("u1".into()),
            is_customer: Some(true),
            user_type: None,
        };
        let body = serde_json::to_value(UpsertUsersRequest::single(&profile)).expect("serialise");
        assert_eq!(body["users"]["u1"]["isCustomer"], true);
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, 401)]
    #[case(StatusCode::TOO_MANY_REQUESTS, 429)]
    #[case(StatusCode::BAD_GATEWAY, 502)]
    fn statuses_become_rejections(#[case] status: StatusCode, #[case] code: u16) {
        let error = map_status_error(status, b"{\"message\": \"api key invalid\"}");
        assert_eq!(
            error,
            ChatProviderError::rejected(code, "{\"message\": \"api key invalid\"}")
        );
    }
}
