//! Chat credentials and channel set-up through the hosted provider.

use std::sync::Arc;

use tracing::{info, warn};

use super::ports::{ChatProvider, UserRepository};
use super::{
    ChannelRequest, ChannelSummary, ChatCredentials, ChatProfile, Error, User, UserId,
};

const NOT_CONFIGURED: &str = "chat service is not configured";

#[derive(Clone)]
pub struct ChatService {
    users: Arc<dyn UserRepository>,
    provider: Option<Arc<dyn ChatProvider>>,
}

impl ChatService {
    /// Without a provider every operation answers `service_unavailable`.
    pub fn new(users: Arc<dyn UserRepository>, provider: Option<Arc<dyn ChatProvider>>) -> Self {
        Self { users, provider }
    }

    fn provider(&self) -> Result<&Arc<dyn ChatProvider>, Error> {
        self.provider
            .as_ref()
            .ok_or_else(|| Error::service_unavailable(NOT_CONFIGURED))
    }

    pub fn issue_token(&self, user: &User) -> Result<ChatCredentials, Error> {
        let provider = self.provider()?;
        let token = provider.user_token(&user.id).map_err(|error| {
            warn!(user_id = %user.id, %error, "chat token generation failed");
            Error::upstream("Failed to generate chat token")
        })?;
        info!(user_id = %user.id, "chat token issued");
        Ok(ChatCredentials {
            token,
            api_key: provider.api_key(),
            user_id: user.id.to_string(),
        })
    }

    /// Register the members with the provider and create the channel.
    ///
    /// Members that are not known users are still added to the channel but
    /// are not registered; individual registration failures are skipped.
    pub async fn open_channel(
        &self,
        caller: &User,
        request: ChannelRequest,
    ) -> Result<ChannelSummary, Error> {
        let provider = self.provider()?;
        let spec = request.into_spec(&caller.id).map_err(Error::validation)?;

        let ids: Vec<UserId> = spec
            .members
            .iter()
            .filter_map(|member| UserId::new(member).ok())
            .collect();
        for member in self.users.find_by_ids(&ids).await? {
            if let Err(error) = provider.upsert_user(&ChatProfile::from_user(&member)).await {
                warn!(user_id = %member.id, %error, "chat member sync failed");
            }
        }

        provider.create_channel(&spec).await.map_err(|error| {
            warn!(
                channel_type = %spec.channel_type,
                channel_id = %spec.channel_id,
                %error,
                "chat channel creation failed"
            );
            Error::upstream("Failed to create chat channel")
        })?;
        info!(
            channel_type = %spec.channel_type,
            channel_id = %spec.channel_id,
            members = spec.members.len(),
            "chat channel opened"
        );
        Ok(ChannelSummary::from(&spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ChatProviderError, MockChatProvider};
    use crate::domain::{ErrorCode, Role};
    use crate::test_support::{InMemoryStore, RecordingChatProvider, sample_user};
    use rstest::rstest;

    fn request(members: Vec<String>) -> ChannelRequest {
        ChannelRequest {
            channel_type: Some("messaging".into()),
            channel_id: "pickup-1".into(),
            members,
            ..ChannelRequest::default()
        }
    }

    #[rstest]
    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let service = ChatService::new(InMemoryStore::new(), None);
        let user = sample_user(Role::Ngo, 0.0, 0.0);
        let err = service.issue_token(&user).expect_err("no provider");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        let err = service
            .open_channel(&user, request(Vec::new()))
            .await
            .expect_err("no provider");
        assert_eq!(err.message(), NOT_CONFIGURED);
    }

    #[rstest]
    fn token_carries_key_and_user() {
        let provider = RecordingChatProvider::new();
        let service = ChatService::new(InMemoryStore::new(), Some(provider));
        let user = sample_user(Role::Vendor, 0.0, 0.0);
        let credentials = service.issue_token(&user).expect("token");
        assert_eq!(credentials.api_key, "test-api-key");
        assert_eq!(credentials.user_id, user.id.to_string());
        assert_eq!(credentials.token, format!("chat-token-{}", user.id));
    }

    #[rstest]
    #[tokio::test]
    async fn known_members_are_registered() {
        let store = InMemoryStore::new();
        let provider = RecordingChatProvider::new();
        let vendor = sample_user(Role::Vendor, 0.0, 0.0);
        let ngo = sample_user(Role::Ngo, 0.0, 0.0);
        store.seed_user(&vendor, "plain$secret1");
        store.seed_user(&ngo, "plain$secret1");
        let service = ChatService::new(store, Some(provider.clone()));

        let summary = service
            .open_channel(&ngo, request(vec![vendor.id.to_string(), "guest".into()]))
            .await
            .expect("channel");
        assert_eq!(
            summary.members,
            vec![ngo.id.to_string(), vendor.id.to_string(), "guest".to_owned()]
        );
        assert_eq!(provider.upserted().len(), 2);
        let channels = provider.channels();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].created_by, ngo.id);
    }

    #[rstest]
    #[tokio::test]
    async fn member_sync_failures_do_not_block_channel() {
        let store = InMemoryStore::new();
        let ngo = sample_user(Role::Ngo, 0.0, 0.0);
        store.seed_user(&ngo, "plain$secret1");
        let mut provider = MockChatProvider::new();
        provider
            .expect_upsert_user()
            .times(1)
            .returning(|_| Err(ChatProviderError::transport("timeout")));
        provider.expect_create_channel().times(1).returning(|_| Ok(()));
        let service = ChatService::new(store, Some(Arc::new(provider)));

        service
            .open_channel(&ngo, request(Vec::new()))
            .await
            .expect("channel still created");
    }

    #[rstest]
    #[tokio::test]
    async fn channel_failures_surface_as_upstream_errors() {
        let provider = RecordingChatProvider::new();
        provider.fail_requests(true);
        let service = ChatService::new(InMemoryStore::new(), Some(provider));
        let err = service
            .open_channel(&sample_user(Role::Ngo, 0.0, 0.0), request(Vec::new()))
            .await
            .expect_err("provider down");
        assert_eq!(err.code(), ErrorCode::UpstreamError);
        assert_eq!(err.message(), "Failed to create chat channel");

        let err = service
            .open_channel(
                &sample_user(Role::Ngo, 0.0, 0.0),
                ChannelRequest {
                    channel_id: "bad id".into(),
                    ..ChannelRequest::default()
                },
            )
            .await
            .expect_err("invalid id");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
