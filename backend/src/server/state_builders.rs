//! Builders for the HTTP state from configured adapters.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use tracing::{info, warn};

use prakriti_backend::domain::ports::ChatProvider;
use prakriti_backend::inbound::http::state::{HttpState, HttpStatePorts};
use prakriti_backend::outbound::chat::{StreamCredentials, StreamHttpClient};
use prakriti_backend::outbound::persistence::{
    DieselDonationRepository, DieselProductRepository, DieselUserRepository,
};
use prakriti_backend::outbound::security::{Argon2PasswordHasher, JwtAccessTokens};
use prakriti_backend::settings::StreamSettings;

use super::ServerConfig;

/// Build the Stream adapter when credentials are configured.
///
/// # Errors
/// Returns [`std::io::Error`] when the HTTP client cannot be constructed.
fn build_chat_provider(
    settings: Option<&StreamSettings>,
) -> std::io::Result<Option<Arc<dyn ChatProvider>>> {
    let Some(settings) = settings else {
        warn!("stream credentials not configured; chat endpoints will answer 503");
        return Ok(None);
    };
    let client = StreamHttpClient::new(
        StreamCredentials {
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
        },
        &settings.base_url,
        settings.timeout,
    )
    .map_err(|err| std::io::Error::other(format!("stream client construction failed: {err}")))?;
    info!(base_url = %settings.base_url, "stream chat provider configured");
    Ok(Some(Arc::new(client)))
}

/// Build the shared HTTP state from the database pool and configured secrets.
pub(super) fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let pool = &config.db_pool;
    Ok(web::Data::new(HttpState::new(HttpStatePorts {
        users: Arc::new(DieselUserRepository::new(pool.clone())),
        products: Arc::new(DieselProductRepository::new(pool.clone())),
        donations: Arc::new(DieselDonationRepository::new(pool.clone())),
        hasher: Arc::new(Argon2PasswordHasher),
        tokens: Arc::new(JwtAccessTokens::new(&config.token_secret, config.token_ttl)),
        chat: build_chat_provider(config.chat.as_ref())?,
        clock: Arc::new(DefaultClock),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prakriti_backend::outbound::chat::DEFAULT_STREAM_BASE_URL;
    use rstest::rstest;
    use std::time::Duration;
    use zeroize::Zeroizing;

    #[rstest]
    fn chat_provider_is_optional() {
        let provider = build_chat_provider(None).expect("no provider is fine");
        assert!(provider.is_none());
    }

    #[rstest]
    fn configured_credentials_build_a_provider() {
        let settings = StreamSettings {
            api_key: "key".into(),
            api_secret: Zeroizing::new("secret".into()),
            base_url: DEFAULT_STREAM_BASE_URL.into(),
            timeout: Duration::from_secs(5),
        };
        let provider = build_chat_provider(Some(&settings))
            .expect("client builds")
            .expect("provider configured");
        assert_eq!(provider.api_key(), "key");
    }
}
