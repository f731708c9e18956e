//! Runtime configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `PRAKRITI_*` environment variables and an
//! optional configuration file, in that order of precedence. Accessors apply
//! defaults and validate the combinations the server cannot start without.

use std::fmt;
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use rand::RngCore;
use serde::Deserialize;
use tracing::warn;
use zeroize::Zeroizing;

use crate::outbound::chat::DEFAULT_STREAM_BASE_URL;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_JWT_TTL_HOURS: i64 = 168;
const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const JWT_SECRET_MIN_LEN: usize = 32;
const EPHEMERAL_SECRET_LEN: usize = 64;

/// Build mode used to decide which settings may fall back to defaults.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate an ephemeral signing secret.
    Debug,
    /// Release builds require every secret to be configured.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prakriti_backend::settings::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// assert_eq!(mode == BuildMode::Debug, cfg!(debug_assertions));
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Errors raised while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A required value is absent.
    #[error("missing required setting: {name}")]
    Missing { name: &'static str },
    /// A value is present but unusable.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PRAKRITI")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Shared secret used to sign API access tokens.
    pub jwt_secret: Option<String>,
    /// Lifetime of issued access tokens, in hours.
    pub jwt_ttl_hours: Option<i64>,
    /// Stream Chat application key.
    pub stream_api_key: Option<String>,
    /// Stream Chat application secret.
    pub stream_api_secret: Option<String>,
    /// Stream Chat REST endpoint.
    pub stream_base_url: Option<String>,
    /// Timeout for Stream Chat requests, in seconds.
    pub stream_timeout_secs: Option<u64>,
    /// Maximum number of pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Origin allowed to call the API from a browser; any origin when unset.
    pub cors_allowed_origin: Option<String>,
}

/// Resolved chat provider settings.
pub struct StreamSettings {
    pub api_key: String,
    pub api_secret: Zeroizing<String>,
    pub base_url: String,
    pub timeout: Duration,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl AppSettings {
    pub fn bind_addr(&self) -> &str {
        non_empty(self.bind_addr.as_ref()).unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when no database URL is configured.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        non_empty(self.database_url.as_ref()).ok_or(SettingsError::Missing {
            name: "database_url",
        })
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .filter(|max| *max > 0)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }

    pub fn jwt_ttl(&self) -> TimeDelta {
        let hours = self
            .jwt_ttl_hours
            .filter(|hours| *hours > 0)
            .unwrap_or(DEFAULT_JWT_TTL_HOURS);
        TimeDelta::try_hours(hours).unwrap_or(TimeDelta::hours(DEFAULT_JWT_TTL_HOURS))
    }

    /// Signing secret for access tokens.
    ///
    /// Debug builds without a configured secret get a random one, which
    /// invalidates every token on restart.
    ///
    /// # Errors
    ///
    /// Release builds fail when the secret is missing, and every build fails
    /// when a configured secret is shorter than 32 bytes.
    pub fn jwt_secret(&self, mode: BuildMode) -> Result<Zeroizing<Vec<u8>>, SettingsError> {
        match non_empty(self.jwt_secret.as_ref()) {
            Some(secret) if secret.len() < JWT_SECRET_MIN_LEN => Err(SettingsError::Invalid {
                name: "jwt_secret",
                reason: format!("must be at least {JWT_SECRET_MIN_LEN} bytes"),
            }),
            Some(secret) => Ok(Zeroizing::new(secret.as_bytes().to_vec())),
            None if mode == BuildMode::Debug => {
                warn!("jwt_secret not configured; using an ephemeral secret (dev only)");
                let mut secret = Zeroizing::new(vec![0_u8; EPHEMERAL_SECRET_LEN]);
                rand::thread_rng().fill_bytes(secret.as_mut_slice());
                Ok(secret)
            }
            None => Err(SettingsError::Missing { name: "jwt_secret" }),
        }
    }

    /// Chat provider settings, or `None` when chat is not configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when only one of the key and the
    /// secret is set.
    pub fn stream(&self) -> Result<Option<StreamSettings>, SettingsError> {
        let key = non_empty(self.stream_api_key.as_ref());
        let secret = non_empty(self.stream_api_secret.as_ref());
        match (key, secret) {
            (None, None) => Ok(None),
            (Some(api_key), Some(api_secret)) => Ok(Some(StreamSettings {
                api_key: api_key.to_owned(),
                api_secret: Zeroizing::new(api_secret.to_owned()),
                base_url: non_empty(self.stream_base_url.as_ref())
                    .unwrap_or(DEFAULT_STREAM_BASE_URL)
                    .to_owned(),
                timeout: Duration::from_secs(
                    self.stream_timeout_secs
                        .filter(|secs| *secs > 0)
                        .unwrap_or(DEFAULT_STREAM_TIMEOUT_SECS),
                ),
            })),
            _ => Err(SettingsError::Invalid {
                name: "stream_api_key",
                reason: "stream_api_key and stream_api_secret must be set together".to_owned(),
            }),
        }
    }

    pub fn cors_allowed_origin(&self) -> Option<&str> {
        non_empty(self.cors_allowed_origin.as_ref())
    }
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "***");
        f.debug_struct("AppSettings")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &redact(&self.database_url))
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("jwt_ttl_hours", &self.jwt_ttl_hours)
            .field("stream_api_key", &self.stream_api_key)
            .field("stream_api_secret", &redact(&self.stream_api_secret))
            .field("stream_base_url", &self.stream_base_url)
            .field("stream_timeout_secs", &self.stream_timeout_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    //! Settings parsing and validation.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 10] = [
        "PRAKRITI_BIND_ADDR",
        "PRAKRITI_DATABASE_URL",
        "PRAKRITI_JWT_SECRET",
        "PRAKRITI_JWT_TTL_HOURS",
        "PRAKRITI_STREAM_API_KEY",
        "PRAKRITI_STREAM_API_SECRET",
        "PRAKRITI_STREAM_BASE_URL",
        "PRAKRITI_STREAM_TIMEOUT_SECS",
        "PRAKRITI_DB_MAX_CONNECTIONS",
        "PRAKRITI_CORS_ALLOWED_ORIGIN",
    ];

    fn env_with(overrides: &[(&'static str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    fn load() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("prakriti-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(env_with(&[]));

        let settings = load();
        assert_eq!(settings.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(
            settings.database_url(),
            Err(SettingsError::Missing {
                name: "database_url"
            })
        );
        assert_eq!(settings.jwt_ttl(), TimeDelta::hours(168));
        assert_eq!(settings.db_max_connections(), 10);
        assert!(settings.cors_allowed_origin().is_none());
        assert!(settings.stream().expect("no chat").is_none());
        assert_eq!(
            settings.jwt_secret(BuildMode::Release),
            Err(SettingsError::Missing { name: "jwt_secret" })
        );
        assert_eq!(
            settings
                .jwt_secret(BuildMode::Debug)
                .expect("ephemeral")
                .len(),
            EPHEMERAL_SECRET_LEN
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("PRAKRITI_BIND_ADDR", "127.0.0.1:9000"),
            ("PRAKRITI_DATABASE_URL", "postgres://db/prakriti"),
            ("PRAKRITI_JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("PRAKRITI_JWT_TTL_HOURS", "2"),
            ("PRAKRITI_STREAM_API_KEY", "key"),
            ("PRAKRITI_STREAM_API_SECRET", "secret"),
            ("PRAKRITI_STREAM_TIMEOUT_SECS", "3"),
            ("PRAKRITI_DB_MAX_CONNECTIONS", "4"),
            ("PRAKRITI_CORS_ALLOWED_ORIGIN", "https://app.example.org"),
        ]));

        let settings = load();
        assert_eq!(settings.bind_addr(), "127.0.0.1:9000");
        assert_eq!(settings.database_url(), Ok("postgres://db/prakriti"));
        assert_eq!(settings.jwt_ttl(), TimeDelta::hours(2));
        assert_eq!(settings.db_max_connections(), 4);
        assert_eq!(
            settings.cors_allowed_origin(),
            Some("https://app.example.org")
        );
        let secret = settings.jwt_secret(BuildMode::Release).expect("secret");
        assert_eq!(secret.as_slice(), b"0123456789abcdef0123456789abcdef");

        let stream = settings.stream().expect("valid").expect("configured");
        assert_eq!(stream.api_key, "key");
        assert_eq!(stream.api_secret.as_str(), "secret");
        assert_eq!(stream.base_url, DEFAULT_STREAM_BASE_URL);
        assert_eq!(stream.timeout, Duration::from_secs(3));

        let debug = format!("{settings:?}");
        assert!(!debug.contains("0123456789abcdef"), "{debug}");
        assert!(!debug.contains("postgres://"), "{debug}");
    }

    #[rstest]
    #[case(&[("PRAKRITI_JWT_SECRET", "short")], "jwt_secret")]
    #[case(&[("PRAKRITI_STREAM_API_KEY", "key")], "stream_api_key")]
    fn incomplete_secrets_are_rejected(
        #[case] overrides: &[(&'static str, &str)],
        #[case] field: &str,
    ) {
        let _guard = lock_env(env_with(overrides));

        let settings = load();
        let err = if field == "jwt_secret" {
            settings.jwt_secret(BuildMode::Debug).map(|_| ()).expect_err("too short")
        } else {
            settings.stream().map(|_| ()).expect_err("half configured")
        };
        assert!(matches!(err, SettingsError::Invalid { name, .. } if name == field));
    }
}
