//! Chat provider payloads: user profiles and channel descriptions.

use std::sync::OnceLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::{FieldViolation, Role, User, UserId};

/// Channel type used when a client does not name one.
pub const DEFAULT_CHANNEL_TYPE: &str = "messaging";

/// Copy of a user as registered with the chat provider.
///
/// Role flags mirror the marketplace roles; when a user holds several roles
/// `userType` reports the last of vendor, ngo, customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_vendor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ngo_id: Option<String>,
    #[serde(rename = "isNGO", skip_serializing_if = "Option::is_none")]
    pub is_ngo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_customer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<Role>,
}

/// Bytes a URI component keeps as-is: ASCII alphanumerics and `-_.!~*'()`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Generated avatar for users without a profile image.
///
/// # Examples
/// ```
/// use prakriti_backend::domain::fallback_avatar;
///
/// assert_eq!(
///     fallback_avatar("Asha & Co"),
///     "https://ui-avatars.com/api/?name=Asha%20%26%20Co&background=random"
/// );
/// ```
pub fn fallback_avatar(name: &str) -> String {
    let encoded = utf8_percent_encode(name, URI_COMPONENT);
    format!("https://ui-avatars.com/api/?name={encoded}&background=random")
}

impl ChatProfile {
    pub fn from_user(user: &User) -> Self {
        let id = user.id.to_string();
        let mut profile = Self {
            id: id.clone(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            image: user
                .profile_image
                .clone()
                .unwrap_or_else(|| fallback_avatar(user.name.as_ref())),
            vendor_id: None,
            is_vendor: None,
            ngo_id: None,
            is_ngo: None,
            customer_id: None,
            is_customer: None,
            user_type: None,
        };
        if user.has_role(Role::Vendor) {
            profile.vendor_id = Some(id.clone());
            profile.is_vendor = Some(true);
            profile.user_type = Some(Role::Vendor);
        }
        if user.has_role(Role::Ngo) {
            profile.ngo_id = Some(id.clone());
            profile.is_ngo = Some(true);
            profile.user_type = Some(Role::Ngo);
        }
        if user.has_role(Role::Customer) {
            profile.customer_id = Some(id);
            profile.is_customer = Some(true);
            profile.user_type = Some(Role::Customer);
        }
        profile
    }
}

/// Credentials a client needs to connect to the chat provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatCredentials {
    pub token: String,
    pub api_key: String,
    pub user_id: String,
}

/// Raw channel request from a client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelRequest {
    pub channel_type: Option<String>,
    pub channel_id: String,
    pub members: Vec<String>,
    pub metadata: Map<String, Value>,
}

/// Validated channel ready to be created with the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub channel_type: String,
    pub channel_id: String,
    /// Caller first, then the requested members, without duplicates.
    pub members: Vec<String>,
    pub created_by: UserId,
    pub metadata: Map<String, Value>,
}

/// Channel as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub channel_id: String,
    pub channel_type: String,
    pub members: Vec<String>,
}

impl From<&ChannelSpec> for ChannelSummary {
    fn from(spec: &ChannelSpec) -> Self {
        Self {
            channel_id: spec.channel_id.clone(),
            channel_type: spec.channel_type.clone(),
            members: spec.members.clone(),
        }
    }
}

static CHANNEL_TYPE_RE: OnceLock<Regex> = OnceLock::new();
static CHANNEL_ID_RE: OnceLock<Regex> = OnceLock::new();

fn channel_type_regex() -> &'static Regex {
    CHANNEL_TYPE_RE.get_or_init(|| {
        Regex::new("^[A-Za-z0-9_-]+$")
            .unwrap_or_else(|error| panic!("channel type regex failed to compile: {error}"))
    })
}

fn channel_id_regex() -> &'static Regex {
    CHANNEL_ID_RE.get_or_init(|| {
        Regex::new("^[A-Za-z0-9_!-]+$")
            .unwrap_or_else(|error| panic!("channel id regex failed to compile: {error}"))
    })
}

impl ChannelRequest {
    /// Validate identifiers and build the member list for `caller`.
    pub fn into_spec(self, caller: &UserId) -> Result<ChannelSpec, Vec<FieldViolation>> {
        let mut violations = Vec::new();
        let channel_type = self
            .channel_type
            .map(|raw| raw.trim().to_owned())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_CHANNEL_TYPE.to_owned());
        if !channel_type_regex().is_match(&channel_type) {
            violations.push(FieldViolation::new(
                "channelType",
                "Channel type may only contain letters, numbers, '_' or '-'",
            ));
        }
        let channel_id = self.channel_id.trim().to_owned();
        if !channel_id_regex().is_match(&channel_id) {
            violations.push(FieldViolation::new(
                "channelId",
                "Channel id may only contain letters, numbers, '_', '-' or '!'",
            ));
        }
        if !violations.is_empty() {
            return Err(violations);
        }

        let mut members = vec![caller.to_string()];
        for member in self.members {
            let member = member.trim().to_owned();
            if !member.is_empty() && !members.contains(&member) {
                members.push(member);
            }
        }

        Ok(ChannelSpec {
            channel_type,
            channel_id,
            members,
            created_by: caller.clone(),
            metadata: self.metadata,
        })
    }
}
