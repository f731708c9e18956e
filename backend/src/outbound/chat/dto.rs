//! Request bodies for the Stream Chat REST API.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{ChannelSpec, ChatProfile};

/// `POST /users` body: profiles keyed by user id.
#[derive(Debug, Serialize)]
pub(super) struct UpsertUsersRequest<'a> {
    pub users: BTreeMap<&'a str, &'a ChatProfile>,
}

impl<'a> UpsertUsersRequest<'a> {
    pub fn single(profile: &'a ChatProfile) -> Self {
        Self {
            users: BTreeMap::from([(profile.id.as_str(), profile)]),
        }
    }
}

/// `POST /channels/{type}/{id}/query` body.
#[derive(Debug, Serialize)]
pub(super) struct ChannelQueryRequest {
    pub data: Map<String, Value>,
}

impl From<&ChannelSpec> for ChannelQueryRequest {
    /// Client metadata is merged first so it cannot replace the member list
    /// or the creator.
    fn from(spec: &ChannelSpec) -> Self {
        let mut data = spec.metadata.clone();
        data.insert("members".to_owned(), Value::from(spec.members.clone()));
        data.insert(
            "created_by_id".to_owned(),
            Value::from(spec.created_by.to_string()),
        );
        Self { data }
    }
}

/// Claims of the server-side token.
#[derive(Debug, Serialize)]
pub(super) struct ServerClaims {
    pub server: bool,
}

/// Claims of a client token.
#[derive(Debug, Serialize)]
pub(super) struct UserClaims<'a> {
    pub user_id: &'a str,
}
