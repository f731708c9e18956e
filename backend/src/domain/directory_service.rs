//! Public user directory: profiles and proximity search.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ports::{NearbyUsersFilter, UserRepository};
use super::{Error, GeoPoint, Proximity, Role, User, UserId};

/// What other users may see of an account. Contact details stay private.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[schema(value_type = String)]
    pub id: UserId,
    pub name: String,
    pub roles: Vec<Role>,
    pub address: String,
    pub location: GeoPoint,
    pub donation_score: i32,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.to_string(),
            roles: user.roles.as_slice().to_vec(),
            address: user.address.to_string(),
            location: user.location,
            donation_score: user.donation_score,
            profile_image: user.profile_image.clone(),
            created_at: user.created_at,
        }
    }
}

/// Directory entry annotated with its distance from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbyUser {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub distance_km: f64,
}

#[derive(Clone)]
pub struct DirectoryService {
    users: Arc<dyn UserRepository>,
}

impl DirectoryService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn public_profile(&self, id: &UserId) -> Result<PublicProfile, Error> {
        match self.users.find_by_id(id).await? {
            Some(user) if user.is_active => Ok(PublicProfile::from(&user)),
            _ => Err(Error::not_found("User not found")),
        }
    }

    /// Active users near `caller`, closest first.
    ///
    /// `role` narrows the search; the caller is part of the result when it
    /// matches.
    pub async fn nearby(
        &self,
        caller: &User,
        role: Option<Role>,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyUser>, Error> {
        let proximity = Proximity::with_radius_km(caller.location, radius_km);
        self.within(&proximity, role).await.map(|found| {
            found
                .into_iter()
                .map(|(user, metres)| NearbyUser {
                    profile: PublicProfile::from(&user),
                    distance_km: metres / 1000.0,
                })
                .collect()
        })
    }

    /// Number of active users holding `role` within the default radius.
    pub async fn count_nearby(&self, centre: GeoPoint, role: Role) -> Result<u64, Error> {
        let found = self.within(&Proximity::nearby(centre), Some(role)).await?;
        Ok(found.len() as u64)
    }

    async fn within(
        &self,
        proximity: &Proximity,
        role: Option<Role>,
    ) -> Result<Vec<(User, f64)>, Error> {
        let filter = NearbyUsersFilter {
            bounds: proximity.bounding_box(),
            role,
        };
        let candidates = self.users.find_in_bounds(filter).await?;
        Ok(proximity.nearest(candidates, |user| user.location))
    }
}
