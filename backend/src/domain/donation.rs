//! Donations and their status lifecycle.
//!
//! A donation moves along `available -> requested -> confirmed -> picked_up
//! -> completed`. The only backwards step is `requested -> available`, used
//! when the vendor declines or the NGO withdraws a request.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identifier::uuid_identifier;
use super::{ProductId, Role, User, UserId};

uuid_identifier!(
    /// Stable donation identifier.
    DonationId,
    "Invalid donation id"
);

/// Points credited to a vendor for each completed donation.
pub const COMPLETION_SCORE: i32 = 10;

/// Lifecycle state of a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    /// Offered by the vendor and open to any NGO.
    Available,
    /// An NGO has asked for it; waiting on the vendor.
    Requested,
    /// The vendor accepted the request.
    Confirmed,
    /// The NGO has collected the goods.
    PickedUp,
    /// Handover finished. Terminal.
    Completed,
}

impl DonationStatus {
    /// States that still need action from someone.
    pub const IN_PROGRESS: [DonationStatus; 3] = [Self::Requested, Self::Confirmed, Self::PickedUp];
    /// Every state before completion.
    pub const OPEN: [DonationStatus; 4] = [
        Self::Available,
        Self::Requested,
        Self::Confirmed,
        Self::PickedUp,
    ];

    /// Wire and database form.
    ///
    /// # Examples
    /// ```
    /// use prakriti_backend::domain::DonationStatus;
    ///
    /// assert_eq!(DonationStatus::PickedUp.as_str(), "picked_up");
    /// assert_eq!(DonationStatus::PickedUp.to_string(), "picked_up");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Requested => "requested",
            Self::Confirmed => "confirmed",
            Self::PickedUp => "picked_up",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid donation status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for DonationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "available" => Ok(Self::Available),
            "requested" => Ok(Self::Requested),
            "confirmed" => Ok(Self::Confirmed),
            "picked_up" => Ok(Self::PickedUp),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Product handed over from a vendor to an NGO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    #[schema(value_type = String)]
    pub id: DonationId,
    /// Product the goods come from.
    #[schema(value_type = String)]
    pub product_id: ProductId,
    /// Vendor who offered the donation and owns the product.
    #[schema(value_type = String)]
    pub vendor_id: UserId,
    /// NGO holding the current request, if any.
    #[schema(value_type = Option<String>)]
    pub requested_by: Option<UserId>,
    pub status: DonationStatus,
    /// Units donated, never more than the product quantity at offer time.
    pub quantity: i32,
    /// Free-text handover notes from the vendor.
    pub notes: Option<String>,
    /// Set once, on the move to `completed`.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Time of the last status change.
    pub updated_at: DateTime<Utc>,
}

/// Why a status change was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid status transition from {from} to {to}")]
    Invalid {
        from: DonationStatus,
        to: DonationStatus,
    },
    #[error("Only NGOs can request donations")]
    NgoRequired,
    #[error("You are not a participant in this donation")]
    NotParticipant,
}

impl Donation {
    /// Offer `quantity` of a product owned by `vendor_id`.
    pub fn offer(
        product_id: ProductId,
        vendor_id: UserId,
        quantity: i32,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DonationId::random(),
            product_id,
            vendor_id,
            requested_by: None,
            status: DonationStatus::Available,
            quantity,
            notes,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn is_vendor(&self, actor: &User) -> bool {
        self.vendor_id == actor.id
    }

    fn is_requester(&self, actor: &User) -> bool {
        self.requested_by.as_ref() == Some(&actor.id)
    }

    /// Move to `to` on behalf of `actor`, returning the updated record.
    ///
    /// # Examples
    /// ```
    /// # use prakriti_backend::domain::{Donation, DonationStatus, ProductId, UserId};
    /// # use chrono::Utc;
    /// let donation = Donation::offer(ProductId::random(), UserId::random(), 3, None, Utc::now());
    /// assert_eq!(donation.status, DonationStatus::Available);
    /// ```
    pub fn transition(
        &self,
        actor: &User,
        to: DonationStatus,
        now: DateTime<Utc>,
    ) -> Result<Donation, TransitionError> {
        use DonationStatus as S;

        let mut next = self.clone();
        match (self.status, to) {
            (S::Available, S::Requested) => {
                if !actor.has_role(Role::Ngo) {
                    return Err(TransitionError::NgoRequired);
                }
                next.requested_by = Some(actor.id.clone());
            }
            (S::Requested, S::Available) => {
                if !self.is_vendor(actor) && !self.is_requester(actor) {
                    return Err(TransitionError::NotParticipant);
                }
                next.requested_by = None;
            }
            (S::Requested, S::Confirmed) => {
                if !self.is_vendor(actor) {
                    return Err(TransitionError::NotParticipant);
                }
            }
            (S::Confirmed, S::PickedUp) => {
                if !self.is_vendor(actor) && !self.is_requester(actor) {
                    return Err(TransitionError::NotParticipant);
                }
            }
            (S::PickedUp, S::Completed) => {
                if !self.is_vendor(actor) && !self.is_requester(actor) {
                    return Err(TransitionError::NotParticipant);
                }
                next.completed_at = Some(now);
            }
            (from, to) => return Err(TransitionError::Invalid { from, to }),
        }
        next.status = to;
        next.updated_at = now;
        Ok(next)
    }
}

/// Donation paired with the pickup location of its product.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedDonation {
    pub donation: Donation,
    pub location: super::GeoPoint,
}
