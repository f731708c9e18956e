//! Donation use-cases and the status lifecycle.

use std::sync::Arc;

use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::donation::COMPLETION_SCORE;
use super::ports::{DonationFilter, DonationRepository, ProductRepository};
use super::{
    Donation, DonationId, DonationStatus, Error, FieldViolation, ProductId, Proximity, Role,
    TransitionError, User,
};

/// Donation offer submitted by a vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationOffer {
    pub product_id: ProductId,
    /// Defaults to the whole product quantity.
    pub quantity: Option<i64>,
    pub notes: Option<String>,
}

/// Available donation with its distance from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDonation {
    #[serde(flatten)]
    pub donation: Donation,
    pub distance_km: f64,
}

#[derive(Clone)]
pub struct DonationService {
    donations: Arc<dyn DonationRepository>,
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
}

impl From<TransitionError> for Error {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::Invalid { .. } => Error::invalid_request(value.to_string()),
            TransitionError::NgoRequired | TransitionError::NotParticipant => {
                Error::forbidden(value.to_string())
            }
        }
    }
}

impl DonationService {
    pub fn new(
        donations: Arc<dyn DonationRepository>,
        products: Arc<dyn ProductRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            donations,
            products,
            clock,
        }
    }

    /// Offer part or all of an owned, active product.
    pub async fn create(&self, vendor: &User, offer: DonationOffer) -> Result<Donation, Error> {
        if !vendor.has_role(Role::Vendor) {
            return Err(Error::forbidden("Only vendors can create donations"));
        }
        let product = match self.products.find_by_id(&offer.product_id).await? {
            Some(product) if product.is_active => product,
            _ => return Err(Error::not_found("Product not found")),
        };
        if !product.is_owned_by(&vendor.id) {
            return Err(Error::forbidden("You can only donate your own products"));
        }

        let requested = offer.quantity.unwrap_or(i64::from(product.quantity));
        let quantity = match i32::try_from(requested) {
            Ok(quantity) if quantity > 0 && quantity <= product.quantity => quantity,
            _ => {
                return Err(Error::validation(vec![FieldViolation::new(
                    "quantity",
                    format!("Quantity must be between 1 and {}", product.quantity),
                )]));
            }
        };
        let notes = offer
            .notes
            .map(|notes| notes.trim().to_owned())
            .filter(|notes| !notes.is_empty());

        let donation = Donation::offer(
            product.id,
            vendor.id.clone(),
            quantity,
            notes,
            self.clock.utc(),
        );
        self.donations.insert(&donation).await?;
        info!(donation_id = %donation.id, product_id = %product.id, "donation offered");
        Ok(donation)
    }

    /// Look up a donation by id.
    ///
    /// # Errors
    /// [`ErrorCode::NotFound`](super::ErrorCode::NotFound) when no donation
    /// has this id.
    pub async fn get(&self, id: &DonationId) -> Result<Donation, Error> {
        self.donations
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Donation not found"))
    }

    /// All donations, optionally restricted to one status.
    pub async fn list(&self, status: Option<DonationStatus>) -> Result<Vec<Donation>, Error> {
        let filter = DonationFilter::with_statuses(status);
        Ok(self.donations.list(&filter).await?)
    }

    /// Donations the caller takes part in: offered as a vendor or requested
    /// as an NGO.
    pub async fn list_mine(&self, user: &User) -> Result<Vec<Donation>, Error> {
        let mut mine = Vec::new();
        if user.has_role(Role::Vendor) {
            let filter = DonationFilter::default().for_vendor(&user.id);
            mine.extend(self.donations.list(&filter).await?);
        }
        if user.has_role(Role::Ngo) {
            let filter = DonationFilter::default().requested_by(&user.id);
            for donation in self.donations.list(&filter).await? {
                if !mine.iter().any(|d: &Donation| d.id == donation.id) {
                    mine.push(donation);
                }
            }
        }
        mine.sort_by_key(|d| std::cmp::Reverse(d.created_at));
        Ok(mine)
    }

    /// Available donations whose product lies near the caller, closest first.
    pub async fn list_available_nearby(&self, user: &User) -> Result<Vec<NearbyDonation>, Error> {
        let proximity = Proximity::nearby(user.location);
        let candidates = self
            .donations
            .available_in_bounds(proximity.bounding_box())
            .await?;
        Ok(proximity
            .nearest(candidates, |located| located.location)
            .into_iter()
            .map(|(located, metres)| NearbyDonation {
                donation: located.donation,
                distance_km: metres / 1000.0,
            })
            .collect())
    }

    /// Advance a donation along its lifecycle on behalf of `actor`.
    ///
    /// Completing a donation credits the vendor's donation score in the same
    /// write, so a failed credit leaves the donation where it was. A request
    /// that lost a race with another status change gets a conflict.
    pub async fn update_status(
        &self,
        actor: &User,
        id: &DonationId,
        to: DonationStatus,
    ) -> Result<Donation, Error> {
        let current = self.get(id).await?;
        let next = current.transition(actor, to, self.clock.utc())?;
        let credit = (next.status == DonationStatus::Completed).then_some(COMPLETION_SCORE);
        let applied = self
            .donations
            .apply_transition(&next, current.status, credit)
            .await?;
        if !applied {
            return Err(Error::conflict("Donation was updated by another request"));
        }
        info!(
            donation_id = %next.id,
            from = %current.status,
            to = %next.status,
            actor = %actor.id,
            "donation status changed"
        );
        Ok(next)
    }
}
