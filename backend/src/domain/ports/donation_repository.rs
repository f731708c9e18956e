//! Port for donation persistence.
use async_trait::async_trait;

use crate::domain::{BoundingBox, Donation, DonationId, DonationStatus, LocatedDonation, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by donation repository adapters.
    pub enum DonationPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "donation repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "donation repository query failed: {message}",
    }
}

/// Filter shared by donation listings and counts.
///
/// An empty `statuses` list matches every status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationFilter {
    pub statuses: Vec<DonationStatus>,
    pub vendor_id: Option<UserId>,
    pub requested_by: Option<UserId>,
}

impl DonationFilter {
    pub fn with_statuses(statuses: impl IntoIterator<Item = DonationStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn for_vendor(mut self, vendor: &UserId) -> Self {
        self.vendor_id = Some(vendor.clone());
        self
    }

    pub fn requested_by(mut self, ngo: &UserId) -> Self {
        self.requested_by = Some(ngo.clone());
        self
    }

    /// Whether `donation` satisfies the filter.
    pub fn matches(&self, donation: &Donation) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&donation.status))
            && self
                .vendor_id
                .as_ref()
                .is_none_or(|vendor| vendor == &donation.vendor_id)
            && self
                .requested_by
                .as_ref()
                .is_none_or(|ngo| donation.requested_by.as_ref() == Some(ngo))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DonationRepository: Send + Sync {
    async fn insert(&self, donation: &Donation) -> Result<(), DonationPersistenceError>;

    async fn find_by_id(
        &self,
        id: &DonationId,
    ) -> Result<Option<Donation>, DonationPersistenceError>;

    /// Persist the status, requester and completion fields of `next`, but
    /// only while the stored status still equals `expected`.
    ///
    /// When `vendor_credit` is set, that many points are added to the
    /// vendor's donation score in the same transaction. Returns `Ok(false)`
    /// when the stored status has moved on and nothing was written. On error
    /// neither the donation nor the score changes.
    async fn apply_transition(
        &self,
        next: &Donation,
        expected: DonationStatus,
        vendor_credit: Option<i32>,
    ) -> Result<bool, DonationPersistenceError>;

    /// Donations matching `filter`, newest first.
    async fn list(&self, filter: &DonationFilter)
    -> Result<Vec<Donation>, DonationPersistenceError>;

    async fn count(&self, filter: &DonationFilter) -> Result<u64, DonationPersistenceError>;

    /// Number of distinct vendors among donations matching `filter`.
    async fn count_distinct_vendors(
        &self,
        filter: &DonationFilter,
    ) -> Result<u64, DonationPersistenceError>;

    /// Every available donation whose active product lies inside `bounds`.
    /// Uncapped; callers refine by exact distance before limiting.
    async fn available_in_bounds(
        &self,
        bounds: BoundingBox,
    ) -> Result<Vec<LocatedDonation>, DonationPersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductId;
    use chrono::Utc;
    use rstest::rstest;

    #[rstest]
    fn filter_matches_on_every_dimension() {
        let vendor = UserId::random();
        let ngo = UserId::random();
        let mut donation = Donation::offer(ProductId::random(), vendor.clone(), 1, None, Utc::now());
        donation.status = DonationStatus::Requested;
        donation.requested_by = Some(ngo.clone());

        assert!(DonationFilter::default().matches(&donation));
        assert!(
            DonationFilter::with_statuses(DonationStatus::IN_PROGRESS)
                .for_vendor(&vendor)
                .requested_by(&ngo)
                .matches(&donation)
        );
        assert!(!DonationFilter::with_statuses([DonationStatus::Completed]).matches(&donation));
        assert!(
            !DonationFilter::default()
                .requested_by(&UserId::random())
                .matches(&donation)
        );
    }
}
