//! Role-specific dashboard counters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::directory_service::DirectoryService;
use super::geo::NEARBY_RESULT_LIMIT;
use super::ports::{DonationFilter, DonationRepository, ProductFilter, ProductRepository, Window};
use super::{DonationStatus, Error, Proximity, Role, User};

/// Chat unread counts are not tracked server side.
const UNREAD_MESSAGES: u64 = 0;

/// Counters shown on the customer dashboard.
///
/// Every count covers active records within the default radius of the
/// customer and stops at the nearby result limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    /// Active vendors nearby.
    pub nearby_vendors: u64,
    /// Active products listed nearby.
    pub available_products: u64,
    /// Active NGOs nearby.
    #[serde(rename = "nearbyNGOs")]
    pub nearby_ngos: u64,
    /// Always zero; unread counts live with the chat provider.
    pub unread_messages: u64,
}

/// Counters shown on the vendor dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorStats {
    /// The vendor's active listings.
    pub total_products: u64,
    /// Own donations that are available, requested, confirmed or picked up.
    pub active_donations: u64,
    /// Own donations that reached completion.
    pub completed_donations: u64,
    /// Points earned from completed donations.
    pub donation_score: i32,
    /// Always zero; unread counts live with the chat provider.
    pub unread_messages: u64,
}

/// Counters shown on the NGO dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NgoStats {
    /// Donations anyone may request, platform wide.
    pub available_donations: u64,
    /// The NGO's requests that are not yet completed.
    pub active_requests: u64,
    /// Donations this NGO has completed.
    pub completed_donations: u64,
    /// Distinct vendors behind those completed donations.
    pub partner_vendors: u64,
}

/// Builds the role dashboards from the directory and the repositories.
#[derive(Clone)]
pub struct DashboardService {
    directory: DirectoryService,
    products: Arc<dyn ProductRepository>,
    donations: Arc<dyn DonationRepository>,
}

fn require(user: &User, role: Role, label: &str) -> Result<(), Error> {
    if user.has_role(role) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "Access denied. {label} role required."
        )))
    }
}

impl DashboardService {
    /// Create the service over the shared directory and repositories.
    pub fn new(
        directory: DirectoryService,
        products: Arc<dyn ProductRepository>,
        donations: Arc<dyn DonationRepository>,
    ) -> Self {
        Self {
            directory,
            products,
            donations,
        }
    }

    /// Nearby counters for a customer.
    ///
    /// # Errors
    /// Forbidden unless `user` holds the customer role.
    pub async fn customer_stats(&self, user: &User) -> Result<CustomerStats, Error> {
        require(user, Role::Customer, "Customer")?;
        let (nearby_vendors, available_products, nearby_ngos) = tokio::try_join!(
            self.directory.count_nearby(user.location, Role::Vendor),
            self.count_products_near(user),
            self.directory.count_nearby(user.location, Role::Ngo),
        )?;
        Ok(CustomerStats {
            nearby_vendors,
            available_products,
            nearby_ngos,
            unread_messages: UNREAD_MESSAGES,
        })
    }

    /// Listing and donation counters for a vendor. Forbidden for other roles.
    pub async fn vendor_stats(&self, user: &User) -> Result<VendorStats, Error> {
        require(user, Role::Vendor, "Vendor")?;
        let own_products = ProductFilter {
            vendor_id: Some(user.id.clone()),
            ..ProductFilter::active()
        };
        let active = DonationFilter::with_statuses(DonationStatus::OPEN).for_vendor(&user.id);
        let completed =
            DonationFilter::with_statuses([DonationStatus::Completed]).for_vendor(&user.id);
        let (total_products, active_donations, completed_donations) = tokio::try_join!(
            async { self.products.count(&own_products).await.map_err(Error::from) },
            async { self.donations.count(&active).await.map_err(Error::from) },
            async { self.donations.count(&completed).await.map_err(Error::from) },
        )?;
        Ok(VendorStats {
            total_products,
            active_donations,
            completed_donations,
            donation_score: user.donation_score,
            unread_messages: UNREAD_MESSAGES,
        })
    }

    /// Request counters for an NGO. Forbidden for other roles.
    pub async fn ngo_stats(&self, user: &User) -> Result<NgoStats, Error> {
        require(user, Role::Ngo, "NGO")?;
        let available = DonationFilter::with_statuses([DonationStatus::Available]);
        let active = DonationFilter::with_statuses(DonationStatus::IN_PROGRESS).requested_by(&user.id);
        let completed =
            DonationFilter::with_statuses([DonationStatus::Completed]).requested_by(&user.id);
        let (available_donations, active_requests, completed_donations, partner_vendors) = tokio::try_join!(
            async { self.donations.count(&available).await.map_err(Error::from) },
            async { self.donations.count(&active).await.map_err(Error::from) },
            async { self.donations.count(&completed).await.map_err(Error::from) },
            async {
                self.donations
                    .count_distinct_vendors(&completed)
                    .await
                    .map_err(Error::from)
            },
        )?;
        Ok(NgoStats {
            available_donations,
            active_requests,
            completed_donations,
            partner_vendors,
        })
    }

    /// Active products within the default radius, capped at the nearby
    /// result limit only after the radius check.
    async fn count_products_near(&self, user: &User) -> Result<u64, Error> {
        let proximity = Proximity::nearby(user.location);
        let filter = ProductFilter {
            bounds: Some(proximity.bounding_box()),
            ..ProductFilter::active()
        };
        let count = self
            .products
            .list(&filter, Window::all())
            .await?
            .iter()
            .filter(|p| proximity.distance_to(&p.location).is_some())
            .count()
            .min(NEARBY_RESULT_LIMIT);
        Ok(count as u64)
    }
}
