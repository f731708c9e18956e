//! PostgreSQL-backed `DonationRepository` implementation using Diesel ORM.
//!
//! Donations carry no coordinates of their own; proximity queries join the
//! donated product and filter on its location. Status changes are guarded by
//! the expected current status and share a transaction with the vendor's
//! score credit.

use async_trait::async_trait;
use diesel::dsl::count_distinct;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use uuid::Uuid;

use crate::domain::ports::{DonationFilter, DonationPersistenceError, DonationRepository};
use crate::domain::{
    BoundingBox, Donation, DonationId, DonationStatus, GeoPoint, LocatedDonation,
};

use super::diesel_error_mapping::{count_to_u64, map_diesel_error, map_pool_error};
use super::models::{DonationChangeset, DonationRow};
use super::pool::{DbPool, PoolError};
use super::schema::{donations, products, users};

/// Diesel-backed implementation of the `DonationRepository` port.
#[derive(Clone)]
pub struct DieselDonationRepository {
    pool: DbPool,
}

impl DieselDonationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> DonationPersistenceError {
    map_pool_error(error, DonationPersistenceError::connection)
}

fn diesel_error(error: diesel::result::Error) -> DonationPersistenceError {
    map_diesel_error(
        error,
        DonationPersistenceError::query,
        DonationPersistenceError::connection,
    )
}

fn to_donation(row: DonationRow) -> Result<Donation, DonationPersistenceError> {
    Donation::try_from(row).map_err(DonationPersistenceError::query)
}

fn filtered(filter: &DonationFilter) -> donations::BoxedQuery<'static, Pg> {
    let mut query = donations::table.into_boxed();
    if !filter.statuses.is_empty() {
        let statuses: Vec<&'static str> =
            filter.statuses.iter().copied().map(DonationStatus::as_str).collect();
        query = query.filter(donations::status.eq_any(statuses));
    }
    if let Some(vendor) = &filter.vendor_id {
        query = query.filter(donations::vendor_id.eq(*vendor.as_uuid()));
    }
    if let Some(ngo) = &filter.requested_by {
        query = query.filter(donations::requested_by.eq(*ngo.as_uuid()));
    }
    query
}

type GuardedDonation = diesel::dsl::Filter<
    diesel::dsl::Find<donations::table, Uuid>,
    diesel::dsl::Eq<donations::status, &'static str>,
>;

/// The donation row, but only while its status is still `expected`.
fn guarded(donation_id: Uuid, expected: DonationStatus) -> GuardedDonation {
    donations::table
        .find(donation_id)
        .filter(donations::status.eq(expected.as_str()))
}

#[async_trait]
impl DonationRepository for DieselDonationRepository {
    async fn insert(&self, donation: &Donation) -> Result<(), DonationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::insert_into(donations::table)
            .values(DonationRow::from(donation))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(diesel_error)
    }

    async fn find_by_id(
        &self,
        id: &DonationId,
    ) -> Result<Option<Donation>, DonationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        donations::table
            .find(id.as_uuid())
            .select(DonationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?
            .map(to_donation)
            .transpose()
    }

    async fn apply_transition(
        &self,
        next: &Donation,
        expected: DonationStatus,
        vendor_credit: Option<i32>,
    ) -> Result<bool, DonationPersistenceError> {
        let changes = DonationChangeset::from(next);
        let donation_id = *next.id.as_uuid();
        let vendor_id = *next.vendor_id.as_uuid();

        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.transaction(|conn| {
            async move {
                let updated = diesel::update(guarded(donation_id, expected))
                    .set(changes)
                    .execute(conn)
                    .await?;
                if updated == 0 {
                    return Ok(false);
                }

                if let Some(delta) = vendor_credit {
                    let credited = diesel::update(users::table.find(vendor_id))
                        .set(users::donation_score.eq(users::donation_score + delta))
                        .execute(conn)
                        .await?;
                    // A missing vendor rolls the status change back too.
                    if credited == 0 {
                        return Err(diesel::result::Error::NotFound);
                    }
                }
                Ok(true)
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }

    async fn list(
        &self,
        filter: &DonationFilter,
    ) -> Result<Vec<Donation>, DonationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = filtered(filter)
            .select(DonationRow::as_select())
            .order((donations::created_at.desc(), donations::id.asc()))
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(to_donation).collect()
    }

    async fn count(&self, filter: &DonationFilter) -> Result<u64, DonationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let count: i64 = filtered(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(count_to_u64(count))
    }

    async fn count_distinct_vendors(
        &self,
        filter: &DonationFilter,
    ) -> Result<u64, DonationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let count: i64 = filtered(filter)
            .select(count_distinct(donations::vendor_id))
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(count_to_u64(count))
    }

    async fn available_in_bounds(
        &self,
        bounds: BoundingBox,
    ) -> Result<Vec<LocatedDonation>, DonationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows: Vec<(DonationRow, f64, f64)> = donations::table
            .inner_join(products::table)
            .filter(donations::status.eq(DonationStatus::Available.as_str()))
            .filter(products::is_active.eq(true))
            .filter(products::latitude.between(bounds.min_latitude, bounds.max_latitude))
            .filter(products::longitude.between(bounds.min_longitude, bounds.max_longitude))
            .select((
                DonationRow::as_select(),
                products::latitude,
                products::longitude,
            ))
            .order(donations::created_at.desc())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;

        rows.into_iter()
            .map(|(row, latitude, longitude)| {
                let location = GeoPoint::new(latitude, longitude).map_err(|err| {
                    DonationPersistenceError::query(format!(
                        "stored product for donation {} has invalid location: {err}",
                        row.id
                    ))
                })?;
                Ok(LocatedDonation {
                    donation: to_donation(row)?,
                    location,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use diesel::debug_query;
    use rstest::rstest;

    #[rstest]
    fn statuses_and_participants_become_conditions() {
        let filter = DonationFilter::with_statuses(DonationStatus::IN_PROGRESS)
            .for_vendor(&UserId::random())
            .requested_by(&UserId::random());
        let sql = debug_query::<Pg, _>(&filtered(&filter)).to_string();
        assert!(sql.contains("\"status\" = ANY"), "{sql}");
        assert!(sql.contains("\"vendor_id\""), "{sql}");
        assert!(sql.contains("\"requested_by\""), "{sql}");
        assert!(sql.contains("picked_up"), "{sql}");
    }

    #[rstest]
    fn empty_status_list_matches_everything() {
        let sql = debug_query::<Pg, _>(&filtered(&DonationFilter::default())).to_string();
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    #[rstest]
    fn status_writes_are_conditional_on_the_expected_status() {
        let mut next = Donation::offer(
            crate::domain::ProductId::random(),
            UserId::random(),
            3,
            None,
            chrono::Utc::now(),
        );
        next.status = DonationStatus::Confirmed;
        let statement = diesel::update(guarded(*next.id.as_uuid(), DonationStatus::Requested))
            .set(DonationChangeset::from(&next));
        let sql = debug_query::<Pg, _>(&statement).to_string();
        assert!(sql.starts_with("UPDATE \"donations\""), "{sql}");
        assert!(sql.contains("\"donations\".\"status\" = $"), "{sql}");
        assert!(sql.contains("\"requested\""), "{sql}");
        assert!(sql.contains("\"confirmed\""), "{sql}");
    }

    #[rstest]
    fn checkout_failures_are_connection_errors() {
        let err = pool_error(PoolError::checkout("timed out"));
        assert_eq!(err, DonationPersistenceError::connection("timed out"));
    }
}
