//! PostgreSQL-backed `ProductRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ProductFilter, ProductPersistenceError, ProductRepository, Window};
use crate::domain::{Product, ProductId};

use super::diesel_error_mapping::{count_to_u64, map_diesel_error, map_pool_error, to_sql_bound};
use super::models::{ProductChangeset, ProductRow};
use super::pool::{DbPool, PoolError};
use super::schema::products;

/// Diesel-backed implementation of the `ProductRepository` port.
#[derive(Clone)]
pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> ProductPersistenceError {
    map_pool_error(error, ProductPersistenceError::connection)
}

fn diesel_error(error: diesel::result::Error) -> ProductPersistenceError {
    map_diesel_error(
        error,
        ProductPersistenceError::query,
        ProductPersistenceError::connection,
    )
}

fn to_product(row: ProductRow) -> Result<Product, ProductPersistenceError> {
    Product::try_from(row).map_err(ProductPersistenceError::query)
}

/// Apply `filter` to a boxed product query.
fn filtered(filter: &ProductFilter) -> products::BoxedQuery<'static, Pg> {
    let mut query = products::table.into_boxed();
    if filter.active_only {
        query = query.filter(products::is_active.eq(true));
    }
    if let Some(category) = &filter.category {
        query = query.filter(products::category.eq(category.clone()));
    }
    if let Some(vendor) = &filter.vendor_id {
        query = query.filter(products::vendor_id.eq(*vendor.as_uuid()));
    }
    if let Some(bounds) = filter.bounds {
        query = query
            .filter(products::latitude.between(bounds.min_latitude, bounds.max_latitude))
            .filter(products::longitude.between(bounds.min_longitude, bounds.max_longitude));
    }
    query
}

#[async_trait]
impl ProductRepository for DieselProductRepository {
    async fn insert(&self, product: &Product) -> Result<(), ProductPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::insert_into(products::table)
            .values(ProductRow::from(product))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(diesel_error)
    }

    async fn find_by_id(
        &self,
        id: &ProductId,
    ) -> Result<Option<Product>, ProductPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        products::table
            .find(id.as_uuid())
            .select(ProductRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?
            .map(to_product)
            .transpose()
    }

    async fn update(&self, product: &Product) -> Result<(), ProductPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let updated = diesel::update(products::table.find(product.id.as_uuid()))
            .set(ProductChangeset::from(product))
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;
        if updated == 0 {
            return Err(ProductPersistenceError::query("product not found for update"));
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        window: Window,
    ) -> Result<Vec<Product>, ProductPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = filtered(filter)
            .select(ProductRow::as_select())
            .order((products::created_at.desc(), products::id.asc()))
            .offset(to_sql_bound(window.offset))
            .limit(to_sql_bound(window.limit))
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(to_product).collect()
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, ProductPersistenceError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let count: i64 = filtered(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(count_to_u64(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeoPoint, UserId};
    use diesel::debug_query;
    use rstest::rstest;

    #[rstest]
    fn empty_filter_adds_no_conditions() {
        let sql = debug_query::<Pg, _>(&filtered(&ProductFilter::default())).to_string();
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    #[rstest]
    fn every_dimension_becomes_a_condition() {
        let centre = GeoPoint::new(12.97, 77.59).expect("valid point");
        let filter = ProductFilter {
            active_only: true,
            category: Some("bakery".into()),
            vendor_id: Some(UserId::random()),
            bounds: Some(centre.bounding_box(5_000.0)),
        };
        let sql = debug_query::<Pg, _>(&filtered(&filter)).to_string();
        for column in ["is_active", "category", "vendor_id", "latitude", "longitude"] {
            assert!(sql.contains(column), "{column} missing from {sql}");
        }
    }

    #[rstest]
    fn query_failures_map_to_query_errors() {
        let err = diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(err, ProductPersistenceError::Query { .. }));
    }
}
