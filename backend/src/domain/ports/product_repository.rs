//! Port for product persistence.
use async_trait::async_trait;

use crate::domain::{BoundingBox, Product, ProductId, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by product repository adapters.
    pub enum ProductPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "product repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "product repository query failed: {message}",
    }
}

/// Filter shared by product listings and counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Restrict to listings that have not been withdrawn.
    pub active_only: bool,
    pub category: Option<String>,
    pub vendor_id: Option<UserId>,
    pub bounds: Option<BoundingBox>,
}

impl ProductFilter {
    /// Active listings only, no other restriction.
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }
}

/// Offset window over a listing ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    /// Every matching row.
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: u64::MAX,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<(), ProductPersistenceError>;

    /// Fetch a product regardless of its active flag.
    async fn find_by_id(&self, id: &ProductId)
    -> Result<Option<Product>, ProductPersistenceError>;

    /// Overwrite the mutable fields of an existing product.
    async fn update(&self, product: &Product) -> Result<(), ProductPersistenceError>;

    /// Products matching `filter`, newest first, restricted to `window`.
    async fn list(
        &self,
        filter: &ProductFilter,
        window: Window,
    ) -> Result<Vec<Product>, ProductPersistenceError>;

    async fn count(&self, filter: &ProductFilter) -> Result<u64, ProductPersistenceError>;
}
