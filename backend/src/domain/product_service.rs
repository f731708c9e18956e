//! Product listing use-cases.

use std::sync::Arc;

use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::ports::{ProductFilter, ProductRepository, Window};
use super::{Error, Page, Product, ProductId, ProductInput, Proximity, Role, User, UserId};

/// Listing query after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub near: Option<Proximity>,
    pub page: Page,
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub limit: u32,
}

#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { products, clock }
    }

    pub async fn create(&self, vendor: &User, input: ProductInput) -> Result<Product, Error> {
        if !vendor.has_role(Role::Vendor) {
            return Err(Error::forbidden("Only vendors can list products"));
        }
        let draft = input.validate_new().map_err(Error::validation)?;
        let product = Product::list(vendor.id.clone(), draft, vendor.location, self.clock.utc());
        self.products.insert(&product).await?;
        info!(product_id = %product.id, vendor_id = %vendor.id, "product listed");
        Ok(product)
    }

    /// Fetch an active product.
    pub async fn get(&self, id: &ProductId) -> Result<Product, Error> {
        match self.products.find_by_id(id).await? {
            Some(product) if product.is_active => Ok(product),
            _ => Err(Error::not_found("Product not found")),
        }
    }

    async fn owned(&self, owner: &UserId, id: &ProductId) -> Result<Product, Error> {
        let product = self.get(id).await?;
        if !product.is_owned_by(owner) {
            return Err(Error::forbidden("You can only modify your own products"));
        }
        Ok(product)
    }

    pub async fn update(
        &self,
        vendor: &User,
        id: &ProductId,
        input: ProductInput,
    ) -> Result<Product, Error> {
        let mut product = self.owned(&vendor.id, id).await?;
        let patch = input.validate_patch().map_err(Error::validation)?;
        product.apply(patch, self.clock.utc());
        self.products.update(&product).await?;
        Ok(product)
    }

    /// Withdraw a listing. The row is kept for donation history.
    pub async fn deactivate(&self, vendor: &User, id: &ProductId) -> Result<(), Error> {
        let mut product = self.owned(&vendor.id, id).await?;
        product.is_active = false;
        product.updated_at = self.clock.utc();
        self.products.update(&product).await?;
        info!(product_id = %product.id, "product withdrawn");
        Ok(())
    }

    /// Active products, newest first.
    ///
    /// With a proximity filter every product in the bounding box is checked
    /// against the radius before paging, so older records inside the box
    /// never push out closer ones.
    pub async fn list(&self, query: ProductQuery) -> Result<ProductPage, Error> {
        let ProductQuery {
            category,
            near,
            page,
        } = query;
        let mut filter = ProductFilter {
            category: category.filter(|c| !c.trim().is_empty()),
            ..ProductFilter::active()
        };

        let products = match near {
            None => {
                let window = Window {
                    offset: page.offset(),
                    limit: u64::from(page.size),
                };
                self.products.list(&filter, window).await?
            }
            Some(proximity) => {
                filter.bounds = Some(proximity.bounding_box());
                let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
                self.products
                    .list(&filter, Window::all())
                    .await?
                    .into_iter()
                    .filter(|p| proximity.distance_to(&p.location).is_some())
                    .skip(offset)
                    .take(page.size as usize)
                    .collect()
            }
        };

        Ok(ProductPage {
            products,
            page: page.number,
            limit: page.size,
        })
    }

    /// The vendor's own active listings.
    pub async fn list_for_vendor(&self, vendor: &User) -> Result<Vec<Product>, Error> {
        if !vendor.has_role(Role::Vendor) {
            return Err(Error::forbidden("Access denied. Vendor role required."));
        }
        let filter = ProductFilter {
            vendor_id: Some(vendor.id.clone()),
            ..ProductFilter::active()
        };
        Ok(self.products.list(&filter, Window::all()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockProductRepository, ProductPersistenceError};
    use crate::test_support::{InMemoryStore, MutableClock, sample_user as person};
    use rstest::{fixture, rstest};

    fn input(name: &str, category: &str) -> ProductInput {
        ProductInput {
            name: Some(name.into()),
            category: Some(category.into()),
            quantity: Some(3),
            unit: Some("kg".into()),
            ..ProductInput::default()
        }
    }

    struct Harness {
        clock: Arc<MutableClock>,
        service: ProductService,
    }

    #[fixture]
    fn harness() -> Harness {
        let clock = Arc::new(MutableClock::fixed());
        let service = ProductService::new(InMemoryStore::new(), clock.clone());
        Harness { clock, service }
    }

    #[rstest]
    #[tokio::test]
    async fn only_vendors_list_products(harness: Harness) {
        let ngo = person(Role::Ngo, 18.5, 73.8);
        let err = harness
            .service
            .create(&ngo, input("Rice", "grains"))
            .await
            .expect_err("ngo cannot list");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn owners_update_and_withdraw(harness: Harness) {
        let vendor = person(Role::Vendor, 18.5, 73.8);
        let other = person(Role::Vendor, 18.5, 73.8);
        let product = harness
            .service
            .create(&vendor, input("Rice", "grains"))
            .await
            .expect("created");
        assert_eq!(product.location, vendor.location);

        let err = harness
            .service
            .deactivate(&other, &product.id)
            .await
            .expect_err("not owner");
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let updated = harness
            .service
            .update(
                &vendor,
                &product.id,
                ProductInput {
                    quantity: Some(9),
                    ..ProductInput::default()
                },
            )
            .await
            .expect("updated");
        assert_eq!(updated.quantity, 9);

        harness
            .service
            .deactivate(&vendor, &product.id)
            .await
            .expect("withdrawn");
        let err = harness.service.get(&product.id).await.expect_err("gone");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn listing_filters_category_distance_and_pages(harness: Harness) {
        let pune = person(Role::Vendor, 18.5204, 73.8567);
        let delhi = person(Role::Vendor, 28.6139, 77.2090);
        for name in ["Rice", "Wheat", "Millet"] {
            harness
                .service
                .create(&pune, input(name, "grains"))
                .await
                .expect("created");
            harness.clock.advance_seconds(60);
        }
        harness
            .service
            .create(&pune, input("Apples", "fruit"))
            .await
            .expect("created");
        harness
            .service
            .create(&delhi, input("Barley", "grains"))
            .await
            .expect("created");

        let near_pune = Proximity::nearby(pune.location);
        let page = harness
            .service
            .list(ProductQuery {
                category: Some("grains".into()),
                near: Some(near_pune),
                page: Page::clamped(Some(1), Some(2)),
            })
            .await
            .expect("listed");
        let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Millet", "Wheat"]);

        let all = harness
            .service
            .list(ProductQuery::default())
            .await
            .expect("listed");
        assert_eq!(all.products.len(), 5);
        assert_eq!((all.page, all.limit), (1, 20));
    }

    #[rstest]
    #[tokio::test]
    async fn newer_listings_outside_the_radius_do_not_hide_older_nearby_ones(harness: Harness) {
        let centre = person(Role::Customer, 18.5, 73.85).location;
        let bbox = Proximity::nearby(centre).bounding_box();
        let nearby = person(Role::Vendor, 18.501, 73.851);
        let corner = person(
            Role::Vendor,
            bbox.max_latitude - 0.01,
            bbox.max_longitude - 0.01,
        );
        let oldest = harness
            .service
            .create(&nearby, input("Lentils", "grains"))
            .await
            .expect("created");
        harness.clock.advance_seconds(60);
        for _ in 0..1005 {
            harness
                .service
                .create(&corner, input("Oats", "grains"))
                .await
                .expect("created");
        }

        let page = harness
            .service
            .list(ProductQuery {
                category: None,
                near: Some(Proximity::nearby(centre)),
                page: Page::clamped(None, None),
            })
            .await
            .expect("listed");
        let ids: Vec<_> = page.products.iter().map(|p| p.id).collect();
        assert_eq!(ids, [oldest.id]);
    }

    #[rstest]
    #[tokio::test]
    async fn connection_failures_become_unavailable() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .returning(|_| Err(ProductPersistenceError::connection("refused")));
        let service = ProductService::new(Arc::new(repo), Arc::new(MutableClock::fixed()));
        let err = service
            .get(&ProductId::random())
            .await
            .expect_err("unavailable");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
