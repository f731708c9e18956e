//! Products listed by vendors.
//!
//! A product carries the pickup location used by proximity searches. When a
//! vendor omits coordinates the vendor's own location is used instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identifier::uuid_identifier;
use super::{FieldViolation, GeoPoint, UserId};

uuid_identifier!(
    /// Stable product identifier.
    ProductId,
    "Invalid product id"
);

/// Default page size for product listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Product offered by a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[schema(value_type = String)]
    pub id: ProductId,
    #[schema(value_type = String)]
    pub vendor_id: UserId,
    #[schema(example = "Surplus bread")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "bakery")]
    pub category: String,
    pub quantity: i32,
    #[schema(example = "loaves")]
    pub unit: String,
    pub price: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub image_urls: Vec<String>,
    pub location: GeoPoint,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a new active listing owned by `vendor_id`.
    pub fn list(
        vendor_id: UserId,
        draft: ProductDraft,
        fallback_location: GeoPoint,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProductId::random(),
            vendor_id,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            quantity: draft.quantity,
            unit: draft.unit,
            price: draft.price,
            expires_at: draft.expires_at,
            image_urls: draft.image_urls,
            location: draft.location.unwrap_or(fallback_location),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.vendor_id == user
    }

    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: ProductPatch, now: DateTime<Utc>) {
        let ProductPatch {
            name,
            description,
            category,
            quantity,
            unit,
            price,
            expires_at,
            image_urls,
            location,
        } = patch;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = Some(description);
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(quantity) = quantity {
            self.quantity = quantity;
        }
        if let Some(unit) = unit {
            self.unit = unit;
        }
        if let Some(price) = price {
            self.price = Some(price);
        }
        if let Some(expires_at) = expires_at {
            self.expires_at = Some(expires_at);
        }
        if let Some(image_urls) = image_urls {
            self.image_urls = image_urls;
        }
        if let Some(location) = location {
            self.location = location;
        }
        self.updated_at = now;
    }
}

/// Raw product fields as submitted by a vendor.
///
/// Every field is optional so the same shape serves creation and partial
/// updates; creation additionally requires name, category, quantity and unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub price: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub image_urls: Option<Vec<String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Validated fields for a new listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub quantity: i32,
    pub unit: String,
    pub price: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub image_urls: Vec<String>,
    pub location: Option<GeoPoint>,
}

/// Validated partial change to a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
    pub price: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub image_urls: Option<Vec<String>>,
    pub location: Option<GeoPoint>,
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

impl ProductInput {
    /// Validate the supplied fields, leaving absent ones as `None`.
    pub fn validate_patch(self) -> Result<ProductPatch, Vec<FieldViolation>> {
        let mut violations = Vec::new();
        let mut reject = |field: &str, message: &str| {
            violations.push(FieldViolation::new(field, message));
        };

        let name = self.name.and_then(|raw| {
            let trimmed = raw.trim().to_owned();
            if trimmed.chars().count() < 2 {
                reject("name", "Product name must be at least 2 characters");
                None
            } else {
                Some(trimmed)
            }
        });
        let category = self.category.and_then(|raw| {
            let value = non_blank(&raw);
            if value.is_none() {
                reject("category", "Category is required");
            }
            value
        });
        let unit = self.unit.and_then(|raw| {
            let value = non_blank(&raw);
            if value.is_none() {
                reject("unit", "Unit is required");
            }
            value
        });
        let quantity = self.quantity.and_then(|raw| match i32::try_from(raw) {
            Ok(value) if value > 0 => Some(value),
            _ => {
                reject("quantity", "Quantity must be a positive integer");
                None
            }
        });
        let price = self.price.and_then(|raw| {
            if raw.is_finite() && raw >= 0.0 {
                Some(raw)
            } else {
                reject("price", "Price must be a non-negative number");
                None
            }
        });
        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => match GeoPoint::new(lat, lng) {
                Ok(point) => Some(point),
                Err(_) => {
                    reject("location", "Valid coordinates required");
                    None
                }
            },
            (None, None) => None,
            _ => {
                reject("location", "Both latitude and longitude are required");
                None
            }
        };
        let image_urls = self.image_urls.map(|urls| {
            urls.iter()
                .filter_map(|url| non_blank(url))
                .collect::<Vec<_>>()
        });

        if !violations.is_empty() {
            return Err(violations);
        }
        Ok(ProductPatch {
            name,
            description: self.description.as_deref().and_then(non_blank),
            category,
            quantity,
            unit,
            price,
            expires_at: self.expires_at,
            image_urls,
            location,
        })
    }

    /// Validate a complete listing.
    pub fn validate_new(self) -> Result<ProductDraft, Vec<FieldViolation>> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push(FieldViolation::new(
                "name",
                "Product name must be at least 2 characters",
            ));
        }
        if self.category.is_none() {
            missing.push(FieldViolation::new("category", "Category is required"));
        }
        if self.quantity.is_none() {
            missing.push(FieldViolation::new(
                "quantity",
                "Quantity must be a positive integer",
            ));
        }
        if self.unit.is_none() {
            missing.push(FieldViolation::new("unit", "Unit is required"));
        }

        let patch = match self.validate_patch() {
            Ok(patch) if missing.is_empty() => patch,
            Ok(_) => return Err(missing),
            Err(mut violations) => {
                violations.extend(missing);
                return Err(violations);
            }
        };

        match (patch.name, patch.category, patch.quantity, patch.unit) {
            (Some(name), Some(category), Some(quantity), Some(unit)) => Ok(ProductDraft {
                name,
                description: patch.description,
                category,
                quantity,
                unit,
                price: patch.price,
                expires_at: patch.expires_at,
                image_urls: patch.image_urls.unwrap_or_default(),
                location: patch.location,
            }),
            _ => Err(vec![FieldViolation::new("product", "Incomplete product")]),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    /// Clamp client-supplied paging to sane bounds.
    ///
    /// # Examples
    /// ```
    /// use prakriti_backend::domain::Page;
    ///
    /// let page = Page::clamped(Some(0), Some(500));
    /// assert_eq!((page.number, page.size), (1, 100));
    /// ```
    pub fn clamped(number: Option<u32>, size: Option<u32>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::clamped(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn input() -> ProductInput {
        ProductInput {
            name: Some("  Surplus bread ".into()),
            category: Some("bakery".into()),
            quantity: Some(12),
            unit: Some("loaves".into()),
            ..ProductInput::default()
        }
    }

    #[rstest]
    fn valid_listing_trims_and_defaults(input: ProductInput) {
        let draft = input.validate_new().expect("valid product");
        assert_eq!(draft.name, "Surplus bread");
        assert!(draft.location.is_none());
        assert!(draft.image_urls.is_empty());
    }

    #[rstest]
    fn missing_fields_are_reported_for_new_listings() {
        let violations = ProductInput::default()
            .validate_new()
            .expect_err("empty input");
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["name", "category", "quantity", "unit"]);
    }

    #[rstest]
    #[case(Some(0), None, "quantity")]
    #[case(Some(-3), None, "quantity")]
    #[case(Some(i64::MAX), None, "quantity")]
    #[case(Some(1), Some(-1.0), "price")]
    #[case(Some(1), Some(f64::NAN), "price")]
    fn numeric_bounds(
        mut input: ProductInput,
        #[case] quantity: Option<i64>,
        #[case] price: Option<f64>,
        #[case] field: &str,
    ) {
        input.quantity = quantity;
        input.price = price;
        let violations = input.validate_new().expect_err("out of range");
        assert_eq!(violations[0].field, field);
    }

    #[rstest]
    fn lone_coordinate_is_rejected(mut input: ProductInput) {
        input.latitude = Some(10.0);
        let violations = input.validate_new().expect_err("lone latitude");
        assert_eq!(violations[0].field, "location");
    }

    #[rstest]
    fn location_falls_back_to_vendor(input: ProductInput) {
        let vendor_home = GeoPoint::new(18.5, 73.8).expect("valid point");
        let draft = input.validate_new().expect("valid product");
        let product = Product::list(UserId::random(), draft, vendor_home, Utc::now());
        assert_eq!(product.location, vendor_home);
        assert!(product.is_active);
    }

    #[rstest]
    fn patch_only_changes_supplied_fields(input: ProductInput) {
        let created = Utc::now();
        let mut product = Product::list(
            UserId::random(),
            input.validate_new().expect("valid product"),
            GeoPoint::new(0.0, 0.0).expect("valid point"),
            created,
        );
        let patch = ProductInput {
            quantity: Some(5),
            ..ProductInput::default()
        }
        .validate_patch()
        .expect("valid patch");
        product.apply(patch, created);
        assert_eq!(product.quantity, 5);
        assert_eq!(product.name, "Surplus bread");
    }

    #[rstest]
    #[case(None, None, 1, 20, 0)]
    #[case(Some(3), Some(10), 3, 10, 20)]
    #[case(Some(0), Some(0), 1, 1, 0)]
    fn paging_is_clamped(
        #[case] number: Option<u32>,
        #[case] size: Option<u32>,
        #[case] expected_number: u32,
        #[case] expected_size: u32,
        #[case] offset: u64,
    ) {
        let page = Page::clamped(number, size);
        assert_eq!((page.number, page.size), (expected_number, expected_size));
        assert_eq!(page.offset(), offset);
    }
}
