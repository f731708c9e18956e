//! Internal Diesel row structs and their conversions to domain types.
//!
//! Rows are implementation details of the persistence layer. Conversions
//! re-validate stored values through the domain constructors and report a
//! readable message when a row no longer satisfies them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Donation, DonationId, DonationStatus, Email, GeoPoint, PersonName, PhoneNumber,
    PostalAddress, Product, ProductId, Role, Roles, User, UserId,
};

use super::schema::{donations, products, users};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub phone: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub donation_score: i32,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User row plus the stored password hash, for credential checks only.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CredentialsRow {
    #[diesel(embed)]
    pub user: UserRow,
    pub password_hash: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub roles: Vec<&'a str>,
    pub phone: &'a str,
    pub address: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub donation_score: i32,
    pub profile_image: Option<&'a str>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner-editable profile columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserProfileChangeset<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub address: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub profile_image: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewUserRow<'a> {
    pub fn new(user: &'a User, password_hash: &'a str) -> Self {
        Self {
            id: *user.id.as_uuid(),
            name: user.name.as_ref(),
            email: user.email.as_ref(),
            password_hash,
            roles: user.roles.iter().map(Role::as_str).collect(),
            phone: user.phone.as_ref(),
            address: user.address.as_ref(),
            latitude: user.location.latitude(),
            longitude: user.location.longitude(),
            donation_score: user.donation_score,
            profile_image: user.profile_image.as_deref(),
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl<'a> From<&'a User> for UserProfileChangeset<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            name: user.name.as_ref(),
            phone: user.phone.as_ref(),
            address: user.address.as_ref(),
            latitude: user.location.latitude(),
            longitude: user.location.longitude(),
            profile_image: user.profile_image.as_deref(),
            updated_at: user.updated_at,
        }
    }
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, err: &dyn std::fmt::Display| {
            format!("stored user {} has invalid {field}: {err}", row.id)
        };
        Ok(Self {
            id: UserId::from_uuid(row.id),
            name: PersonName::new(&row.name).map_err(|err| corrupt("name", &err))?,
            email: Email::new(&row.email).map_err(|err| corrupt("email", &err))?,
            roles: Roles::parse(&row.roles).map_err(|err| corrupt("roles", &err))?,
            phone: PhoneNumber::new(&row.phone).map_err(|err| corrupt("phone", &err))?,
            address: PostalAddress::new(&row.address).map_err(|err| corrupt("address", &err))?,
            location: GeoPoint::new(row.latitude, row.longitude)
                .map_err(|err| corrupt("location", &err))?,
            donation_score: row.donation_score,
            profile_image: row.profile_image,
            is_active: row.is_active,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub quantity: i32,
    pub unit: String,
    pub price: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub image_urls: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every mutable product column; `None` clears optional fields.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = products)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ProductChangeset<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub category: &'a str,
    pub quantity: i32,
    pub unit: &'a str,
    pub price: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub image_urls: &'a [String],
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            id: *product.id.as_uuid(),
            vendor_id: *product.vendor_id.as_uuid(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            quantity: product.quantity,
            unit: product.unit.clone(),
            price: product.price,
            expires_at: product.expires_at,
            image_urls: product.image_urls.clone(),
            latitude: product.location.latitude(),
            longitude: product.location.longitude(),
            is_active: product.is_active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

impl<'a> From<&'a Product> for ProductChangeset<'a> {
    fn from(product: &'a Product) -> Self {
        Self {
            name: &product.name,
            description: product.description.as_deref(),
            category: &product.category,
            quantity: product.quantity,
            unit: &product.unit,
            price: product.price,
            expires_at: product.expires_at,
            image_urls: &product.image_urls,
            latitude: product.location.latitude(),
            longitude: product.location.longitude(),
            is_active: product.is_active,
            updated_at: product.updated_at,
        }
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = String;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let location = GeoPoint::new(row.latitude, row.longitude)
            .map_err(|err| format!("stored product {} has invalid location: {err}", row.id))?;
        Ok(Self {
            id: ProductId::from_uuid(row.id),
            vendor_id: UserId::from_uuid(row.vendor_id),
            name: row.name,
            description: row.description,
            category: row.category,
            quantity: row.quantity,
            unit: row.unit,
            price: row.price,
            expires_at: row.expires_at,
            image_urls: row.image_urls,
            location,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Donations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = donations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DonationRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub requested_by: Option<Uuid>,
    pub status: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns touched by a status transition.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = donations)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct DonationChangeset {
    pub requested_by: Option<Uuid>,
    pub status: &'static str,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Donation> for DonationRow {
    fn from(donation: &Donation) -> Self {
        Self {
            id: *donation.id.as_uuid(),
            product_id: *donation.product_id.as_uuid(),
            vendor_id: *donation.vendor_id.as_uuid(),
            requested_by: donation.requested_by.as_ref().map(|id| *id.as_uuid()),
            status: donation.status.as_str().to_owned(),
            quantity: donation.quantity,
            notes: donation.notes.clone(),
            completed_at: donation.completed_at,
            created_at: donation.created_at,
            updated_at: donation.updated_at,
        }
    }
}

impl From<&Donation> for DonationChangeset {
    fn from(donation: &Donation) -> Self {
        Self {
            requested_by: donation.requested_by.as_ref().map(|id| *id.as_uuid()),
            status: donation.status.as_str(),
            completed_at: donation.completed_at,
            updated_at: donation.updated_at,
        }
    }
}

impl TryFrom<DonationRow> for Donation {
    type Error = String;

    fn try_from(row: DonationRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<DonationStatus>()
            .map_err(|err| format!("stored donation {} has invalid status: {err}", row.id))?;
        Ok(Self {
            id: DonationId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            vendor_id: UserId::from_uuid(row.vendor_id),
            requested_by: row.requested_by.map(UserId::from_uuid),
            status,
            quantity: row.quantity,
            notes: row.notes,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
