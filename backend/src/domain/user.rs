//! User accounts and their validated field types.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::GeoPoint;

/// Validation errors for user fields.
///
/// The display strings double as the client-facing validation messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    InvalidId,
    NameTooShort,
    InvalidEmail,
    PasswordTooShort,
    NoRoles,
    InvalidRole,
    PhoneTooShort,
    AddressTooShort,
    InvalidLatitude,
    InvalidLongitude,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::InvalidId => "user id must be a valid UUID",
            Self::NameTooShort => "Name must be at least 2 characters",
            Self::InvalidEmail => "Please provide a valid email",
            Self::PasswordTooShort => "Password must be at least 6 characters",
            Self::NoRoles => "At least one role must be selected",
            Self::InvalidRole => "Invalid role",
            Self::PhoneTooShort => "Valid phone number required",
            Self::AddressTooShort => "Address required",
            Self::InvalidLatitude => "Valid latitude required",
            Self::InvalidLongitude => "Valid longitude required",
        };
        f.write_str(message)
    }
}

impl std::error::Error for UserValidationError {}

/// Minimum length of a person's name.
pub const NAME_MIN: usize = 2;
/// Minimum length of a plaintext password.
pub const PASSWORD_MIN: usize = 6;
/// Minimum length of a phone number.
pub const PHONE_MIN: usize = 10;
/// Minimum length of a postal address.
pub const ADDRESS_MIN: usize = 5;

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Parse an identifier from its canonical string form.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let raw = id.as_ref();
        if raw.trim() != raw {
            return Err(UserValidationError::InvalidId);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Generates the string plumbing shared by the trimmed text newtypes.
macro_rules! text_newtype {
    ($name:ident) => {
        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_ref())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = UserValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

fn trimmed_with_min(
    value: &str,
    min: usize,
    error: UserValidationError,
) -> Result<String, UserValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() < min {
        return Err(error);
    }
    Ok(trimmed.to_owned())
}

/// Person or organisation name, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonName(String);

impl PersonName {
    pub fn new(name: impl AsRef<str>) -> Result<Self, UserValidationError> {
        trimmed_with_min(name.as_ref(), NAME_MIN, UserValidationError::NameTooShort).map(Self)
    }
}

text_newtype!(PersonName);

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        let pattern = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
        Regex::new(pattern).unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Email address normalised to lower case.
///
/// # Examples
/// ```
/// use prakriti_backend::domain::Email;
///
/// let email = Email::new("  Green.Grocer@Example.ORG ").expect("valid email");
/// assert_eq!(email.as_ref(), "green.grocer@example.org");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn new(email: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = email.as_ref().trim().to_lowercase();
        if !email_regex().is_match(&normalised) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }
}

text_newtype!(Email);

/// Contact phone number, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn new(phone: impl AsRef<str>) -> Result<Self, UserValidationError> {
        trimmed_with_min(phone.as_ref(), PHONE_MIN, UserValidationError::PhoneTooShort).map(Self)
    }
}

text_newtype!(PhoneNumber);

/// Street address, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalAddress(String);

impl PostalAddress {
    pub fn new(address: impl AsRef<str>) -> Result<Self, UserValidationError> {
        trimmed_with_min(
            address.as_ref(),
            ADDRESS_MIN,
            UserValidationError::AddressTooShort,
        )
        .map(Self)
    }
}

text_newtype!(PostalAddress);

/// Marketplace role held by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Vendor,
    Ngo,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Vendor => "vendor",
            Self::Ngo => "ngo",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "customer" => Ok(Self::Customer),
            "vendor" => Ok(Self::Vendor),
            "ngo" => Ok(Self::Ngo),
            _ => Err(UserValidationError::InvalidRole),
        }
    }
}

/// Non-empty, duplicate-free list of roles in the order first given.
///
/// # Examples
/// ```
/// use prakriti_backend::domain::{Role, Roles};
///
/// let roles = Roles::new([Role::Vendor, Role::Ngo, Role::Vendor]).expect("non-empty");
/// assert_eq!(roles.as_slice(), &[Role::Vendor, Role::Ngo]);
/// assert!(roles.contains(Role::Ngo));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Role>", into = "Vec<Role>")]
pub struct Roles(Vec<Role>);

impl Roles {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Result<Self, UserValidationError> {
        let mut unique = Vec::new();
        for role in roles {
            if !unique.contains(&role) {
                unique.push(role);
            }
        }
        if unique.is_empty() {
            return Err(UserValidationError::NoRoles);
        }
        Ok(Self(unique))
    }

    /// Parse role names, rejecting unknown values.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, UserValidationError> {
        let parsed = names
            .iter()
            .map(|name| name.as_ref().parse::<Role>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn as_slice(&self) -> &[Role] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl From<Roles> for Vec<Role> {
    fn from(value: Roles) -> Self {
        value.0
    }
}

impl TryFrom<Vec<Role>> for Roles {
    type Error = UserValidationError;

    fn try_from(value: Vec<Role>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Registered account as exposed to its owner.
///
/// The password hash never lives on this type; see [`NewUser`] and
/// [`StoredCredentials`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: UserId,
    #[schema(value_type = String, example = "Green Grocers")]
    pub name: PersonName,
    #[schema(value_type = String, example = "shop@example.org")]
    pub email: Email,
    #[schema(value_type = Vec<Role>)]
    pub roles: Roles,
    #[schema(value_type = String, example = "9876543210")]
    pub phone: PhoneNumber,
    #[schema(value_type = String, example = "12 Market Road, Pune")]
    pub address: PostalAddress,
    pub location: GeoPoint,
    pub donation_score: i32,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    /// Apply the fields present in `update` and bump `updated_at`.
    pub fn apply_profile_update(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        let ProfileUpdate {
            name,
            phone,
            address,
            location,
            profile_image,
        } = update;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if let Some(address) = address {
            self.address = address;
        }
        if let Some(location) = location {
            self.location = location;
        }
        if let Some(image) = profile_image {
            self.profile_image = Some(image);
        }
        self.updated_at = now;
    }
}

/// Freshly registered account together with its password hash.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user: User,
    pub password_hash: String,
}

/// Account and hash loaded for a credential check.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Validated partial profile change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<PersonName>,
    pub phone: Option<PhoneNumber>,
    pub address: Option<PostalAddress>,
    pub location: Option<GeoPoint>,
    pub profile_image: Option<String>,
}
