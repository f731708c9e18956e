//! Authentication primitives: login credentials, signup and profile
//! commands, and access token claims.
//!
//! Inbound payloads are validated here before any service talks to a port.
//! Validation collects every failing field so clients can highlight them all
//! at once.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::user::PASSWORD_MIN;
use super::{
    Email, FieldViolation, GeoPoint, PersonName, PhoneNumber, PostalAddress, ProfileUpdate, Roles,
    UserId, UserValidationError,
};

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or malformed.
    InvalidEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "Please provide a valid email"),
            Self::EmptyPassword => write!(f, "Password is required"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials.
///
/// ## Invariants
/// - `email` is normalised through [`Email`].
/// - `password` is non-empty and retains caller-provided whitespace.
///
/// # Examples
/// ```
/// use prakriti_backend::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("NGO@example.org", "secret1").unwrap();
/// assert_eq!(creds.email().as_ref(), "ngo@example.org");
/// assert_eq!(creds.password(), "secret1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: Email,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let email = Email::new(email).map_err(|_| LoginValidationError::InvalidEmail)?;
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Raw signup command as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: Zeroizing<String>,
    pub roles: Vec<String>,
    pub phone: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub profile_image: Option<String>,
}

/// Signup data that passed validation; the password is still plaintext.
#[derive(Debug, Clone)]
pub struct ValidatedSignup {
    pub name: PersonName,
    pub email: Email,
    pub password: Zeroizing<String>,
    pub roles: Roles,
    pub phone: PhoneNumber,
    pub address: PostalAddress,
    pub location: GeoPoint,
    pub profile_image: Option<String>,
}

/// Accumulates field failures while validating a command.
#[derive(Debug, Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn check<T>(&mut self, field: &str, result: Result<T, UserValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.0.push(FieldViolation::new(field, err.to_string()));
                None
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldViolation>> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self.0)
        }
    }
}

fn latitude(value: Option<f64>) -> Result<f64, UserValidationError> {
    value
        .filter(|lat| lat.is_finite() && (-90.0..=90.0).contains(lat))
        .ok_or(UserValidationError::InvalidLatitude)
}

fn longitude(value: Option<f64>) -> Result<f64, UserValidationError> {
    value
        .filter(|lng| lng.is_finite() && (-180.0..=180.0).contains(lng))
        .ok_or(UserValidationError::InvalidLongitude)
}

fn location(
    violations: &mut Violations,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Option<GeoPoint> {
    let lat = violations.check("latitude", latitude(lat));
    let lng = violations.check("longitude", longitude(lng));
    GeoPoint::new(lat?, lng?).ok()
}

fn password(raw: &str) -> Result<(), UserValidationError> {
    if raw.chars().count() < PASSWORD_MIN {
        return Err(UserValidationError::PasswordTooShort);
    }
    Ok(())
}

impl SignupRequest {
    /// Validate every field, reporting all failures together.
    pub fn validate(self) -> Result<ValidatedSignup, Vec<FieldViolation>> {
        let mut violations = Violations::default();
        let name = violations.check("name", PersonName::new(&self.name));
        let email = violations.check("email", Email::new(&self.email));
        let password_ok = violations.check("password", password(&self.password));
        let roles = violations.check("roles", Roles::parse(self.roles.as_slice()));
        let phone = violations.check("phone", PhoneNumber::new(&self.phone));
        let address = violations.check("address", PostalAddress::new(&self.address));
        let point = location(&mut violations, self.latitude, self.longitude);

        match (name, email, password_ok, roles, phone, address, point) {
            (
                Some(name),
                Some(email),
                Some(()),
                Some(roles),
                Some(phone),
                Some(address),
                Some(location),
            ) => Ok(ValidatedSignup {
                name,
                email,
                password: self.password,
                roles,
                phone,
                address,
                location,
                profile_image: self.profile_image.filter(|url| !url.trim().is_empty()),
            }),
            _ => Err(violations.0),
        }
    }
}

/// Raw profile change; absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub profile_image: Option<String>,
}

impl ProfileUpdateRequest {
    /// Validate the fields present in the request.
    ///
    /// The location only changes when both coordinates are supplied.
    pub fn validate(self) -> Result<ProfileUpdate, Vec<FieldViolation>> {
        let mut violations = Violations::default();
        let name = self
            .name
            .and_then(|raw| violations.check("name", PersonName::new(raw)));
        let phone = self
            .phone
            .and_then(|raw| violations.check("phone", PhoneNumber::new(raw)));
        let address = self
            .address
            .and_then(|raw| violations.check("address", PostalAddress::new(raw)));
        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => location(&mut violations, Some(lat), Some(lng)),
            _ => None,
        };
        let update = ProfileUpdate {
            name,
            phone,
            address,
            location,
            profile_image: self.profile_image.filter(|url| !url.trim().is_empty()),
        };
        violations.finish(update)
    }
}

/// Claims carried by API access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user id.
    pub sub: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<UserId, UserValidationError> {
        UserId::new(&self.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn signup() -> SignupRequest {
        SignupRequest {
            name: "Helping Hands".into(),
            email: "Help@Example.org".into(),
            password: Zeroizing::new("secret1".into()),
            roles: vec!["ngo".into()],
            phone: "9876543210".into(),
            address: "4 River Lane, Pune".into(),
            latitude: Some(18.52),
            longitude: Some(73.85),
            profile_image: None,
        }
    }

    fn fields(violations: &[FieldViolation]) -> Vec<&str> {
        violations.iter().map(|v| v.field.as_str()).collect()
    }

    #[rstest]
    #[case("", "pw", LoginValidationError::InvalidEmail)]
    #[case("not-an-email", "pw", LoginValidationError::InvalidEmail)]
    #[case("user@example.org", "", LoginValidationError::EmptyPassword)]
    fn invalid_credentials(
        #[case] email: &str,
        #[case] password: &str,
        #[case] expected: LoginValidationError,
    ) {
        let err = LoginCredentials::try_from_parts(email, password)
            .expect_err("invalid inputs must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn valid_signup_normalises_fields(signup: SignupRequest) {
        let validated = signup.validate().expect("valid signup");
        assert_eq!(validated.email.as_ref(), "help@example.org");
        assert_eq!(validated.roles.as_slice(), &[crate::domain::Role::Ngo]);
        assert_eq!(validated.location.longitude(), 73.85);
    }

    #[rstest]
    fn signup_reports_every_failing_field() {
        let request = SignupRequest {
            name: "A".into(),
            email: "nope".into(),
            password: Zeroizing::new("123".into()),
            roles: vec![],
            phone: "123".into(),
            address: "x".into(),
            latitude: Some(91.0),
            longitude: None,
            profile_image: None,
        };
        let violations = request.validate().expect_err("invalid signup");
        assert_eq!(
            fields(&violations),
            [
                "name",
                "email",
                "password",
                "roles",
                "phone",
                "address",
                "latitude",
                "longitude"
            ]
        );
        assert_eq!(violations[3].message, "At least one role must be selected");
        assert_eq!(violations[6].message, "Valid latitude required");
    }

    #[rstest]
    fn unknown_role_is_reported(mut signup: SignupRequest) {
        signup.roles = vec!["vendor".into(), "admin".into()];
        let violations = signup.validate().expect_err("invalid role");
        assert_eq!(violations, vec![FieldViolation::new("roles", "Invalid role")]);
    }

    #[rstest]
    fn profile_update_ignores_lone_coordinate() {
        let update = ProfileUpdateRequest {
            latitude: Some(12.0),
            ..ProfileUpdateRequest::default()
        }
        .validate()
        .expect("valid update");
        assert!(update.location.is_none());
    }

    #[rstest]
    fn profile_update_validates_present_fields() {
        let violations = ProfileUpdateRequest {
            name: Some("x".into()),
            latitude: Some(12.0),
            longitude: Some(200.0),
            ..ProfileUpdateRequest::default()
        }
        .validate()
        .expect_err("invalid update");
        assert_eq!(fields(&violations), ["name", "longitude"]);
    }

    #[rstest]
    fn claims_expose_user_id() {
        let id = UserId::random();
        let claims = AccessClaims {
            sub: id.to_string(),
            iat: 0,
            exp: 1,
        };
        assert_eq!(claims.user_id(), Ok(id));
    }
}
