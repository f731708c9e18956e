//! Geographic primitives for proximity search.
//!
//! Points are stored as plain latitude/longitude columns. Nearby searches
//! narrow candidates with a [`BoundingBox`] in SQL and then refine them with
//! the great-circle distance computed here. The prefilter is never capped:
//! the box is larger than the circle, so a cap there could drop records that
//! are inside the radius.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean earth radius used by the haversine formula, in metres.
pub const EARTH_RADIUS_METRES: f64 = 6_371_008.8;
/// Default radius for "nearby" queries.
pub const NEARBY_RADIUS_METRES: f64 = 50_000.0;
/// Upper bound on the number of records a nearby query returns or counts.
pub const NEARBY_RESULT_LIMIT: usize = 1000;

/// Validation errors for [`GeoPoint`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeoValidationError {
    #[error("latitude must be a finite value between -90 and 90, got {0}")]
    Latitude(f64),
    #[error("longitude must be a finite value between -180 and 180, got {0}")]
    Longitude(f64),
}

/// WGS84 coordinate pair.
///
/// # Examples
/// ```
/// use prakriti_backend::domain::GeoPoint;
///
/// let delhi = GeoPoint::new(28.6139, 77.2090).expect("valid point");
/// let noida = GeoPoint::new(28.5355, 77.3910).expect("valid point");
/// let km = delhi.distance_metres(&noida) / 1000.0;
/// assert!((19.0..21.0).contains(&km));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", try_from = "RawPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = GeoValidationError;

    fn try_from(value: RawPoint) -> Result<Self, Self::Error> {
        Self::new(value.latitude, value.longitude)
    }
}

impl GeoPoint {
    /// Validate and construct a point.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoValidationError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoValidationError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` using the haversine formula.
    pub fn distance_metres(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let d_phi = (other.latitude - self.latitude).to_radians();
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_METRES * c
    }

    /// Smallest latitude/longitude box enclosing the circle of
    /// `radius_metres` around this point.
    ///
    /// Near the poles, or when the circle crosses the antimeridian, the box
    /// spans the full longitude range so no candidate is dropped.
    pub fn bounding_box(&self, radius_metres: f64) -> BoundingBox {
        let angular = (radius_metres / EARTH_RADIUS_METRES).to_degrees();
        let min_latitude = (self.latitude - angular).max(-90.0);
        let max_latitude = (self.latitude + angular).min(90.0);

        let full_longitude = (-180.0, 180.0);
        let (min_longitude, max_longitude) = if min_latitude <= -90.0 || max_latitude >= 90.0 {
            full_longitude
        } else {
            let cos_lat = self.latitude.to_radians().cos();
            let delta = if cos_lat <= f64::EPSILON {
                360.0
            } else {
                angular / cos_lat
            };
            let west = self.longitude - delta;
            let east = self.longitude + delta;
            if west < -180.0 || east > 180.0 {
                full_longitude
            } else {
                (west, east)
            }
        };

        BoundingBox {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }
}

/// Axis-aligned latitude/longitude window used as a coarse SQL prefilter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Whether the point lies inside the box, edges included.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

/// Centre and radius for a proximity search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    pub centre: GeoPoint,
    pub radius_metres: f64,
}

impl Proximity {
    /// Search around `centre` using the default nearby radius.
    pub fn nearby(centre: GeoPoint) -> Self {
        Self {
            centre,
            radius_metres: NEARBY_RADIUS_METRES,
        }
    }

    /// Search with an explicit radius in kilometres.
    ///
    /// Non-positive or non-finite radii fall back to the default.
    pub fn with_radius_km(centre: GeoPoint, radius_km: Option<f64>) -> Self {
        let radius_metres = radius_km
            .filter(|km| km.is_finite() && *km > 0.0)
            .map_or(NEARBY_RADIUS_METRES, |km| km * 1000.0);
        Self {
            centre,
            radius_metres,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.centre.bounding_box(self.radius_metres)
    }

    /// Distance from the centre when `point` is inside the radius.
    pub fn distance_to(&self, point: &GeoPoint) -> Option<f64> {
        let distance = self.centre.distance_metres(point);
        (distance <= self.radius_metres).then_some(distance)
    }

    /// The [`NEARBY_RESULT_LIMIT`] closest candidates inside the radius,
    /// paired with their distance in metres, closest first.
    ///
    /// `candidates` must not be truncated beforehand.
    ///
    /// # Examples
    /// ```
    /// use prakriti_backend::domain::{GeoPoint, Proximity};
    ///
    /// let centre = GeoPoint::new(18.5204, 73.8567).expect("valid point");
    /// let far = GeoPoint::new(18.90, 74.30).expect("valid point");
    /// let near = GeoPoint::new(18.53, 73.86).expect("valid point");
    /// let found = Proximity::nearby(centre).nearest(vec![far, near], |p| *p);
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(found[0].0, near);
    /// ```
    pub fn nearest<T>(
        &self,
        candidates: impl IntoIterator<Item = T>,
        location: impl Fn(&T) -> GeoPoint,
    ) -> Vec<(T, f64)> {
        let mut found: Vec<(T, f64)> = candidates
            .into_iter()
            .filter_map(|candidate| {
                self.distance_to(&location(&candidate))
                    .map(|metres| (candidate, metres))
            })
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found.truncate(NEARBY_RESULT_LIMIT);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn point(latitude: f64, longitude: f64) -> GeoPoint {
        GeoPoint::new(latitude, longitude).expect("valid point")
    }

    #[rstest]
    #[case(90.5, 0.0)]
    #[case(-91.0, 0.0)]
    #[case(0.0, 180.1)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn rejects_out_of_range_coordinates(#[case] latitude: f64, #[case] longitude: f64) {
        assert!(GeoPoint::new(latitude, longitude).is_err());
    }

    #[rstest]
    fn distance_between_identical_points_is_zero() {
        let p = point(12.97, 77.59);
        assert!(p.distance_metres(&p).abs() < 1e-6);
    }

    #[rstest]
    fn one_degree_of_latitude_is_about_111_km() {
        let km = point(0.0, 0.0).distance_metres(&point(1.0, 0.0)) / 1000.0;
        assert!((111.0..111.4).contains(&km), "got {km}");
    }

    #[rstest]
    #[case(point(19.0760, 72.8777), point(19.2183, 72.9781), true)]
    #[case(point(19.0760, 72.8777), point(18.5204, 73.8567), false)]
    fn nearby_respects_fifty_km(#[case] a: GeoPoint, #[case] b: GeoPoint, #[case] near: bool) {
        assert_eq!(Proximity::nearby(a).distance_to(&b).is_some(), near);
    }

    #[rstest]
    fn nearest_keeps_the_closest_records_when_the_box_overflows() {
        let centre = point(18.5, 73.85);
        let proximity = Proximity::nearby(centre);
        let bbox = proximity.bounding_box();
        let corner = point(bbox.max_latitude - 0.01, bbox.max_longitude - 0.01);
        assert!(bbox.contains(&corner));
        assert!(proximity.distance_to(&corner).is_none());

        let mut candidates = vec![corner; NEARBY_RESULT_LIMIT + 50];
        let line = (0..NEARBY_RESULT_LIMIT).map(|i| point(18.5 + 0.0001 * i as f64, 73.85));
        candidates.extend(line);
        candidates.push(point(18.5, 73.8515));

        let found = proximity.nearest(candidates, |p| *p);
        assert_eq!(found.len(), NEARBY_RESULT_LIMIT);
        assert!(found.iter().all(|(_, metres)| *metres <= NEARBY_RADIUS_METRES));
        assert!(found.windows(2).all(|pair| pair[0].1 <= pair[1].1));
        assert_eq!(found[0].0, centre);
        assert!(found.iter().any(|(p, _)| *p == point(18.5, 73.8515)));
    }

    #[rstest]
    fn bounding_box_encloses_circle_edge() {
        let centre = point(45.0, 10.0);
        let bbox = centre.bounding_box(NEARBY_RADIUS_METRES);
        let north = point(bbox.max_latitude - 1e-9, 10.0);
        assert!(bbox.contains(&north));
        assert!((centre.distance_metres(&north) - NEARBY_RADIUS_METRES).abs() < 10.0);
        assert!(bbox.min_longitude < 10.0 && bbox.max_longitude > 10.0);
    }

    #[rstest]
    #[case(point(89.9, 0.0))]
    #[case(point(0.0, 179.9))]
    #[case(point(0.0, -179.9))]
    fn bounding_box_widens_near_poles_and_antimeridian(#[case] centre: GeoPoint) {
        let bbox = centre.bounding_box(NEARBY_RADIUS_METRES);
        assert_eq!((bbox.min_longitude, bbox.max_longitude), (-180.0, 180.0));
    }

    #[rstest]
    #[case(None, NEARBY_RADIUS_METRES)]
    #[case(Some(10.0), 10_000.0)]
    #[case(Some(0.0), NEARBY_RADIUS_METRES)]
    #[case(Some(-5.0), NEARBY_RADIUS_METRES)]
    fn proximity_radius_defaults(#[case] km: Option<f64>, #[case] expected: f64) {
        let proximity = Proximity::with_radius_km(point(0.0, 0.0), km);
        assert_eq!(proximity.radius_metres, expected);
    }

    #[rstest]
    fn deserialisation_validates_range() {
        let bad = serde_json::json!({"latitude": 100.0, "longitude": 0.0});
        assert!(serde_json::from_value::<GeoPoint>(bad).is_err());
        let good = serde_json::json!({"latitude": 10.0, "longitude": 20.0});
        let parsed: GeoPoint = serde_json::from_value(good).expect("valid point");
        assert_eq!(parsed, point(10.0, 20.0));
    }
}
