use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance using the haversine formula.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Lat/lng box that contains every point within `radius_km`. Used as a
    /// cheap SQL prefilter before the exact distance check.
    ///
    /// The longitude span wraps across the antimeridian, and a circle that
    /// reaches a pole covers every longitude.
    pub fn bounding_box(&self, radius_km: f64) -> BoundingBox {
        let angular = radius_km / EARTH_RADIUS_KM;
        let lat = self.lat.to_radians();
        let min_lat = lat - angular;
        let max_lat = lat + angular;
        let half_pi = std::f64::consts::FRAC_PI_2;

        if min_lat <= -half_pi || max_lat >= half_pi {
            return BoundingBox {
                min_lat: min_lat.max(-half_pi).to_degrees(),
                max_lat: max_lat.min(half_pi).to_degrees(),
                lng_ranges: Vec::new(),
            };
        }

        let d_lng = (angular.sin() / lat.cos()).clamp(-1.0, 1.0).asin().to_degrees();
        let west = self.lng - d_lng;
        let east = self.lng + d_lng;
        let lng_ranges = if d_lng >= 180.0 {
            Vec::new()
        } else if west < -180.0 {
            vec![(west + 360.0, 180.0), (-180.0, east)]
        } else if east > 180.0 {
            vec![(west, 180.0), (-180.0, east - 360.0)]
        } else {
            vec![(west, east)]
        };

        BoundingBox {
            min_lat: min_lat.to_degrees(),
            max_lat: max_lat.to_degrees(),
            lng_ranges,
        }
    }
}

/// Latitude band plus the longitude ranges inside it. No ranges means every
/// longitude matches.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub lng_ranges: Vec<(f64, f64)>,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.lng_ranges.is_empty()
                || self
                    .lng_ranges
                    .iter()
                    .any(|(west, east)| (*west..=*east).contains(&point.lng)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_lagos_to_abuja() {
        let lagos = GeoPoint::new(6.5244, 3.3792);
        let abuja = GeoPoint::new(9.0765, 7.3986);
        let d = lagos.distance_km(&abuja);
        assert!((d - 524.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = GeoPoint::new(51.5, -0.12);
        assert!(p.distance_km(&p) < 1e-9);
    }

    #[test]
    fn test_bounding_box_contains_radius() {
        let center = GeoPoint::new(40.0, -74.0);
        let bbox = center.bounding_box(10.0);
        let north = GeoPoint::new(bbox.max_lat, center.lng);
        assert!((center.distance_km(&north) - 10.0).abs() < 0.5);
        assert_eq!(bbox.lng_ranges.len(), 1);
        let (west, east) = bbox.lng_ranges[0];
        assert!(west < center.lng && east > center.lng);
        assert!(bbox.contains(&GeoPoint::new(40.05, -73.95)));
        assert!(!bbox.contains(&GeoPoint::new(40.0, -73.0)));
    }

    #[test]
    fn test_bounding_box_wraps_the_antimeridian() {
        let center = GeoPoint::new(0.0, 179.95);
        let across = GeoPoint::new(0.0, -179.95);
        assert!(center.distance_km(&across) < 25.0);

        let bbox = center.bounding_box(25.0);
        assert_eq!(bbox.lng_ranges.len(), 2);
        assert!(bbox.contains(&across));
        assert!(bbox.contains(&center));
        assert!(!bbox.contains(&GeoPoint::new(0.0, 0.0)));

        let west_side = GeoPoint::new(-10.0, -179.9).bounding_box(30.0);
        assert!(west_side.contains(&GeoPoint::new(-10.0, 179.9)));
    }

    #[test]
    fn test_bounding_box_over_a_pole_spans_all_longitudes() {
        let center = GeoPoint::new(89.9, 0.0);
        let other_side = GeoPoint::new(89.9, 180.0);
        assert!(center.distance_km(&other_side) < 25.0);

        let bbox = center.bounding_box(25.0);
        assert!(bbox.lng_ranges.is_empty());
        assert!((bbox.max_lat - 90.0).abs() < 1e-9);
        assert!(bbox.contains(&other_side));
    }

    #[test]
    fn test_validity() {
        assert!(GeoPoint::new(0.0, 0.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0).is_valid());
    }
}
