//! Great-circle distance between coordinates

use crate::domain::types::Location;

pub const STATUTE_MILES_PER_NAUTICAL_MILE: f64 = 1.15077945;

/// Nautical miles per degree of arc
const NAUTICAL_MILES_PER_DEGREE: f64 = 60.0;

/// Distance in statute miles using the spherical law of cosines.
///
/// The arc-cosine argument is clamped to [-1, 1] so identical and antipodal
/// points never produce NaN.
pub fn distance_miles(a: &Location, b: &Location) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lon1 = a.longitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let lon2 = b.longitude.to_radians();

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).abs().cos();
    let angle = cos_angle.clamp(-1.0, 1.0).acos();

    let nautical_miles = NAUTICAL_MILES_PER_DEGREE * angle.to_degrees();
    STATUTE_MILES_PER_NAUTICAL_MILE * nautical_miles
}

/// Check if two coordinates are within `radius_miles` of each other
#[inline]
pub fn is_within(a: &Location, b: &Location, radius_miles: f64) -> bool {
    distance_miles(a, b) <= radius_miles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_points_are_zero() {
        let points = [
            Location::new(0.0, 0.0),
            Location::new(33.817595, -117.922008),
            Location::new(-85.05112878, 179.999),
            Location::new(61.218887, -149.877502),
        ];
        for p in &points {
            assert_eq!(distance_miles(p, p), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let points = [
            Location::new(33.817595, -117.922008),
            Location::new(40.741112, -73.989723),
            Location::new(-33.8688, 151.2093),
            Location::new(0.0, 180.0),
            Location::new(0.0, -180.0),
        ];
        for a in &points {
            for b in &points {
                assert_eq!(distance_miles(a, b), distance_miles(b, a));
            }
        }
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(0.0, 180.0);
        let d = distance_miles(&a, &b);
        assert!(d.is_finite());
        // Half the circumference: 180 degrees * 60 nm
        let expected = 180.0 * 60.0 * STATUTE_MILES_PER_NAUTICAL_MILE;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = Location::new(10.0, 20.0);
        let b = Location::new(11.0, 20.0);
        let expected = 60.0 * STATUTE_MILES_PER_NAUTICAL_MILE;
        assert!((distance_miles(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_is_within() {
        let disneyland = Location::new(33.817595, -117.922008);
        let nearby = Location::new(33.83, -117.92);
        let new_york = Location::new(40.741112, -73.989723);
        assert!(is_within(&disneyland, &nearby, 10.0));
        assert!(!is_within(&disneyland, &new_york, 200.0));
    }
}
