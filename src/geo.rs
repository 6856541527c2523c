//! Coordinates, bounding boxes and great-circle distance

/// Mean Earth radius in meters (IUGG)
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 point stored with 32-bit precision
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub lat: f32,
    pub lon: f32,
}

impl Coordinate {
    pub fn new(lat: f32, lon: f32) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters
    pub fn distance_to(&self, other: &Coordinate) -> f32 {
        haversine_distance(
            self.lat as f64,
            self.lon as f64,
            other.lat as f64,
            other.lon as f64,
        ) as f32
    }

    /// Point halfway between `self` and `other` in coordinate space
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate {
            lat: ((self.lat as f64 + other.lat as f64) / 2.0) as f32,
            lon: ((self.lon as f64 + other.lon as f64) / 2.0) as f32,
        }
    }
}

/// Haversine distance in meters between two lat/lon pairs in degrees
pub fn haversine_distance(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let delta_lat = (lat2_deg - lat1_deg).to_radians();
    let delta_lon = (lon2_deg - lon1_deg).to_radians();

    let a =
        (delta_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Sum of the segment distances along a polyline
pub fn polyline_distance(points: &[Coordinate]) -> f32 {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum()
}

/// Axis-aligned lat/lon box, inclusive on every side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Degenerate box around a single point
    pub fn from_point(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, lat, lon)
    }

    /// Grow the box so it contains the point
    pub fn expand(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lat = self.max_lat.max(lat);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Box grown by `margin` degrees on every side
    pub fn padded(&self, margin: f64) -> Self {
        Self::new(
            self.min_lat - margin,
            self.min_lon - margin,
            self.max_lat + margin,
            self.max_lon + margin,
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.2 km everywhere
        let d = haversine_distance(50.0, 4.0, 51.0, 4.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_polyline_distance_sums_segments() {
        let a = Coordinate::new(50.0, 4.0);
        let b = Coordinate::new(50.001, 4.0);
        let c = Coordinate::new(50.002, 4.0);
        let total = polyline_distance(&[a, b, c]);
        let direct = a.distance_to(&c);
        assert!((total - direct).abs() < 0.01);
    }

    #[test]
    fn test_bounding_box_expand_and_contains() {
        let mut bbox = BoundingBox::from_point(1.0, 1.0);
        bbox.expand(2.0, -1.0);
        assert!(bbox.contains(1.5, 0.0));
        assert!(bbox.contains(2.0, 1.0));
        assert!(!bbox.contains(2.1, 0.0));
        assert_eq!(bbox.center(), (1.5, 0.0));

        let padded = bbox.padded(0.5);
        assert!(padded.contains(2.4, 1.4));
    }
}
