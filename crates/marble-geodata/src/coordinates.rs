//! Geographic coordinates and lat/lon/alt bounding boxes

use geo::Rect;

/// A position on the globe: longitude and latitude in degrees, altitude in meters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
    pub alt: f64,
}

impl Coordinates {
    pub const fn new(lon: f64, lat: f64, alt: f64) -> Self {
        Self { lon, lat, alt }
    }

    pub fn from_radians(lon: f64, lat: f64, alt: f64) -> Self {
        Self::new(lon.to_degrees(), lat.to_degrees(), alt)
    }

    pub fn lon_rad(&self) -> f64 {
        self.lon.to_radians()
    }

    pub fn lat_rad(&self) -> f64 {
        self.lat.to_radians()
    }

    /// Decimal notation, e.g. `" 13.400°E,  52.520°N"`
    pub fn to_decimal_string(&self) -> String {
        let ew = if self.lon < 0.0 { 'W' } else { 'E' };
        let ns = if self.lat < 0.0 { 'S' } else { 'N' };
        format!(
            "{:8.3}°{}, {:7.3}°{}",
            self.lon.abs(),
            ew,
            self.lat.abs(),
            ns
        )
    }
}

impl From<geo::Point<f64>> for Coordinates {
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.x(), point.y(), 0.0)
    }
}

/// Axis-aligned box in lon/lat degrees with an altitude range
///
/// An empty box is the identity for [`LatLonAltBox::united`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonAltBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
}

impl Default for LatLonAltBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl LatLonAltBox {
    pub const fn empty() -> Self {
        Self {
            north: f64::NEG_INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            west: f64::INFINITY,
            min_altitude: 0.0,
            max_altitude: 0.0,
        }
    }

    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
            min_altitude: 0.0,
            max_altitude: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.north < self.south || self.east < self.west
    }

    pub fn from_coordinates<'a, I>(coords: I) -> Self
    where
        I: IntoIterator<Item = &'a Coordinates>,
    {
        let mut result = Self::empty();
        let mut first = true;
        for c in coords {
            result.north = result.north.max(c.lat);
            result.south = result.south.min(c.lat);
            result.east = result.east.max(c.lon);
            result.west = result.west.min(c.lon);
            if first {
                result.min_altitude = c.alt;
                result.max_altitude = c.alt;
                first = false;
            } else {
                result.min_altitude = result.min_altitude.min(c.alt);
                result.max_altitude = result.max_altitude.max(c.alt);
            }
        }
        result
    }

    /// Union of two boxes
    pub fn united(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            north: self.north.max(other.north),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            west: self.west.min(other.west),
            min_altitude: self.min_altitude.min(other.min_altitude),
            max_altitude: self.max_altitude.max(other.max_altitude),
        }
    }

    pub fn contains(&self, c: &Coordinates) -> bool {
        !self.is_empty()
            && c.lat <= self.north
            && c.lat >= self.south
            && c.lon <= self.east
            && c.lon >= self.west
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.east + self.west) / 2.0,
            (self.north + self.south) / 2.0,
            (self.min_altitude + self.max_altitude) / 2.0,
        )
    }

    /// Planar rectangle with x = longitude and y = latitude; `None` for an empty box
    pub fn to_rect(&self) -> Option<Rect<f64>> {
        if self.is_empty() {
            return None;
        }
        Some(Rect::new(
            geo::Coord {
                x: self.west,
                y: self.south,
            },
            geo::Coord {
                x: self.east,
                y: self.north,
            },
        ))
    }
}

impl From<Rect<f64>> for LatLonAltBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.max().y, rect.min().y, rect.max().x, rect.min().x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_box_is_union_identity() {
        let b = LatLonAltBox::new(10.0, -10.0, 20.0, -20.0);
        assert_eq!(LatLonAltBox::empty().united(&b), b);
        assert_eq!(b.united(&LatLonAltBox::empty()), b);
        assert!(LatLonAltBox::empty().is_empty());
    }

    #[test]
    fn test_from_coordinates() {
        let coords = [
            Coordinates::new(1.0, 2.0, 100.0),
            Coordinates::new(-3.0, 5.0, 50.0),
        ];
        let b = LatLonAltBox::from_coordinates(&coords);
        assert_eq!((b.north, b.south, b.east, b.west), (5.0, 2.0, 1.0, -3.0));
        assert_eq!((b.min_altitude, b.max_altitude), (50.0, 100.0));
        assert!(b.contains(&Coordinates::new(0.0, 3.0, 0.0)));
        assert!(!b.contains(&Coordinates::new(2.0, 3.0, 0.0)));
    }

    #[test]
    fn test_rect_conversion() {
        let b = LatLonAltBox::new(50.0, 40.0, 10.0, 0.0);
        let rect = b.to_rect().unwrap();
        assert_eq!(LatLonAltBox::from(rect), b);
        assert!(LatLonAltBox::empty().to_rect().is_none());
    }

    #[test]
    fn test_decimal_string() {
        let text = Coordinates::new(-13.4, 52.52, 0.0).to_decimal_string();
        assert_eq!(text.trim(), "13.400°W,  52.520°N");
    }
}
