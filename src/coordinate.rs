/// A WGS84 (EPSG:4326) decimal-degree coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `false` for anything outside the WGS84 domain. Callers must treat
    /// an invalid coordinate as a no-data query, not a fault.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A tile's extent in WGS84, `(latMin, latMax, lngMin, lngMax)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl Footprint {
    /// Swaps min/max on the fly rather than panicking: a raster with a
    /// skewed or flipped geotransform could otherwise produce a footprint
    /// that is not index-able.
    pub fn new(lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64) -> Self {
        let (lat_min, lat_max) = Self::ordered(lat_min, lat_max);
        let (lng_min, lng_max) = Self::ordered(lng_min, lng_max);
        Self {
            lat_min,
            lat_max,
            lng_min,
            lng_max,
        }
    }

    fn ordered(a: f64, b: f64) -> (f64, f64) {
        if a <= b {
            (a, b)
        } else {
            log::warn!("footprint min/max were inverted ({a}, {b}), swapping");
            (b, a)
        }
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.lat >= self.lat_min && coord.lat <= self.lat_max && coord.lng >= self.lng_min && coord.lng <= self.lng_max
    }
}
