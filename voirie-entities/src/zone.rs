use crate::geo::*;

/// A coarse named area of the municipality.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub name: String,
    pub center: Coordinate,
    /// Full extent in degrees of latitude.
    pub spread_lat: f64,
    /// Full extent in degrees of longitude.
    pub spread_lng: f64,
}

impl Zone {
    pub fn new(name: impl Into<String>, center: Coordinate, spread_lat: f64, spread_lng: f64) -> Self {
        Self {
            name: name.into(),
            center,
            spread_lat: spread_lat.abs(),
            spread_lng: spread_lng.abs(),
        }
    }

    /// Position at the relative offsets `f_lat`, `f_lng` (both in `[0, 1]`) within the zone.
    pub fn position(&self, f_lat: f64, f_lng: f64) -> Coordinate {
        debug_assert!((0.0..=1.0).contains(&f_lat));
        debug_assert!((0.0..=1.0).contains(&f_lng));
        self.center.offset(
            (f_lat - 0.5) * self.spread_lat,
            (f_lng - 0.5) * self.spread_lng,
        )
    }

    pub fn contains(&self, pos: &Coordinate) -> bool {
        (pos.lat - self.center.lat).abs() <= self.spread_lat / 2.0
            && (pos.lng - self.center.lng).abs() <= self.spread_lng / 2.0
    }
}
