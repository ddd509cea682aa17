//! Placement along configured street segments, without any live lookup.

use crate::{
    entities::{address::*, geo::*, resolution::*},
    synthesize::match_key,
};

/// House numbers are assumed to run up to this value along a segment.
pub const MAX_HOUSE_NUMBER: f64 = 200.0;

/// Lateral offset in degrees of latitude between the two sides of a street.
pub const SIDE_OFFSET: f64 = 0.00015;

/// `(street, start lat, start lng, end lat, end lng)`
const DEFAULT_SEGMENTS: &[(&str, f64, f64, f64, f64)] = &[
    ("RUE DES AMARYLLIS", 46.4930, -1.7920, 46.4945, -1.7900),
    ("RUE DES PENSEES", 46.4920, -1.7880, 46.4960, -1.7840),
    ("RUE DES FAUVETTES", 46.4950, -1.7800, 46.4970, -1.7760),
    ("RUE DES OEILLETS", 46.4980, -1.7750, 46.5010, -1.7700),
    ("IMPASSE DES JACINTHES", 46.5020, -1.7650, 46.5040, -1.7620),
    ("RUE DES BLEUETS", 46.4890, -1.7750, 46.4920, -1.7700),
    ("RUE DES RESEDAS", 46.4860, -1.7800, 46.4890, -1.7750),
    ("RUE DES RAVENELLES", 46.4850, -1.7850, 46.4880, -1.7800),
    ("RUE DOCTEUR CHARCOT", 46.5050, -1.7650, 46.5150, -1.7550),
    ("RUE DE LA TONNELLE", 46.4950, -1.7950, 46.5000, -1.7900),
    ("RUE DES RENONCULES", 46.4900, -1.7600, 46.4930, -1.7550),
    ("IMPASSE DES LYS", 46.4860, -1.7650, 46.4890, -1.7620),
    ("IMPASSE MARIE LOUISE", 46.5000, -1.7700, 46.5020, -1.7680),
    ("RUE CLAUDE BERNARD", 46.5050, -1.7750, 46.5100, -1.7700),
    ("RUE CLEMENCEAU", 46.5000, -1.7800, 46.5050, -1.7750),
    ("RUE JEAN JAURES", 46.4950, -1.7700, 46.5000, -1.7650),
    ("BOULEVARD DE L OCEAN", 46.4950, -1.7600, 46.5000, -1.7400),
    ("RUE VOLTAIRE", 46.5000, -1.7750, 46.5050, -1.7700),
    ("RUE GAMBETTA", 46.4900, -1.7850, 46.4950, -1.7800),
    ("RUE DE LA PAIX", 46.4850, -1.7900, 46.4900, -1.7850),
    ("AVENUE MOLIERE", 46.5100, -1.7800, 46.5150, -1.7750),
    ("RUE DE VERDUN", 46.4800, -1.7750, 46.4850, -1.7700),
    ("RUE JOFFRE", 46.5050, -1.7900, 46.5100, -1.7850),
    ("BOULEVARD GUILLAUME", 46.4950, -1.7850, 46.5000, -1.7800),
    ("RUE DES DUNES", 46.5000, -1.7400, 46.5050, -1.7350),
];

#[derive(Debug, Clone, PartialEq)]
pub struct StreetSegment {
    pub street: String,
    pub start: Coordinate,
    pub end: Coordinate,
}

impl StreetSegment {
    pub fn new(street: impl Into<String>, start: Coordinate, end: Coordinate) -> Self {
        Self {
            street: street.into(),
            start,
            end,
        }
    }

    /// Even numbers are placed on one side, odd numbers on the other.
    pub fn position(&self, house_number: HouseNumber) -> Coordinate {
        let progress = (f64::from(house_number) / MAX_HOUSE_NUMBER).min(1.0);
        let side = if house_number % 2 == 0 {
            SIDE_OFFSET
        } else {
            -SIDE_OFFSET
        };
        self.start
            .lerp(&self.end, progress)
            .offset(side, side * 0.5)
    }
}

pub fn default_segments() -> Vec<StreetSegment> {
    DEFAULT_SEGMENTS
        .iter()
        .map(|(street, lat0, lng0, lat1, lng1)| {
            StreetSegment::new(
                *street,
                Coordinate::new(*lat0, *lng0),
                Coordinate::new(*lat1, *lng1),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct StreetTable {
    segments: Vec<(String, StreetSegment)>,
}

impl StreetTable {
    pub fn new(segments: impl IntoIterator<Item = StreetSegment>) -> Self {
        let segments = segments
            .into_iter()
            .map(|s| (match_key(&s.street.to_uppercase()), s))
            .collect();
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Exact match first, then the first segment whose name contains the
    /// street or is contained in it.
    pub fn find(&self, street_key: &str) -> Option<&StreetSegment> {
        if street_key == UNKNOWN_STREET {
            return None;
        }
        let key = match_key(street_key);
        if key.is_empty() {
            return None;
        }
        self.segments
            .iter()
            .find(|(name, _)| *name == key)
            .or_else(|| {
                self.segments
                    .iter()
                    .find(|(name, _)| key.contains(name.as_str()) || name.contains(key.as_str()))
            })
            .map(|(_, segment)| segment)
    }

    pub fn locate(&self, addr: &NormalizedAddress) -> Option<Resolved> {
        self.find(&addr.street_key).map(|segment| {
            Resolved::new(
                segment.position(addr.house_number),
                Provenance::Interpolated,
            )
        })
    }
}
