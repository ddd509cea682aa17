//! Deterministic placement of addresses that could not be resolved.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::{
    entities::{address::*, geo::*, resolution::*, zone::*},
    error::Error,
};

pub const DEFAULT_ZONE_NAME: &str = "Inconnu";

/// `(name, center lat, center lng, spread lat, spread lng)`
const DEFAULT_ZONES: &[(&str, f64, f64, f64, f64)] = &[
    ("Centre-Plage", 46.4950, -1.7750, 0.015, 0.015),
    ("Promenade Mer", 46.4980, -1.7600, 0.010, 0.005),
    ("Olonne Est", 46.4850, -1.7700, 0.020, 0.020),
    ("Olonne Centre", 46.4900, -1.7850, 0.015, 0.015),
    ("Olonne Nord", 46.5100, -1.7800, 0.020, 0.025),
    ("Ouest", 46.4950, -1.8000, 0.020, 0.015),
    ("Nord", 46.5200, -1.7800, 0.025, 0.020),
    ("Sud", 46.4750, -1.7800, 0.015, 0.020),
    (DEFAULT_ZONE_NAME, 46.4959, -1.7842, 0.050, 0.050),
];

const DEFAULT_STREET_ZONES: &[(&str, &str)] = &[
    ("RUE CLEMENCEAU", "Centre-Plage"),
    ("RUE JEAN JAURES", "Centre-Plage"),
    ("RUE GAMBETTA", "Centre-Plage"),
    ("RUE VOLTAIRE", "Centre-Plage"),
    ("RUE JOFFRE", "Centre-Plage"),
    ("BOULEVARD GUILLAUME", "Centre-Plage"),
    ("BOULEVARD DE L OCEAN", "Promenade Mer"),
    ("AVENUE MOLIERE", "Promenade Mer"),
    ("RUE DE LA PAIX", "Promenade Mer"),
    ("RUE DES AMARYLLIS", "Olonne Est"),
    ("RUE DES PENSEES", "Olonne Est"),
    ("RUE DES FAUVETTES", "Olonne Est"),
    ("RUE DES OEILLETS", "Olonne Est"),
    ("RUE DOCTEUR CHARCOT", "Olonne Centre"),
    ("RUE CLAUDE BERNARD", "Olonne Centre"),
    ("RUE DE VERDUN", "Olonne Nord"),
    ("ALLEE AIME FRANCOIS", "Olonne Nord"),
];

pub fn default_zones() -> Vec<Zone> {
    DEFAULT_ZONES
        .iter()
        .map(|(name, lat, lng, spread_lat, spread_lng)| {
            Zone::new(*name, Coordinate::new(*lat, *lng), *spread_lat, *spread_lng)
        })
        .collect()
}

pub fn default_street_zones() -> Vec<(String, String)> {
    DEFAULT_STREET_ZONES
        .iter()
        .map(|(street, zone)| ((*street).to_owned(), (*zone).to_owned()))
        .collect()
}

/// Stable 64-bit hash: the first 8 bytes of the SHA-256 digest, big-endian.
pub fn stable_hash(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Maps a hash to `[0, 1)` using its upper 53 bits.
fn unit_fraction(hash: u64) -> f64 {
    (hash >> 11) as f64 / (1u64 << 53) as f64
}

/// Apostrophes and spaces are treated alike when street names are compared.
pub(crate) fn match_key(street: &str) -> String {
    street.replace(['\'', '’'], " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct Synthesizer {
    zones: Vec<Zone>,
    default_zone: usize,
    street_zones: Vec<(String, usize)>,
}

impl Default for Synthesizer {
    fn default() -> Self {
        let zones = default_zones();
        let default_zone = zones.len() - 1;
        let street_zones = DEFAULT_STREET_ZONES
            .iter()
            .filter_map(|(street, zone)| {
                zones
                    .iter()
                    .position(|z| z.name == *zone)
                    .map(|idx| (match_key(street), idx))
            })
            .collect();
        Self {
            zones,
            default_zone,
            street_zones,
        }
    }
}

impl Synthesizer {
    pub fn try_new(
        zones: Vec<Zone>,
        default_zone: &str,
        street_zones: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, Error> {
        if zones.is_empty() {
            return Err(Error::NoZones);
        }
        let index: HashMap<&str, usize> = zones
            .iter()
            .enumerate()
            .map(|(idx, z)| (z.name.as_str(), idx))
            .collect();
        let default_zone = *index
            .get(default_zone)
            .ok_or_else(|| Error::UnknownZone(default_zone.to_owned()))?;
        let street_zones = street_zones
            .into_iter()
            .map(|(street, zone)| {
                index
                    .get(zone.as_str())
                    .map(|idx| (match_key(&street.to_uppercase()), *idx))
                    .ok_or(Error::UnknownZone(zone))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            zones,
            default_zone,
            street_zones,
        })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn default_zone(&self) -> &Zone {
        &self.zones[self.default_zone]
    }

    /// The zone a street is assigned to.
    ///
    /// Well-known streets are looked up by substring, all others are
    /// distributed by hash over the non-default zones.
    pub fn zone_of(&self, street_key: &str) -> &Zone {
        if street_key == UNKNOWN_STREET {
            return self.default_zone();
        }
        let key = match_key(street_key);
        if let Some((_, idx)) = self
            .street_zones
            .iter()
            .find(|(street, _)| key.contains(street.as_str()))
        {
            return &self.zones[*idx];
        }
        let candidates = self.zones.len() - 1;
        if candidates == 0 {
            return self.default_zone();
        }
        let mut idx = (stable_hash(&key) % candidates as u64) as usize;
        if idx >= self.default_zone {
            idx += 1;
        }
        &self.zones[idx]
    }

    /// A coordinate inside the zone of the address, derived from the
    /// address alone.
    pub fn synthesize(&self, addr: &NormalizedAddress) -> Resolved {
        let zone = self.zone_of(&addr.street_key);
        let seed = addr.query();
        let f_lat = unit_fraction(stable_hash(&format!("lat:{seed}")));
        let f_lng = unit_fraction(stable_hash(&format!("lng:{seed}")));
        Resolved::new(zone.position(f_lat, f_lng), Provenance::Synthetic)
    }
}
