//! Turns free-text postal addresses into `(house number, street key)` pairs.
//!
//! The normalization is an ordered pipeline of small steps. Each step only
//! strips or extracts and relies on the previous steps having been applied:
//!
//! 1. [`strip_postal_code`]
//! 2. [`Normalizer::strip_locality`]
//! 3. [`strip_qualifiers`]
//! 4. [`extract_house_number`]
//! 5. [`extract_street_key`]

use lazy_static::lazy_static;
use regex::Regex;

use crate::{entities::address::*, text::normalize_whitespace};

pub const DEFAULT_LOCALITIES: &[&str] = &[
    "LES SABLES",
    "OLONNE",
    "SABLES",
    "VENDEE",
    "CHATEAU",
    "SUR MER",
];

pub const DEFAULT_MAX_STREET_NAME_LEN: usize = 80;

/// Residence, building and apartment details, most specific first.
pub const QUALIFIERS: &[&str] = &[
    "BÂTIMENT",
    "BATIMENT",
    "APPARTEMENT",
    "APARTMENT",
    "APPT",
    "RÉSIDENCE",
    "RESIDENCE",
    "RES",
    "BAT",
    "LOGEMENT",
    "ENTRÉE",
    "ENTREE",
    "ÉTAGE",
    "ETAGE",
];

pub const ROAD_TYPES: &[&str] = &[
    "RUE",
    "IMPASSE",
    "AVENUE",
    "BOULEVARD",
    "ALLEE",
    "PLACE",
    "CHEMIN",
    "ROUTE",
];

lazy_static! {
    static ref POSTAL_CODE_REGEX: Regex = Regex::new(r"\s+\d{5}\s*$").unwrap();
    static ref QUALIFIER_REGEXES: Vec<Regex> = QUALIFIERS
        .iter()
        .map(|q| Regex::new(&format!(r"(?i)\s+{}\b.*$", regex::escape(q))).unwrap())
        .collect();
    static ref HOUSE_NUMBER_REGEX: Regex = Regex::new(r"^\s*(\d+)").unwrap();
    static ref ROAD_REGEX: Regex = Regex::new(&format!(
        r"(?i)\b({}|ALLÉE)\s+([\p{{L}}\d\s'\-]+?)\s*$",
        ROAD_TYPES.join("|")
    ))
    .unwrap();
}

/// Removes a trailing 5-digit postal code.
pub fn strip_postal_code(addr: &str) -> String {
    POSTAL_CODE_REGEX.replace(addr.trim(), "").into_owned()
}

/// Removes everything from the first residence/building/apartment token on.
pub fn strip_qualifiers(addr: &str) -> String {
    let mut addr = addr.to_owned();
    for re in QUALIFIER_REGEXES.iter() {
        addr = re.replace(&addr, "").into_owned();
    }
    addr.trim().to_owned()
}

/// Splits off the leading house number.
///
/// Only digits at the very start qualify. Returns `0` if there are none
/// or if the number does not fit.
pub fn extract_house_number(addr: &str) -> (HouseNumber, &str) {
    match HOUSE_NUMBER_REGEX.captures(addr).and_then(|caps| caps.get(1)) {
        Some(m) => {
            let number = m.as_str().parse().unwrap_or(0);
            (number, &addr[m.end()..])
        }
        None => (0, addr),
    }
}

/// Finds `<road type> <road name>` and returns it upper-cased with the
/// name truncated to `max_name_len` characters.
pub fn extract_street_key(remainder: &str, max_name_len: usize) -> Option<String> {
    let caps = ROAD_REGEX.captures(remainder)?;
    let road_type = caps[1].to_uppercase().replace('É', "E");
    let name = normalize_whitespace(&caps[2].to_uppercase());
    let name: String = name.chars().take(max_name_len).collect();
    let name = name.trim_end();
    if name.is_empty() {
        return None;
    }
    Some(format!("{road_type} {name}"))
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    locality: Option<Regex>,
    max_street_name_len: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALITIES, DEFAULT_MAX_STREET_NAME_LEN).expect("default localities")
    }
}

impl Normalizer {
    pub fn new<S: AsRef<str>>(
        localities: &[S],
        max_street_name_len: usize,
    ) -> Result<Self, regex::Error> {
        let locality = if localities.is_empty() {
            None
        } else {
            let alternatives = localities
                .iter()
                .map(|l| regex::escape(l.as_ref().trim()))
                .collect::<Vec<_>>()
                .join("|");
            // A postal code right in front of the place name goes with it.
            Some(Regex::new(&format!(
                r"(?i)(?:\s+\d{{5}})?\s*\b(?:{alternatives})\b.*$"
            ))?)
        };
        Ok(Self {
            locality,
            max_street_name_len,
        })
    }

    /// Removes the city/region part from its first known place name on.
    pub fn strip_locality(&self, addr: &str) -> String {
        match &self.locality {
            Some(re) => re.replace(addr, "").trim().to_owned(),
            None => addr.trim().to_owned(),
        }
    }

    /// Returns `None` for blank input.
    pub fn normalize(&self, raw: &str) -> Option<NormalizedAddress> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let addr = strip_postal_code(raw);
        let addr = self.strip_locality(&addr);
        let addr = strip_qualifiers(&addr);
        let (house_number, remainder) = extract_house_number(&addr);
        let street_key = extract_street_key(remainder, self.max_street_name_len)
            .unwrap_or_else(|| UNKNOWN_STREET.to_owned());
        let mut cleaned = normalize_whitespace(&addr.to_uppercase());
        if cleaned.is_empty() {
            cleaned = normalize_whitespace(&raw.to_uppercase());
        }
        Some(NormalizedAddress {
            house_number,
            street_key,
            cleaned,
        })
    }
}
