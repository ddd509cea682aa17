use std::fmt;

pub type HouseNumber = u32;

/// Street key of all addresses without a recognizable road type.
pub const UNKNOWN_STREET: &str = "UNKNOWN";

/// A single input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRow {
    /// Stable identifier, usually the position in the input.
    pub id: usize,
    pub address: Option<String>,
}

impl AddressRow {
    pub fn new(id: usize, address: Option<impl Into<String>>) -> Self {
        Self {
            id,
            address: address.map(Into::into),
        }
    }

    /// The raw address, if it contains anything but whitespace.
    pub fn address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedAddress {
    /// `0` if the address does not start with a number.
    pub house_number: HouseNumber,
    /// Road type and name, e.g. `RUE DES PENSEES`.
    pub street_key: String,
    /// The address after all suffixes have been stripped.
    pub cleaned: String,
}

impl NormalizedAddress {
    pub fn is_unknown_street(&self) -> bool {
        self.street_key == UNKNOWN_STREET
    }

    pub fn has_house_number(&self) -> bool {
        self.house_number > 0
    }

    /// The query string sent to a geocoding service.
    pub fn query(&self) -> String {
        if self.is_unknown_street() {
            self.cleaned.clone()
        } else {
            street_query(self.house_number, &self.street_key)
        }
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_unknown_street() {
            write!(f, "{} ({})", self.cleaned, UNKNOWN_STREET)
        } else {
            f.write_str(&street_query(self.house_number, &self.street_key))
        }
    }
}

/// Builds the lookup query for a house on a street.
///
/// House number `0` addresses the street as a whole.
pub fn street_query(house_number: HouseNumber, street_key: &str) -> String {
    if house_number == 0 {
        street_key.to_owned()
    } else {
        format!("{house_number} {street_key}")
    }
}
