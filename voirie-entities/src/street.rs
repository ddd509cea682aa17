use std::collections::{btree_map, BTreeMap, BTreeSet};

use crate::{address::*, geo::*};

/// All distinct house numbers known for one street.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetRecord {
    pub street_key: String,
    numbers: Vec<HouseNumber>,
}

impl StreetRecord {
    pub fn new(street_key: impl Into<String>, numbers: impl IntoIterator<Item = HouseNumber>) -> Self {
        let numbers: BTreeSet<_> = numbers.into_iter().filter(|n| *n > 0).collect();
        Self {
            street_key: street_key.into(),
            numbers: numbers.into_iter().collect(),
        }
    }

    /// Sorted, unique and strictly positive.
    pub fn numbers(&self) -> &[HouseNumber] {
        &self.numbers
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

/// Directly resolved positions of one street, ordered by house number.
///
/// Entries can only be added, never removed or replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorSet(BTreeMap<HouseNumber, Coordinate>);

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the number was already anchored.
    pub fn insert(&mut self, number: HouseNumber, pos: Coordinate) -> bool {
        match self.0.entry(number) {
            btree_map::Entry::Vacant(e) => {
                e.insert(pos);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, number: HouseNumber) -> Option<&Coordinate> {
        self.0.get(&number)
    }

    /// Nearest anchor with a number `<= target`.
    pub fn lower(&self, target: HouseNumber) -> Option<(HouseNumber, &Coordinate)> {
        self.0.range(..=target).next_back().map(|(n, c)| (*n, c))
    }

    /// Nearest anchor with a number `>= target`.
    pub fn upper(&self, target: HouseNumber) -> Option<(HouseNumber, &Coordinate)> {
        self.0.range(target..).next().map(|(n, c)| (*n, c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HouseNumber, &Coordinate)> {
        self.0.iter().map(|(n, c)| (*n, c))
    }
}

impl FromIterator<(HouseNumber, Coordinate)> for AnchorSet {
    fn from_iter<I: IntoIterator<Item = (HouseNumber, Coordinate)>>(iter: I) -> Self {
        let mut anchors = Self::new();
        for (n, c) in iter {
            anchors.insert(n, c);
        }
        anchors
    }
}
