//! Selection of the house numbers of a street that get resolved directly.

use std::collections::BTreeSet;

use strum::{Display, EnumString};

use crate::entities::address::HouseNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SamplingPolicy {
    /// First, last and (for more than three numbers) the middle one.
    #[default]
    Representative,
    /// Only the lowest number.
    FirstOnly,
    /// No sampling at all.
    Every,
}

impl SamplingPolicy {
    /// `numbers` must be sorted in ascending order.
    pub fn select_anchors(self, numbers: &[HouseNumber]) -> BTreeSet<HouseNumber> {
        debug_assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
        match self {
            Self::Representative => select_anchors(numbers),
            Self::FirstOnly => numbers.first().copied().into_iter().collect(),
            Self::Every => numbers.iter().copied().collect(),
        }
    }
}

/// At most three anchors per street, regardless of its size.
pub fn select_anchors(numbers: &[HouseNumber]) -> BTreeSet<HouseNumber> {
    let mut anchors = BTreeSet::new();
    let (Some(first), Some(last)) = (numbers.first(), numbers.last()) else {
        return anchors;
    };
    anchors.insert(*first);
    if numbers.len() > 1 {
        anchors.insert(*last);
    }
    if numbers.len() > 3 {
        anchors.insert(numbers[numbers.len() / 2]);
    }
    debug_assert!(anchors.len() <= 3);
    anchors
}
