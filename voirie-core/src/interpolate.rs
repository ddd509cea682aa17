//! Positions of all known house numbers of a street derived from its anchors.

use std::collections::BTreeMap;

use crate::entities::{address::HouseNumber, geo::*, resolution::*, street::*};

/// Position of a single house number.
///
/// Returns `None` if there is no anchor at all.
pub fn locate(target: HouseNumber, anchors: &AnchorSet) -> Option<Resolved> {
    if let Some(pos) = anchors.get(target) {
        return Some(Resolved::new(*pos, Provenance::Direct));
    }
    match (anchors.lower(target), anchors.upper(target)) {
        (Some((lower_nr, lower)), Some((upper_nr, upper))) => {
            debug_assert!(lower_nr < target && target < upper_nr);
            let t = interpolation_factor(target, lower_nr, upper_nr);
            Some(Resolved::new(lower.lerp(upper, t), Provenance::Interpolated))
        }
        (Some((_, pos)), None) | (None, Some((_, pos))) => {
            Some(Resolved::new(*pos, Provenance::Extrapolated))
        }
        (None, None) => None,
    }
}

/// Relative position of `target` between `lower` and `upper`, in `[0, 1]`.
pub fn interpolation_factor(target: HouseNumber, lower: HouseNumber, upper: HouseNumber) -> f64 {
    debug_assert!(lower <= target && target <= upper);
    if upper == lower {
        return 0.0;
    }
    f64::from(target - lower) / f64::from(upper - lower)
}

/// Positions for every number that can be placed.
///
/// Numbers are missing from the result only if there are no anchors.
pub fn fill_street(numbers: &[HouseNumber], anchors: &AnchorSet) -> BTreeMap<HouseNumber, Resolved> {
    numbers
        .iter()
        .filter_map(|n| locate(*n, anchors).map(|r| (*n, r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn anchors(points: &[(HouseNumber, f64, f64)]) -> AnchorSet {
        points
            .iter()
            .map(|(n, lat, lng)| (*n, Coordinate::new(*lat, *lng)))
            .collect()
    }

    #[test]
    fn pensees_example() {
        let anchors = anchors(&[(2, 46.4920, -1.7880), (40, 46.4960, -1.7840)]);
        let filled = fill_street(&[2, 12, 40], &anchors);
        assert_eq!(3, filled.len());
        assert_eq!(Provenance::Direct, filled[&2].provenance);
        assert_eq!(Provenance::Direct, filled[&40].provenance);
        let at_12 = filled[&12];
        assert_eq!(Provenance::Interpolated, at_12.provenance);
        let t = (12.0 - 2.0) / (40.0 - 2.0);
        assert!((at_12.pos.lat - (46.4920 + t * 0.0040)).abs() < EPS);
        assert!((at_12.pos.lat - 46.4930).abs() < 1e-4);
        assert!((at_12.pos.lng - (-1.7880 + t * 0.0040)).abs() < EPS);
    }

    #[test]
    fn midpoint() {
        let a = Coordinate::new(46.49, -1.79);
        let b = Coordinate::new(46.50, -1.77);
        let anchors: AnchorSet = vec![(2, a), (20, b)].into_iter().collect();
        let mid = locate(11, &anchors).unwrap();
        assert!((mid.pos.lat - a.lerp(&b, 0.5).lat).abs() < EPS);
        assert!((mid.pos.lng - a.lerp(&b, 0.5).lng).abs() < EPS);
    }

    #[test]
    fn interpolated_positions_stay_on_the_segment() {
        let anchors = anchors(&[(1, 46.40, -1.70), (51, 46.50, -1.80), (99, 46.45, -1.60)]);
        let numbers: Vec<_> = (1..=99).collect();
        for (n, resolved) in fill_street(&numbers, &anchors) {
            let (lower_nr, lower) = anchors.lower(n).unwrap();
            let (upper_nr, upper) = anchors.upper(n).unwrap();
            let t = interpolation_factor(n, lower_nr, upper_nr);
            assert!((0.0..=1.0).contains(&t));
            let min_lat = lower.lat.min(upper.lat) - EPS;
            let max_lat = lower.lat.max(upper.lat) + EPS;
            assert!(resolved.pos.lat >= min_lat && resolved.pos.lat <= max_lat);
            let min_lng = lower.lng.min(upper.lng) - EPS;
            let max_lng = lower.lng.max(upper.lng) + EPS;
            assert!(resolved.pos.lng >= min_lng && resolved.pos.lng <= max_lng);
        }
    }

    #[test]
    fn extrapolate_from_nearest_anchor() {
        let anchors = anchors(&[(10, 46.1, -1.1), (20, 46.2, -1.2)]);
        let before = locate(4, &anchors).unwrap();
        assert_eq!(Provenance::Extrapolated, before.provenance);
        assert_eq!(Coordinate::new(46.1, -1.1), before.pos);
        let after = locate(30, &anchors).unwrap();
        assert_eq!(Provenance::Extrapolated, after.provenance);
        assert_eq!(Coordinate::new(46.2, -1.2), after.pos);
        let zero = locate(0, &anchors).unwrap();
        assert_eq!(Coordinate::new(46.1, -1.1), zero.pos);
    }

    #[test]
    fn single_anchor_is_reused() {
        let anchors = anchors(&[(5, 46.3, -1.3)]);
        let filled = fill_street(&[1, 5, 9], &anchors);
        assert!(filled.values().all(|r| r.pos == Coordinate::new(46.3, -1.3)));
        assert_eq!(Provenance::Direct, filled[&5].provenance);
        assert_eq!(Provenance::Extrapolated, filled[&9].provenance);
    }

    #[test]
    fn nothing_without_anchors() {
        assert!(fill_street(&[1, 2, 3], &AnchorSet::new()).is_empty());
        assert!(locate(1, &AnchorSet::new()).is_none());
    }
}
