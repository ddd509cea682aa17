use std::fmt;

use strum::{Display, EnumString};

use crate::geo::*;

/// How the coordinate of a row was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Provenance {
    Direct,
    Interpolated,
    Extrapolated,
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub pos: Coordinate,
    pub provenance: Provenance,
}

impl Resolved {
    pub const fn new(pos: Coordinate, provenance: Provenance) -> Self {
        Self { pos, provenance }
    }
}

/// The final outcome for one input row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub row: usize,
    /// `None` if the row could not be placed at all.
    pub resolved: Option<Resolved>,
}

impl ResolutionResult {
    pub fn pos(&self) -> Option<Coordinate> {
        self.resolved.map(|r| r.pos)
    }

    pub fn provenance(&self) -> Option<Provenance> {
        self.resolved.map(|r| r.provenance)
    }
}

/// Row counts and lookup statistics of a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub rows: usize,
    /// Rows without any address.
    pub skipped: usize,
    pub direct: usize,
    pub interpolated: usize,
    pub extrapolated: usize,
    pub synthetic: usize,
    /// Rows with an address that did not get a coordinate.
    pub unresolved: usize,
    pub streets: usize,
    pub external_calls: usize,
    pub cache_hits: usize,
    pub retries: usize,
    pub widened: usize,
}

impl Summary {
    pub fn count(&mut self, resolved: Option<&Resolved>) {
        self.rows += 1;
        match resolved.map(|r| r.provenance) {
            Some(Provenance::Direct) => self.direct += 1,
            Some(Provenance::Interpolated) => self.interpolated += 1,
            Some(Provenance::Extrapolated) => self.extrapolated += 1,
            Some(Provenance::Synthetic) => self.synthetic += 1,
            None => self.unresolved += 1,
        }
    }

    pub fn count_skipped(&mut self) {
        self.rows += 1;
        self.skipped += 1;
    }

    pub fn resolved(&self) -> usize {
        self.direct + self.interpolated + self.extrapolated + self.synthetic
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} rows ({} skipped): {} direct, {} interpolated, {} extrapolated, {} synthetic, {} unresolved | {} streets, {} external calls, {} cache hits, {} retries, {} widened",
            self.rows,
            self.skipped,
            self.direct,
            self.interpolated,
            self.extrapolated,
            self.synthetic,
            self.unresolved,
            self.streets,
            self.external_calls,
            self.cache_hits,
            self.retries,
            self.widened,
        )
    }
}
