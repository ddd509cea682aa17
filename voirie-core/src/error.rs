use thiserror::Error;

use crate::cache::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The run has been aborted")]
    Aborted,
    #[error("No zones are configured")]
    NoZones,
    #[error("Unknown zone: {0}")]
    UnknownZone(String),
    #[error("Invalid locality pattern: {0}")]
    Locality(#[from] regex::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a row ended up in the fallback synthesizer.
///
/// None of these conditions is fatal, they only route rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum FallbackReason {
    /// The address has no recognizable street.
    ParseFailure,
    /// Not a single anchor of the street could be resolved.
    InterpolationImpossible,
    /// Live lookups are disabled for this run.
    Skipped,
    /// The street is not part of the street table.
    UnknownSegment,
}
