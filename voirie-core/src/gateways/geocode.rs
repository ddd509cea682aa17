use thiserror::Error;

use crate::entities::geo::Coordinate;

#[derive(Debug, Error)]
pub enum LookupError {
    /// Worth another attempt: connection problems, timeouts, throttling.
    #[error("Transient lookup failure: {0}")]
    Transient(String),
    /// The service answered but the answer is unusable.
    #[error("Lookup rejected: {0}")]
    Rejected(String),
}

impl LookupError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub trait GeoCodingGateway {
    /// Resolves a free-text query.
    ///
    /// `Ok(None)` means the service found nothing.
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, LookupError>;
}

impl<G> GeoCodingGateway for &G
where
    G: GeoCodingGateway + ?Sized,
{
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, LookupError> {
        (**self).forward(query)
    }
}

impl<G> GeoCodingGateway for Box<G>
where
    G: GeoCodingGateway + ?Sized,
{
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, LookupError> {
        (**self).forward(query)
    }
}
