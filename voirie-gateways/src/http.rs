use std::time::Duration;

use itertools::Itertools;
use reqwest::{blocking::Client, StatusCode};
use voirie_core::{entities::geo::Coordinate, gateways::geocode::LookupError};

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    /// Upper bound of a single request.
    pub timeout: Duration,
}

pub(crate) fn client(settings: &HttpSettings) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .build()
}

/// Query with the locality appended, e.g. `12 RUE DES PENSEES Les Sables d'Olonne`.
pub(crate) fn forward_query_string(query: &str, locality: &str) -> String {
    [query, locality]
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .join(" ")
}

/// Throttling and server errors are worth another attempt.
pub(crate) fn check_status(status: StatusCode) -> Result<(), LookupError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(LookupError::Transient(format!("HTTP {status}")))
    } else {
        Err(LookupError::Rejected(format!("HTTP {status}")))
    }
}

/// Sending failed: no connection, timeout or an aborted transfer.
pub(crate) fn transport_error(err: reqwest::Error) -> LookupError {
    LookupError::Transient(err.to_string())
}

pub(crate) fn decode_error(err: impl ToString) -> LookupError {
    LookupError::Rejected(err.to_string())
}

pub(crate) fn coordinate(lat: f64, lng: f64) -> Result<Coordinate, LookupError> {
    Coordinate::try_new(lat, lng).map_err(decode_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_locality() {
        assert_eq!(
            "12 RUE DES PENSEES Les Sables d'Olonne",
            forward_query_string("12 RUE DES PENSEES", " Les Sables d'Olonne")
        );
        assert_eq!("RUE X", forward_query_string("RUE X", ""));
    }

    #[test]
    fn classify_status() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(check_status(StatusCode::TOO_MANY_REQUESTS)
            .unwrap_err()
            .is_transient());
        assert!(check_status(StatusCode::BAD_GATEWAY)
            .unwrap_err()
            .is_transient());
        assert!(!check_status(StatusCode::FORBIDDEN)
            .unwrap_err()
            .is_transient());
    }

    #[test]
    fn reject_invalid_coordinates() {
        assert!(coordinate(46.5, -1.78).is_ok());
        assert!(matches!(
            coordinate(146.5, -1.78),
            Err(LookupError::Rejected(_))
        ));
    }
}
