//! [Nominatim](https://nominatim.org/release-docs/latest/api/Search/) search API.

use reqwest::blocking::Client;
use serde::Deserialize;
use voirie_core::{
    entities::geo::Coordinate,
    gateways::geocode::{GeoCodingGateway, LookupError},
};

use crate::http::{self, HttpSettings};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone)]
pub struct Nominatim {
    client: Client,
    base_url: String,
    locality: String,
}

impl Nominatim {
    pub fn try_new(
        settings: &HttpSettings,
        base_url: &str,
        locality: &str,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: http::client(settings)?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            locality: locality.to_owned(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

fn first_place(places: &[Place]) -> Result<Option<Coordinate>, LookupError> {
    let Some(place) = places.first() else {
        return Ok(None);
    };
    let lat = place.lat.parse().map_err(http::decode_error)?;
    let lng = place.lon.parse().map_err(http::decode_error)?;
    http::coordinate(lat, lng).map(Some)
}

impl GeoCodingGateway for Nominatim {
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, LookupError> {
        let q = http::forward_query_string(query, &self.locality);
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", q.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .map_err(http::transport_error)?;
        http::check_status(response.status())?;
        let places: Vec<Place> = response.json().map_err(http::decode_error)?;
        first_place(&places)
    }
}
