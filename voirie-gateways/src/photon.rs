//! [Photon](https://photon.komoot.io) geocoder returning GeoJSON.

use reqwest::blocking::Client;
use serde::Deserialize;
use voirie_core::{
    entities::geo::Coordinate,
    gateways::geocode::{GeoCodingGateway, LookupError},
};

use crate::http::{self, HttpSettings};

pub const DEFAULT_BASE_URL: &str = "https://photon.komoot.io";

#[derive(Debug, Clone)]
pub struct Photon {
    client: Client,
    base_url: String,
    locality: String,
}

impl Photon {
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
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[lng, lat]`
    coordinates: Vec<f64>,
}

fn first_feature(collection: &FeatureCollection) -> Result<Option<Coordinate>, LookupError> {
    let Some(feature) = collection.features.first() else {
        return Ok(None);
    };
    match feature.geometry.coordinates[..] {
        [lng, lat, ..] => http::coordinate(lat, lng).map(Some),
        _ => Err(LookupError::Rejected("Incomplete point geometry".into())),
    }
}

impl GeoCodingGateway for Photon {
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, LookupError> {
        let q = http::forward_query_string(query, &self.locality);
        let response = self
            .client
            .get(format!("{}/api/", self.base_url))
            .query(&[("q", q.as_str()), ("limit", "1")])
            .send()
            .map_err(http::transport_error)?;
        http::check_status(response.status())?;
        let collection: FeatureCollection = response.json().map_err(http::decode_error)?;
        first_feature(&collection)
    }
}
