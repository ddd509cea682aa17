use duration_str::deserialize_option_duration;
use serde::Deserialize;
use std::{collections::BTreeMap, path::PathBuf, time::Duration};

const DEFAULT_CONFIG_FILE: &str = include_str!("voirie.default.toml");

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub geocoding: Option<Geocoding>,
    pub normalizer: Option<Normalizer>,
    pub cache: Option<Cache>,
    pub synthesis: Option<Synthesis>,
    pub input: Option<Input>,
    pub gateway: Option<Gateway>,
    pub zones: Option<Vec<Zone>>,
    pub zone_streets: Option<BTreeMap<String, String>>,
    pub streets: Option<Vec<Street>>,
}

impl Default for Config {
    fn default() -> Self {
        let cfg: Self = toml::from_str(DEFAULT_CONFIG_FILE).expect("Default configuration");
        cfg
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Geocoding {
    pub strategy: Option<Strategy>,
    pub gateway: Option<GeocodingGateway>,
    pub sampling: Option<Sampling>,
    pub widen_to_street: Option<bool>,
    pub locality: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub min_request_interval: Option<Duration>,
    pub max_attempts: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub backoff_base: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub request_timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl Default for Geocoding {
    fn default() -> Self {
        Config::default()
            .geocoding
            .expect("Geocoding configuration")
    }
}

#[derive(Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Sampling,
    StreetTable,
    Synthetic,
}

#[derive(Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sampling {
    Representative,
    FirstOnly,
    Every,
}

#[derive(Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeocodingGateway {
    Nominatim,
    Photon,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Normalizer {
    pub localities: Vec<String>,
    pub max_street_name_len: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Config::default()
            .normalizer
            .expect("Normalizer configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cache {
    pub dir: Option<PathBuf>,
}

impl Default for Cache {
    fn default() -> Self {
        Config::default().cache.expect("Cache configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Synthesis {
    pub enabled: bool,
    pub default_zone: String,
}

impl Default for Synthesis {
    fn default() -> Self {
        Config::default()
            .synthesis
            .expect("Synthesis configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Input {
    pub delimiter: String,
    pub address_column: String,
}

impl Default for Input {
    fn default() -> Self {
        Config::default().input.expect("Input configuration")
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Gateway {
    pub nominatim: Option<Nominatim>,
    pub photon: Option<Photon>,
}

impl Default for Gateway {
    fn default() -> Self {
        Config::default().gateway.expect("Gateway configuration")
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Nominatim {
    pub base_url: String,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Photon {
    pub base_url: String,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Zone {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub spread_lat: f64,
    pub spread_lng: f64,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Street {
    pub name: String,
    /// `[lat, lng]`
    pub start: [f64; 2],
    /// `[lat, lng]`
    pub end: [f64; 2],
}
