use anyhow::{anyhow, bail, Result};
use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};
use voirie_core::{
    client::{ClientConfig, RetryPolicy},
    entities::{geo::Coordinate, zone::Zone},
    sampler::SamplingPolicy,
    street_table::{default_segments, StreetSegment},
    synthesize::{default_street_zones, default_zones},
    usecases::ResolutionStrategy,
};
use voirie_gateways::{nominatim, photon};

mod raw;

const DEFAULT_CONFIG_FILE_NAME: &str = "voirie.toml";

const ENV_NAME_CACHE_DIR: &str = "VOIRIE_CACHE_DIR";
const ENV_NAME_USER_AGENT: &str = "VOIRIE_USER_AGENT";

#[derive(Debug)]
pub struct Config {
    pub geocoding: Geocoding,
    pub normalizer: Normalizer,
    pub cache: Cache,
    pub synthesis: Synthesis,
    pub street_table: Vec<StreetSegment>,
    pub input: Input,
}

impl Config {
    pub fn try_load_from_file_or_default<P: AsRef<Path>>(file_path: Option<P>) -> Result<Self> {
        let file_path: &Path = file_path.as_ref().map(|p| p.as_ref()).unwrap_or_else(|| {
            log::info!("No configuration file specified. load {DEFAULT_CONFIG_FILE_NAME}");
            Path::new(DEFAULT_CONFIG_FILE_NAME)
        });

        let raw_config = match fs::read_to_string(file_path) {
            Ok(cfg_string) => toml::from_str(&cfg_string)?,
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    log::info!(
                        "{} not found => load default configuration.",
                        file_path.display()
                    );
                    Ok(raw::Config::default())
                }
                _ => Err(err),
            }?,
        };
        let mut cfg = Self::try_from(raw_config)?;
        if let Ok(dir) = env::var(ENV_NAME_CACHE_DIR) {
            cfg.cache.dir = Some(PathBuf::from(dir));
        }
        if let Ok(user_agent) = env::var(ENV_NAME_USER_AGENT) {
            cfg.geocoding.user_agent = user_agent;
        }
        Ok(cfg)
    }
}

#[derive(Debug)]
pub struct Geocoding {
    pub strategy: ResolutionStrategy,
    pub sampling: SamplingPolicy,
    pub gateway: GeocodingGateway,
    pub base_urls: BaseUrls,
    pub client: ClientConfig,
    /// Appended to every query.
    pub locality: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GeocodingGateway {
    Nominatim,
    Photon,
}

#[derive(Debug, Clone)]
pub struct BaseUrls {
    pub nominatim: String,
    pub photon: String,
}

impl BaseUrls {
    pub fn of(&self, gateway: GeocodingGateway) -> &str {
        match gateway {
            GeocodingGateway::Nominatim => &self.nominatim,
            GeocodingGateway::Photon => &self.photon,
        }
    }
}

#[derive(Debug)]
pub struct Normalizer {
    pub localities: Vec<String>,
    pub max_street_name_len: usize,
}

#[derive(Debug)]
pub struct Cache {
    /// No persistence if `None`.
    pub dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Synthesis {
    pub enabled: bool,
    pub zones: Vec<Zone>,
    pub default_zone: String,
    pub street_zones: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct Input {
    pub delimiter: u8,
    pub address_column: String,
}

impl TryFrom<raw::Config> for Config {
    type Error = anyhow::Error;
    fn try_from(from: raw::Config) -> Result<Self> {
        let raw::Config {
            geocoding,
            normalizer,
            cache,
            synthesis,
            input,
            gateway,
            zones,
            zone_streets,
            streets,
        } = from;

        let defaults = raw::Geocoding::default();
        let raw::Geocoding {
            strategy,
            gateway: gateway_name,
            sampling,
            widen_to_street,
            locality,
            min_request_interval,
            max_attempts,
            backoff_base,
            request_timeout,
            user_agent,
        } = geocoding.unwrap_or_default();

        let strategy = match strategy.or(defaults.strategy) {
            Some(raw::Strategy::Sampling) | None => ResolutionStrategy::Sampling,
            Some(raw::Strategy::StreetTable) => ResolutionStrategy::StreetTable,
            Some(raw::Strategy::Synthetic) => ResolutionStrategy::Synthetic,
        };
        let sampling = match sampling.or(defaults.sampling) {
            Some(raw::Sampling::Representative) | None => SamplingPolicy::Representative,
            Some(raw::Sampling::FirstOnly) => SamplingPolicy::FirstOnly,
            Some(raw::Sampling::Every) => SamplingPolicy::Every,
        };

        let gateway_name = match gateway_name.or(defaults.gateway) {
            Some(raw::GeocodingGateway::Nominatim) | None => GeocodingGateway::Nominatim,
            Some(raw::GeocodingGateway::Photon) => GeocodingGateway::Photon,
        };
        let raw::Gateway {
            nominatim: nominatim_gw,
            photon: photon_gw,
        } = gateway.unwrap_or_default();
        let base_urls = BaseUrls {
            nominatim: nominatim_gw
                .map(|gw| gw.base_url)
                .unwrap_or_else(|| nominatim::DEFAULT_BASE_URL.to_owned()),
            photon: photon_gw
                .map(|gw| gw.base_url)
                .unwrap_or_else(|| photon::DEFAULT_BASE_URL.to_owned()),
        };

        let max_attempts = max_attempts
            .or(defaults.max_attempts)
            .ok_or_else(|| anyhow!("Missing max. attempts"))?;
        if max_attempts == 0 {
            bail!("At least one lookup attempt is required");
        }
        let client = ClientConfig {
            min_request_interval: min_request_interval
                .or(defaults.min_request_interval)
                .ok_or_else(|| anyhow!("Missing min. request interval"))?,
            retry: RetryPolicy {
                max_attempts,
                backoff_base: backoff_base
                    .or(defaults.backoff_base)
                    .ok_or_else(|| anyhow!("Missing backoff base"))?,
            },
            widen_to_street: widen_to_street.or(defaults.widen_to_street).unwrap_or(true),
        };
        let geocoding = Geocoding {
            strategy,
            sampling,
            gateway: gateway_name,
            base_urls,
            client,
            locality: locality.or(defaults.locality).unwrap_or_default(),
            request_timeout: request_timeout
                .or(defaults.request_timeout)
                .ok_or_else(|| anyhow!("Missing request timeout"))?,
            user_agent: user_agent
                .or(defaults.user_agent)
                .ok_or_else(|| anyhow!("Missing user agent"))?,
        };

        let raw::Normalizer {
            localities,
            max_street_name_len,
        } = normalizer.unwrap_or_default();
        if max_street_name_len == 0 {
            bail!("The max. street name length must be positive");
        }
        let normalizer = Normalizer {
            localities,
            max_street_name_len,
        };

        let raw::Cache { dir } = cache.unwrap_or_default();
        let cache = Cache { dir };

        let raw::Synthesis {
            enabled,
            default_zone,
        } = synthesis.unwrap_or_default();
        let zones = match zones {
            Some(zones) => zones
                .into_iter()
                .map(|zone| {
                    let raw::Zone {
                        name,
                        lat,
                        lng,
                        spread_lat,
                        spread_lng,
                    } = zone;
                    let center = Coordinate::try_new(lat, lng)?;
                    Ok(Zone::new(name, center, spread_lat, spread_lng))
                })
                .collect::<Result<Vec<_>>>()?,
            None => default_zones(),
        };
        let street_zones = match zone_streets {
            Some(street_zones) => street_zones.into_iter().collect(),
            None => default_street_zones(),
        };
        let synthesis = Synthesis {
            enabled,
            zones,
            default_zone,
            street_zones,
        };

        let street_table = match streets {
            Some(streets) => streets
                .into_iter()
                .map(|raw::Street { name, start, end }| {
                    let start = Coordinate::try_new(start[0], start[1])?;
                    let end = Coordinate::try_new(end[0], end[1])?;
                    Ok(StreetSegment::new(name, start, end))
                })
                .collect::<Result<Vec<_>>>()?,
            None => default_segments(),
        };

        let raw::Input {
            delimiter,
            address_column,
        } = input.unwrap_or_default();
        let delimiter = match delimiter.as_bytes() {
            [byte] => *byte,
            _ => bail!("The CSV delimiter must be a single ASCII character: '{delimiter}'"),
        };
        let input = Input {
            delimiter,
            address_column,
        };

        Ok(Self {
            geocoding,
            normalizer,
            cache,
            synthesis,
            street_table,
            input,
        })
    }
}
