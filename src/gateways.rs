use anyhow::Result;
use voirie_core::gateways::geocode::GeoCodingGateway;
use voirie_gateways::{
    json_cache::JsonCacheStore, nominatim::Nominatim, photon::Photon, HttpSettings,
};

use crate::config::{self, GeocodingGateway};

pub fn geocoding_gateway(cfg: &config::Geocoding) -> Result<Box<dyn GeoCodingGateway>> {
    let settings = HttpSettings {
        user_agent: cfg.user_agent.clone(),
        timeout: cfg.request_timeout,
    };
    let base_url = cfg.base_urls.of(cfg.gateway);
    let gw: Box<dyn GeoCodingGateway> = match cfg.gateway {
        GeocodingGateway::Nominatim => {
            log::info!("Use Nominatim geocoding gateway ({base_url})");
            Box::new(Nominatim::try_new(&settings, base_url, &cfg.locality)?)
        }
        GeocodingGateway::Photon => {
            log::info!("Use Photon geocoding gateway ({base_url})");
            Box::new(Photon::try_new(&settings, base_url, &cfg.locality)?)
        }
    };
    Ok(gw)
}

pub fn cache_store(cfg: &config::Cache) -> Result<Option<JsonCacheStore>> {
    match &cfg.dir {
        Some(dir) => {
            let store = JsonCacheStore::try_new(dir)?;
            log::info!("Use JSON file cache ({})", store.path().display());
            Ok(Some(store))
        }
        None => {
            log::warn!("No cache directory was configured: lookups are not persisted");
            Ok(None)
        }
    }
}
