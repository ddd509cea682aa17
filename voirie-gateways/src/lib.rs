//! Adapters for the geocoding services and the cache storage.

pub mod json_cache;
pub mod nominatim;
pub mod photon;

mod http;

pub use self::http::HttpSettings;
