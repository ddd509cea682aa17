//! # voirie-core
//!
//! Resolves postal addresses of a single municipality to approximate
//! coordinates. Only a few house numbers per street are looked up live,
//! everything else is interpolated along the street or, if nothing is
//! known, synthesized deterministically.

pub use voirie_entities as entities;

pub mod cache;
pub mod client;
pub mod error;
pub mod gateways;
pub mod interpolate;
pub mod normalize;
pub mod sampler;
pub mod street_table;
pub mod synthesize;
pub mod text;
pub mod usecases;

pub use self::error::Error;
