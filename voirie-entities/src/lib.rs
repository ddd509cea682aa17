#![deny(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # voirie-entities
//!
//! Reusable, agnostic domain entities for resolving postal addresses to coordinates.
//!
//! The entities only contain generic functionality that does not reveal any application-specific business logic.

pub mod address;
pub mod geo;
pub mod resolution;
pub mod street;
pub mod zone;

#[cfg(any(test, feature = "builders"))]
pub mod builders;
