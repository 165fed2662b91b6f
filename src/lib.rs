//! Banyan - free-text district resolution for crawled listing records
//!
//! This library provides shared types and modules for the import and query binaries.

pub mod directory;
pub mod models;
pub mod resolver;

pub use models::{District, DistrictId, LocationQuery};
pub use resolver::Resolver;
