//! Core abstractions shared by the catalog, providers and CLI

pub mod config;
pub mod error;
pub mod fund;
pub mod log;
pub mod query;

// Re-export main types for cleaner imports
pub use error::CatalogError;
pub use fund::{CatalogSource, FundRecord, MalformedRecord, RawFundRow};
