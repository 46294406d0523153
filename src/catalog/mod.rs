//! In-memory fund catalog: snapshot, token index and the refreshing cache

pub mod cache;
pub mod index;
pub mod scanner;
pub mod snapshot;

pub use cache::{CatalogCache, CatalogGeneration, CatalogStatus};
pub use snapshot::CatalogSnapshot;
