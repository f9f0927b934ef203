//! `catalog-recon` — Product catalog reconciliation engine.
//!
//! Pure engine crate: receives pre-normalized sources and pre-scanned
//! asset candidates, returns the merged catalog plus an audit.
//! No CLI or IO dependencies.

pub mod assets;
pub mod audit;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod model;
pub mod normalize;

pub use config::CatalogConfig;
pub use engine::run;
pub use error::CatalogError;
pub use model::{canonical_id, Category, Confidence, ProductRecord};
