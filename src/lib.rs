//! hwr-search: nearest-neighbor glyph lookup over a prebuilt vector index.

pub mod archive;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod index;
pub mod metrics;
pub mod query;
pub mod server;
pub mod storage;
pub mod types;
