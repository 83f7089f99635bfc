//! Download the SEC EDGAR quarterly full-index archives for a range of years
//! and consolidate their `master.idx` files into a single `master.tsv`.

pub mod config;
pub mod downloader;
pub mod errors;
pub mod merge;
pub mod models;

pub use config::Config;
pub use errors::IndexError;
