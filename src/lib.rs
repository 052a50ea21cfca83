pub mod builder;
pub mod cli;
pub mod collab;
pub mod config;
pub mod discover;
pub mod download;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use error::{CatalogError, Result};
pub use store::MetadataStore;
