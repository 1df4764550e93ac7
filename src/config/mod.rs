//! Configuration module for Tour-Sync
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use tour_sync::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tour-sync.toml")).unwrap();
//! println!("Crawling at most {} listing pages", config.catalog.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CatalogConfig, Config, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
