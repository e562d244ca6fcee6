//! Configuration module for linkscan
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use linkscan::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Seed URL: {}", config.scan.seed_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BlacklistEntry, Config, HttpConfig, OutputConfig, QueueConfig, ScanConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

pub use validation::validate_scan_name;
