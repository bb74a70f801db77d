//! Configuration module for Spider-Probe
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use spider_probe::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider-probe.toml")).unwrap();
//! println!("Idle timeout: {}ms", config.idle_timeout_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, RunConfig, SpiderConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
