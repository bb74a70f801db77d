//! Spider-Probe: a crawling integration test runner
//!
//! This crate crawls a website from one or more start URLs and, for every
//! fetched response, runs the assertions of the test topics whose URL pattern
//! matches. Results are grouped into suites and topics and handed to
//! reporters.

pub mod config;
pub mod crawler;
pub mod headers;
pub mod output;
pub mod runner;
pub mod suite;
pub mod topics;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Spider-Probe operations
#[derive(Debug, Error)]
pub enum SpiderProbeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Spider error: {0}")]
    Spider(#[from] crawler::SpiderError),

    #[error("Topic error: {0}")]
    Topic(#[from] topics::TopicError),

    #[error("Suite error: {0}")]
    Suite(#[from] suite::SuiteError),

    #[error("Report error: {0}")]
    Report(#[from] output::ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown reporter: {0}")]
    UnknownReporter(String),

    #[error("No test files found in {}", .0.display())]
    NoTestFiles(PathBuf),

    #[error("Invalid test file {}: {message}", .path.display())]
    TestFile { path: PathBuf, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Spider-Probe operations
pub type Result<T> = std::result::Result<T, SpiderProbeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, RunConfig};
pub use crawler::{Discovery, RouteContext, Spider, SpiderOptions};
pub use headers::HeaderSet;
pub use output::Reporter;
pub use runner::TestRunner;
pub use suite::{AssertionError, SuiteManager, TestError};
pub use topics::{TestCase, TestFile, Topic};
pub use url::{resolve_url, ResolvedUrl};
