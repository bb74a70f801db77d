use crate::crawler::{AutoDiscover, SpiderOptions};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_IDLE_TIMEOUT_MS: u64 = 1000;
const DEFAULT_MAX_SOCKETS: usize = 4;
const DEFAULT_REPORTERS: &str = "console";

/// Main configuration structure for Spider-Probe
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URLs the crawl starts from, one spider each
    #[serde(rename = "spider-start")]
    pub spider_start: Vec<String>,

    /// Directory searched recursively for `*.toml` test files
    #[serde(rename = "test-dir")]
    pub test_dir: PathBuf,

    /// Working directory while test files are loaded
    #[serde(rename = "working-dir", default)]
    pub working_dir: Option<PathBuf>,

    /// Comma separated reporter keys
    #[serde(default = "default_reporters")]
    pub reporters: String,

    /// Reporter options, usually a JSON object
    #[serde(rename = "reporter-options", default)]
    pub reporter_options: Option<String>,

    /// How long a spider may stay without progress before it is
    /// considered finished (milliseconds)
    #[serde(rename = "idle-timeout-ms", default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Maximum number of requests in flight per spider
    #[serde(rename = "max-sockets", default = "default_max_sockets")]
    pub max_sockets: usize,

    #[serde(default)]
    pub spider: SpiderConfig,
}

/// Spider behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderConfig {
    /// Abort when a discovered URL has no route
    #[serde(rename = "fail-on-missing-route", default)]
    pub fail_on_missing_route: bool,

    /// Abort when a request gets no response
    #[serde(rename = "fail-on-no-response", default)]
    pub fail_on_no_response: bool,

    /// Abort when a response body cannot be read
    #[serde(rename = "fail-on-parse-error", default)]
    pub fail_on_parse_error: bool,

    /// Follow links to other hosts
    #[serde(rename = "spider-cross-domain", default)]
    pub spider_cross_domain: bool,

    /// Send back the cookies set by the previous response
    #[serde(rename = "retain-cookies", default = "default_true")]
    pub retain_cookies: bool,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            fail_on_missing_route: false,
            fail_on_no_response: false,
            fail_on_parse_error: false,
            spider_cross_domain: false,
            retain_cookies: true,
        }
    }
}

/// Settings the test runner needs for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub spider: SpiderOptions,
    pub idle_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            spider: SpiderOptions::default(),
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// A configuration with defaults for everything but the start URLs and
    /// test directory
    pub fn new(spider_start: Vec<String>, test_dir: impl Into<PathBuf>) -> Self {
        Self {
            spider_start,
            test_dir: test_dir.into(),
            working_dir: None,
            reporters: default_reporters(),
            reporter_options: None,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            max_sockets: DEFAULT_MAX_SOCKETS,
            spider: SpiderConfig::default(),
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            spider: SpiderOptions {
                auto_discover: AutoDiscover::all(),
                throw_on_missing_route: self.spider.fail_on_missing_route,
                throw_on_no_response: self.spider.fail_on_no_response,
                throw_on_failed_parse: self.spider.fail_on_parse_error,
                retain_cookies: self.spider.retain_cookies,
                spider_cross_domain: self.spider.spider_cross_domain,
                max_sockets: self.max_sockets,
                ..SpiderOptions::default()
            },
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }
}

fn default_reporters() -> String {
    DEFAULT_REPORTERS.to_string()
}

fn default_idle_timeout_ms() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

fn default_max_sockets() -> usize {
    DEFAULT_MAX_SOCKETS
}

fn default_true() -> bool {
    true
}
