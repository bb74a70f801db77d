//! Crawler module: the spider
//!
//! This module contains the crawl engine, including:
//! - Per-host route registration and dispatch
//! - Deduplicated, concurrency-bounded HTTP fetching
//! - Cookie retention and per-request header sets
//! - Auto-discovery of anchors, images, links and scripts
//! - In-flight tracking for completion detection

mod fetcher;
mod log;
mod parser;
mod router;
mod spider;
mod tracker;

pub use fetcher::{build_http_client, fetch_url, FetchResult, SpiderResponse};
pub use log::{LogEntry, LogLevel, LogListener};
pub use parser::discover_links;
pub use spider::{RouteContext, Spider};
pub(crate) use spider::panic_message;
pub use tracker::Completion;

use crate::headers::{default_headers, HeaderSet};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the spider
///
/// Routing, transport and parse errors are only raised when the matching
/// `throw_on_*` option is set; otherwise they are logged and the URL is
/// skipped.
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("No routes for host '{host}'")]
    NoRouteForHost { host: String },

    #[error("No routes for path '{url}'")]
    NoRouteForPath { url: String },

    #[error("Failed to get response from {url}: {message}")]
    NoResponse { url: String, message: String },

    #[error("Failed to parse response from {url}: {message}")]
    ResponseParse { url: String, message: String },

    #[error("Invalid route pattern '{pattern}': {source}")]
    InvalidRoutePattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// What the spider should do after a route callback returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// Scan the response for further URLs (per the auto-discovery flags)
    Continue,

    /// Do not follow anything found in this response
    Halt,
}

/// Route callback: invoked with the context, parsed document and URL
pub type RouteCallback = Arc<dyn Fn(&RouteContext, &Html, &str) -> Discovery + Send + Sync>;

/// Supplies the header sets to request a URL with; one request per set
pub type HeaderProvider = Arc<dyn Fn(&str) -> Vec<HeaderSet> + Send + Sync>;

/// Wraps a closure as a [`RouteCallback`]
pub fn route_callback<F>(callback: F) -> RouteCallback
where
    F: Fn(&RouteContext, &Html, &str) -> Discovery + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Wraps a closure as a [`HeaderProvider`]
pub fn header_provider<F>(provider: F) -> HeaderProvider
where
    F: Fn(&str) -> Vec<HeaderSet> + Send + Sync + 'static,
{
    Arc::new(provider)
}

/// Which element kinds are scanned for further URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoDiscover {
    /// `<a href>`
    pub anchors: bool,
    /// `<img src>`
    pub images: bool,
    /// `<link href>`
    pub links: bool,
    /// `<script src>`
    pub scripts: bool,
}

impl AutoDiscover {
    pub fn all() -> Self {
        Self {
            anchors: true,
            images: true,
            links: true,
            scripts: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Returns true if at least one kind is enabled
    pub fn any(&self) -> bool {
        self.anchors || self.images || self.links || self.scripts
    }
}

/// Spider behavior configuration
#[derive(Debug, Clone)]
pub struct SpiderOptions {
    /// Element kinds followed automatically
    pub auto_discover: AutoDiscover,

    /// Fail instead of skipping a URL without a host router or path route
    pub throw_on_missing_route: bool,

    /// Fail the crawl when a request gets no response
    pub throw_on_no_response: bool,

    /// Fail the crawl when a response body cannot be read
    pub throw_on_failed_parse: bool,

    /// Send the cookies of the last response with the next request
    pub retain_cookies: bool,

    /// Follow URLs whose hostname differs from the first URL requested
    pub spider_cross_domain: bool,

    /// Maximum number of requests in flight at once
    pub max_sockets: usize,

    /// Header set used when no provider supplies one
    pub default_headers: HeaderSet,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for SpiderOptions {
    fn default() -> Self {
        Self {
            auto_discover: AutoDiscover::all(),
            throw_on_missing_route: false,
            throw_on_no_response: false,
            throw_on_failed_parse: false,
            retain_cookies: true,
            spider_cross_domain: false,
            max_sockets: 4,
            default_headers: default_headers(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
