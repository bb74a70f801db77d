//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the spider, including:
//! - Building the shared HTTP client
//! - Turning a header set into request headers
//! - Capturing the response status, headers, cookies and body
//! - Classifying transport failures

use crate::crawler::SpiderOptions;
use crate::headers::HeaderSet;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use reqwest::Client;
use url::Url;

/// A response captured by the spider
///
/// Everything an assertion may want to look at is copied out of the
/// `reqwest` response so it can be handed around by reference.
#[derive(Debug, Clone)]
pub struct SpiderResponse {
    /// HTTP status code
    pub status: u16,

    /// Final URL after redirects
    pub url: Url,

    /// Response headers, lower-cased; repeated headers are joined with `, `
    pub headers: HeaderSet,

    /// Raw `set-cookie` values in the order received
    pub set_cookies: Vec<String>,

    /// Response body decoded as text
    pub body: String,

    /// The headers the request was sent with, including `cookie`
    pub request_headers: HeaderSet,
}

impl SpiderResponse {
    /// Returns a response header by (case-insensitive) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Returns a header of the request that produced this response
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Received a response and read its body
    Success(SpiderResponse),

    /// No response at all (connection refused, timeout, DNS, ...)
    NoResponse {
        /// Error description
        error: String,
    },

    /// A response arrived but its body could not be read
    UnreadableBody {
        /// The HTTP status code
        status_code: u16,
        /// Error description
        error: String,
    },
}

/// Builds the HTTP client shared by every request of one spider
///
/// Header values come from the header sets, so the client itself sets no
/// default headers. The pool is capped at `max_sockets` idle connections per
/// host; the number of requests in flight is bounded separately by the
/// spider's semaphore.
///
/// # Example
///
/// ```no_run
/// use spider_probe::crawler::{build_http_client, SpiderOptions};
///
/// let client = build_http_client(&SpiderOptions::default()).unwrap();
/// ```
pub fn build_http_client(options: &SpiderOptions) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(options.request_timeout)
        .connect_timeout(options.request_timeout)
        .pool_max_idle_per_host(options.max_sockets)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends one GET request with exactly the given headers
///
/// Header names or values that are not valid HTTP are skipped with a
/// warning rather than failing the request.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `headers` - The header set to send
///
/// # Returns
///
/// A FetchResult indicating success or the type of failure
pub async fn fetch_url(client: &Client, url: &Url, headers: &HeaderSet) -> FetchResult {
    let request = client.get(url.clone()).headers(to_header_map(headers));

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            // Classify error
            let error = if e.is_timeout() {
                format!("Request timeout: {}", e)
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            return FetchResult::NoResponse { error };
        }
    };

    let status = response.status().as_u16();
    let final_url = response.url().clone();

    let set_cookies: Vec<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();

    let mut response_headers = HeaderSet::new();
    for (name, value) in response.headers() {
        let Ok(value) = value.to_str() else {
            continue;
        };
        response_headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    match response.text().await {
        Ok(body) => FetchResult::Success(SpiderResponse {
            status,
            url: final_url,
            headers: response_headers,
            set_cookies,
            body,
            request_headers: headers.clone(),
        }),
        Err(e) => FetchResult::UnreadableBody {
            status_code: status,
            error: e.to_string(),
        },
    }
}

fn to_header_map(headers: &HeaderSet) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid request header {}: {}", name, value),
        }
    }
    map
}
