use crate::UrlError;
use url::{Position, Url};

/// Removes everything from the first `#` onwards
///
/// # Examples
///
/// ```
/// use spider_probe::url::strip_fragment;
///
/// assert_eq!(strip_fragment("http://a.com/page#top"), "http://a.com/page");
/// assert_eq!(strip_fragment("http://a.com/page"), "http://a.com/page");
/// ```
pub fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Parses a URL into the canonical form used as a frontier key
///
/// # Normalization Steps
///
/// 1. Strip the fragment
/// 2. Parse; reject if malformed
/// 3. Require a host
///
/// The `url` crate lower-cases the host and drops ports that equal the
/// scheme default, so `http://LOCALHOST:80/a` and `http://localhost/a`
/// produce the same key.
///
/// # Arguments
///
/// * `url_str` - The URL string to canonicalize
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URL without fragment
/// * `Err(UrlError)` - Failed to parse the URL or it has no host
pub fn canonical_href(url_str: &str) -> Result<Url, UrlError> {
    let stripped = strip_fragment(url_str.trim());
    let url = Url::parse(stripped).map_err(|e| UrlError::Parse(format!("{}: {}", stripped, e)))?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost(stripped.to_string())),
    }
}

/// Returns the `hostname:port` key routes are registered under
///
/// The port is always explicit, falling back to the scheme default, which
/// matches the `host` field of a resolved start URL.
pub fn host_key(url: &Url) -> String {
    let hostname = url.host_str().unwrap_or_default();
    match url.port_or_known_default() {
        Some(port) => format!("{}:{}", hostname, port),
        None => hostname.to_string(),
    }
}

/// Returns the part of the URL after the host: path plus query
pub fn request_path(url: &Url) -> &str {
    &url[Position::BeforePath..Position::AfterQuery]
}
