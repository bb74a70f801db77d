use crate::url::ResolvedUrl;
use crate::UrlError;
use url::{ParseError, Position, Url};

const DEFAULT_PROTOCOL: &str = "http:";
const DEFAULT_HOSTNAME: &str = "localhost";
const DEFAULT_PORT: &str = "80";

/// Resolves a user supplied URL string into a [`ResolvedUrl`]
///
/// Missing parts are defaulted:
///
/// - protocol → `http:`
/// - hostname → `localhost`
/// - port → the scheme's default port, else `80`
/// - path → `/`, and a relative path gets a leading `/`
///
/// Input without a scheme (e.g. `hello`) is treated as a bare path.
///
/// # Examples
///
/// ```
/// use spider_probe::url::resolve_url;
///
/// let url = resolve_url("hello").unwrap();
/// assert_eq!(url.host, "localhost:80");
/// assert_eq!(url.href, "http://localhost:80/hello");
/// ```
pub fn resolve_url(raw: &str) -> Result<ResolvedUrl, UrlError> {
    let raw = raw.trim();

    let (protocol, hostname, port, path) = match Url::parse(raw) {
        Ok(parsed) => {
            let protocol = format!("{}:", parsed.scheme());
            let hostname = parsed
                .host_str()
                .filter(|h| !h.is_empty())
                .unwrap_or(DEFAULT_HOSTNAME)
                .to_string();
            let port = parsed
                .port_or_known_default()
                .map(|p| p.to_string())
                .unwrap_or_else(|| DEFAULT_PORT.to_string());
            let path = parsed[Position::BeforePath..Position::AfterQuery].to_string();
            (protocol, hostname, port, path)
        }
        Err(ParseError::RelativeUrlWithoutBase) => (
            DEFAULT_PROTOCOL.to_string(),
            DEFAULT_HOSTNAME.to_string(),
            DEFAULT_PORT.to_string(),
            raw.split('#').next().unwrap_or_default().to_string(),
        ),
        Err(e) => return Err(UrlError::Parse(format!("{}: {}", raw, e))),
    };

    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    };

    let host = format!("{}:{}", hostname, port);
    let href = format!("{}//{}{}", protocol, host, path);

    Ok(ResolvedUrl {
        protocol,
        hostname,
        port,
        host,
        path,
        href,
    })
}

/// Resolves every URL in order
pub fn resolve_many<S: AsRef<str>>(raw_urls: &[S]) -> Result<Vec<ResolvedUrl>, UrlError> {
    raw_urls.iter().map(|raw| resolve_url(raw.as_ref())).collect()
}
