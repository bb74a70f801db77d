//! HTML link discovery
//!
//! This module scans a parsed document for the resources the spider should
//! fetch next:
//! - `<a href="...">` (anchors)
//! - `<img src="...">` (images)
//! - `<link href="...">` (stylesheets, icons, canonical links)
//! - `<script src="...">` (scripts)

use crate::crawler::AutoDiscover;
use scraper::{Html, Selector};
use url::Url;

/// Extracts the URLs of every enabled element kind in document order
///
/// Kinds are scanned in the order anchors, images, links, scripts; within
/// a kind, elements keep their document order. Relative references are
/// resolved against `base_url`.
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only references
/// - Anything that is not HTTP(S) after resolution
///
/// # Example
///
/// ```
/// use spider_probe::crawler::{discover_links, AutoDiscover};
/// use scraper::Html;
/// use url::Url;
///
/// let html = Html::parse_document(r#"<a href="/page">Link</a><img src="a.png">"#);
/// let base = Url::parse("http://example.com/index.html").unwrap();
/// let links = discover_links(&html, &base, &AutoDiscover::all());
/// assert_eq!(links, vec!["http://example.com/page", "http://example.com/a.png"]);
/// ```
pub fn discover_links(document: &Html, base_url: &Url, auto: &AutoDiscover) -> Vec<String> {
    let mut links = Vec::new();

    let kinds = [
        (auto.anchors, "a[href]", "href"),
        (auto.images, "img[src]", "src"),
        (auto.links, "link[href]", "href"),
        (auto.scripts, "script[src]", "src"),
    ];

    for (enabled, selector, attribute) in kinds {
        if !enabled {
            continue;
        }
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attribute) {
                if let Some(absolute_url) = resolve_link(value, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    // Skip empty hrefs
    if href.is_empty() {
        return None;
    }

    // Skip special schemes
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Skip fragment-only links (same page anchors)
    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
