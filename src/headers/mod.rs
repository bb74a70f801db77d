//! Request header utilities
//!
//! Header sets are plain maps from lower-cased header name to value. Two
//! header sets are compared ignoring the headers that vary per request
//! (`cookie`, `content-length`, `referer`) so a topic's declared request
//! headers can be matched against the headers of the request that was
//! actually sent.

mod cookies;

pub use cookies::{build_cookie_header, cookie_pair, extract_header_cookies};

use serde_json::Value;
use std::collections::BTreeMap;

/// Header name (lower case) to header value
pub type HeaderSet = BTreeMap<String, String>;

/// Headers left out of header set comparisons
const IGNORED_HEADERS: &[&str] = &["cookie", "content-length", "referer"];

const DEFAULT_USER_AGENT: &str = concat!("spider-probe/", env!("CARGO_PKG_VERSION"));

/// The header set sent when no topic asks for anything else
pub fn default_headers() -> HeaderSet {
    [
        (
            "accept",
            "application/xml,application/xhtml+xml,text/html;q=0.9,text/plain;q=0.8,image/png,image/jpg,*/*;q=0.5",
        ),
        ("accept-language", "en-US,en;q=0.8"),
        ("accept-charset", "ISO-8859-1,utf-8;q=0.7,*;q=0.3"),
        ("user-agent", DEFAULT_USER_AGENT),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

/// Parses `s` as JSON, returning it unchanged as a JSON string if it isn't
///
/// # Examples
///
/// ```
/// use spider_probe::headers::objectify;
///
/// assert_eq!(objectify("hello"), serde_json::json!("hello"));
/// assert_eq!(objectify(r#"{"outputDir": "/tmp"}"#)["outputDir"], "/tmp");
/// ```
pub fn objectify(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

/// Returns a copy of `headers` with every name lower-cased
///
/// Names that collide after folding keep the value that comes last in the
/// map's iteration order.
pub fn object_keys_to_lower_case(headers: &HeaderSet) -> HeaderSet {
    headers
        .iter()
        .map(|(name, value)| (name.to_lowercase(), value.clone()))
        .collect()
}

/// Compares two header sets by name (case-insensitively) and value
///
/// `cookie`, `content-length` and `referer` are removed from both sides
/// first. The sets are equal when every remaining header exists on both
/// sides with the same value.
///
/// # Examples
///
/// ```
/// use spider_probe::headers::{headers_equal, HeaderSet};
///
/// let mut a = HeaderSet::new();
/// a.insert("User-Agent".to_string(), "Android".to_string());
/// let mut b = a.clone();
/// b.insert("referer".to_string(), "http://example.com/".to_string());
///
/// assert!(headers_equal(&a, &b));
/// ```
pub fn headers_equal(h1: &HeaderSet, h2: &HeaderSet) -> bool {
    comparable(h1) == comparable(h2)
}

/// Returns true if any set in `sets` is [`headers_equal`] to `target`
pub fn contains_headers(sets: &[HeaderSet], target: &HeaderSet) -> bool {
    let target = object_keys_to_lower_case(target);
    sets.iter()
        .any(|set| headers_equal(&object_keys_to_lower_case(set), &target))
}

/// Overlays `overrides` on `base`, lower-casing the override names
pub fn merge_headers(base: &HeaderSet, overrides: &HeaderSet) -> HeaderSet {
    let mut merged = object_keys_to_lower_case(base);
    merged.extend(object_keys_to_lower_case(overrides));
    merged
}

fn comparable(headers: &HeaderSet) -> HeaderSet {
    let mut lowered = object_keys_to_lower_case(headers);
    for ignored in IGNORED_HEADERS {
        lowered.remove(*ignored);
    }
    lowered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_objectify() {
        assert_eq!(objectify("hello"), Value::String("hello".to_string()));
        assert_eq!(objectify(r#"{"outputDir": "/tmp"}"#)["outputDir"], "/tmp");
    }

    #[test]
    fn test_headers_equal_ignores_noise_headers() {
        let h1 = headers(&[("accept-language", "ja-jp"), ("user-agent", "Android")]);
        let h2 = headers(&[
            ("user-agent", "Android"),
            ("accept-language", "ja-jp"),
            ("content-length", "0"),
            ("cookie", "a cookie"),
            ("referer", "no-one"),
        ]);

        assert!(headers_equal(&h1, &h2));
        assert!(headers_equal(&h2, &h1));
    }

    #[test]
    fn test_headers_equal_different_values() {
        let h1 = headers(&[("accept-language", "ja-jp"), ("user-agent", "Android")]);
        let h2 = headers(&[
            ("user-agent", "iOS"),
            ("accept-language", "ja-jp"),
            ("content-length", "0"),
            ("referer", "no-one"),
        ]);

        assert!(!headers_equal(&h1, &h2));
        assert!(!headers_equal(&h2, &h1));
    }

    #[test]
    fn test_headers_equal_only_noise_headers() {
        let h1 = headers(&[("referer", "http://localhost:54054/testImages/original.jpg")]);
        let h2 = headers(&[
            ("referer", "http://localhost:54054/testImages/original.jpg"),
            ("content-length", "0"),
        ]);

        assert!(headers_equal(&h1, &h2));
        assert!(headers_equal(&h2, &h1));
    }

    #[test]
    fn test_headers_equal_is_case_insensitive_on_names() {
        let h1 = headers(&[("User-Agent", "Test")]);
        let h2 = headers(&[("user-agent", "Test")]);
        assert!(headers_equal(&h1, &h2));
    }

    #[test]
    fn test_headers_equal_subset_is_not_equal() {
        let h1 = headers(&[("user-agent", "Test")]);
        let h2 = headers(&[("user-agent", "Test"), ("accept-charset", "UTF-8")]);
        assert!(!headers_equal(&h1, &h2));
        assert!(!headers_equal(&h2, &h1));
    }

    #[test]
    fn test_contains_headers() {
        let target = headers(&[("accept-charset", "UTF-8"), ("user-agent", "Test")]);
        let ua_only = headers(&[("user-agent", "Test")]);

        assert!(contains_headers(&[target.clone()], &target));
        assert!(!contains_headers(&[], &target));
        assert!(!contains_headers(&[ua_only.clone()], &target));
        assert!(contains_headers(&[ua_only.clone(), target.clone()], &target));
        assert!(contains_headers(&[target.clone(), ua_only.clone()], &target));
        assert!(contains_headers(
            &[ua_only.clone(), target.clone(), headers(&[("content-length", "0")])],
            &target
        ));
        assert!(!contains_headers(
            &[headers(&[("accept-charset", "UTF-16")]), ua_only],
            &target
        ));
    }

    #[test]
    fn test_object_keys_to_lower_case() {
        let lowered = object_keys_to_lower_case(&headers(&[
            ("Accept-Charset", "UTF-8"),
            ("User-Agent", "Test"),
        ]));

        assert!(!lowered.contains_key("Accept-Charset"));
        assert_eq!(lowered["accept-charset"], "UTF-8");
        assert!(!lowered.contains_key("User-Agent"));
        assert_eq!(lowered["user-agent"], "Test");
    }

    #[test]
    fn test_merge_headers_overrides() {
        let merged = merge_headers(
            &default_headers(),
            &headers(&[("User-Agent", "Android"), ("x-custom", "1")]),
        );
        assert_eq!(merged["user-agent"], "Android");
        assert_eq!(merged["x-custom"], "1");
        assert!(merged.contains_key("accept-language"));
    }
}
