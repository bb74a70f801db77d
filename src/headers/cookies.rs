use crate::headers::HeaderSet;

/// Removes the `cookie` header from a header set and splits it into cookies
///
/// A header set holds at most one `cookie` header; its value is split on
/// `;` and each part trimmed. The header is removed even when empty.
pub fn extract_header_cookies(headers: &mut HeaderSet) -> Vec<String> {
    match headers.remove("cookie") {
        Some(value) => value
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Returns the `name=value` part of a cookie or `set-cookie` string
///
/// Attributes such as `Path` or `HttpOnly` are dropped.
///
/// # Examples
///
/// ```
/// use spider_probe::headers::cookie_pair;
///
/// assert_eq!(cookie_pair("session=abc; Path=/; HttpOnly"), Some("session=abc"));
/// assert_eq!(cookie_pair("  "), None);
/// ```
pub fn cookie_pair(cookie: &str) -> Option<&str> {
    let pair = cookie.split(';').next()?.trim();
    if pair.is_empty() {
        None
    } else {
        Some(pair)
    }
}

/// Joins cookies into a single `cookie` request header value
///
/// Later cookies with the same name replace earlier ones. Returns `None`
/// when there is nothing to send.
pub fn build_cookie_header<S: AsRef<str>>(cookies: &[S]) -> Option<String> {
    let mut pairs: Vec<(&str, &str)> = Vec::new();

    for cookie in cookies {
        let Some(pair) = cookie_pair(cookie.as_ref()) else {
            continue;
        };
        let name = pair.split('=').next().unwrap_or(pair).trim();
        match pairs.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = pair,
            None => pairs.push((name, pair)),
        }
    }

    if pairs.is_empty() {
        None
    } else {
        Some(
            pairs
                .into_iter()
                .map(|(_, pair)| pair)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
