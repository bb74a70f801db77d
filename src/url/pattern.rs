//! `:placeholder` path patterns
//!
//! Topic URL patterns may contain path segments such as `/:parentFolder/`.
//! These helpers turn such a pattern into a regular expression source,
//! extract the concrete segment values from a matching path, and substitute
//! those values back into free text such as test names.

use regex::Regex;
use std::collections::HashMap;

/// Placeholder name (without the leading `:`) to the concrete path segment
pub type PathVariables = HashMap<String, String>;

const WILDCARD: &str = ".*";

/// Characters that end a word when substituting placeholders in text.
/// `:` is deliberately absent so `:name` stays one token.
const WORD_SEPARATORS: &[char] = &[
    ' ', ',', '"', '\'', ';', '.', '{', '}', '[', ']', '(', ')', '?', '!', '/', '-', '_', '<',
    '>', '@', '€', '#', '£', '$', '%', '\\', '`',
];

/// Replaces every `/`-separated segment starting with `:` by `.*`
///
/// # Examples
///
/// ```
/// use spider_probe::url::replace_placeholders_with_wildcard;
///
/// assert_eq!(replace_placeholders_with_wildcard("/a/:b/c"), "/a/.*/c");
/// assert_eq!(replace_placeholders_with_wildcard(":a"), ".*");
/// ```
pub fn replace_placeholders_with_wildcard(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with(':') {
                WILDCARD
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Determines the values of the placeholders in `path_with_placeholders`
///
/// The wildcard form of the pattern is matched (unanchored) against `path`.
/// When it does not match, or is not a valid regular expression, the result
/// is empty. Otherwise each `:name` segment captures the segment at the same
/// position in `path`.
///
/// # Examples
///
/// ```
/// use spider_probe::url::determine_path_variable_values;
///
/// let vars = determine_path_variable_values("/1/2/3", "/:one/:two/:three");
/// assert_eq!(vars["one"], "1");
/// assert_eq!(vars["three"], "3");
/// ```
pub fn determine_path_variable_values(path: &str, path_with_placeholders: &str) -> PathVariables {
    match Regex::new(&replace_placeholders_with_wildcard(path_with_placeholders)) {
        Ok(wildcard) => extract_path_variables(path, path_with_placeholders, &wildcard),
        Err(e) => {
            tracing::debug!("Invalid placeholder pattern '{}': {}", path_with_placeholders, e);
            PathVariables::new()
        }
    }
}

/// Like [`determine_path_variable_values`], with the wildcard form of the
/// pattern already compiled
pub fn extract_path_variables(
    path: &str,
    path_with_placeholders: &str,
    wildcard: &Regex,
) -> PathVariables {
    let mut values = PathVariables::new();
    if !wildcard.is_match(path) {
        return values;
    }

    let path_segments: Vec<&str> = path.split('/').collect();
    for (i, segment) in path_with_placeholders.split('/').enumerate() {
        if let Some(name) = segment.strip_prefix(':') {
            if let Some(value) = path_segments.get(i) {
                values.insert(name.to_string(), value.to_string());
            }
        }
    }

    values
}

/// Substitutes `:name` tokens in `s` with their values
///
/// Words are delimited by a fixed set of punctuation and whitespace
/// characters (never `:`), and every separator is kept in place. A token
/// ending in `:` keeps that colon after the substituted value. Unknown
/// placeholders become `undefined`.
///
/// # Examples
///
/// ```
/// use spider_probe::url::{replace_placeholders_in_string, PathVariables};
///
/// let mut vals = PathVariables::new();
/// vals.insert("two".to_string(), "2".to_string());
///
/// assert_eq!(
///     replace_placeholders_in_string("URL /images/:two/img.png", &vals),
///     "URL /images/2/img.png"
/// );
/// ```
pub fn replace_placeholders_in_string(s: &str, values: &PathVariables) -> String {
    let mut replaced = String::with_capacity(s.len());
    let mut word = String::new();

    for c in s.chars() {
        if WORD_SEPARATORS.contains(&c) {
            push_word(&mut replaced, &word, values);
            word.clear();
            replaced.push(c);
        } else {
            word.push(c);
        }
    }
    push_word(&mut replaced, &word, values);

    replaced
}

fn push_word(out: &mut String, word: &str, values: &PathVariables) {
    let Some(placeholder) = word.strip_prefix(':') else {
        out.push_str(word);
        return;
    };

    let (name, suffix) = match placeholder.strip_suffix(':') {
        Some(name) => (name, ":"),
        None => (placeholder, ""),
    };

    match values.get(name) {
        Some(value) => out.push_str(value),
        None => out.push_str("undefined"),
    }
    out.push_str(suffix);
}
