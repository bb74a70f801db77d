//! URL handling module for Spider-Probe
//!
//! This module provides start-URL resolution, the canonical URL forms the
//! spider keys its frontier and routes on, and the `:placeholder` path
//! pattern helpers used by test topics.

mod normalize;
mod pattern;
mod resolve;

// Re-export main functions
pub use normalize::{canonical_href, host_key, request_path, strip_fragment};
pub use pattern::{
    determine_path_variable_values, extract_path_variables, replace_placeholders_in_string,
    replace_placeholders_with_wildcard, PathVariables,
};
pub use resolve::{resolve_many, resolve_url};

/// A user supplied URL resolved to an absolute form with explicit port
///
/// All fields are derived once by [`resolve_url`] and never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    /// Scheme including the trailing colon, e.g. `http:`
    pub protocol: String,

    /// Host name without port
    pub hostname: String,

    /// Port as a string, `80` when none was given
    pub port: String,

    /// `hostname:port`
    pub host: String,

    /// Absolute path including any query string
    pub path: String,

    /// `protocol//hostname:port` followed by `path`
    pub href: String,
}
