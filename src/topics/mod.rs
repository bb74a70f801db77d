//! Test topics: what to assert, and where
//!
//! A [`TestFile`] holds named [`Topic`]s, each a URL pattern plus the tests
//! to run against every response whose URL matches it. Files are written
//! in TOML with declarative [`Check`]s, or built in code with closure
//! assertions.

mod checks;
mod loader;
mod matcher;
mod types;

pub use checks::Check;
pub use loader::{discover_test_files, load_test_file, load_test_files, parse_test_file};
pub use matcher::{
    build_header_provider, effective_headers, execute_matching_topics, find_matching_topics,
    page_title, resolve_continue_directive, resolve_mixins,
};
pub use types::{Mixins, TestCase, TestFile, TestSet, Topic};

use thiserror::Error;

/// Errors in how topics are defined
#[derive(Debug, Error)]
pub enum TopicError {
    #[error("Reference made to non-existing mixin: {0}")]
    NoSuchMixin(String),

    #[error("Invalid URL pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}
