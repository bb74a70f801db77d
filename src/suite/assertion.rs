use crate::crawler::RouteContext;
use crate::url::PathVariables;
use scraper::Html;
use std::fmt::Debug;
use thiserror::Error;

/// A mismatch between what a test expected and what the response held
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AssertionError {
    pub message: String,
}

impl AssertionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What an assertion returns when it does not pass
///
/// An `Assertion` error records the test as failed; anything else records
/// it as errored.
#[derive(Debug, Error)]
pub enum TestError {
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Assertion signature: response context, parsed document, path variables
pub type AssertFn =
    dyn Fn(&RouteContext, &Html, &PathVariables) -> Result<(), TestError> + Send + Sync;

/// Fails with `message` unless `condition` holds
///
/// # Examples
///
/// ```
/// use spider_probe::suite::ensure;
///
/// assert!(ensure(1 + 1 == 2, "arithmetic").is_ok());
/// assert_eq!(ensure(false, "nope").unwrap_err().message, "nope");
/// ```
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), AssertionError> {
    if condition {
        Ok(())
    } else {
        Err(AssertionError::new(message))
    }
}

/// Fails unless `actual == expected`, reporting both values
pub fn ensure_eq<A, E>(actual: A, expected: E, message: &str) -> Result<(), AssertionError>
where
    A: PartialEq<E> + Debug,
    E: Debug,
{
    if actual == expected {
        return Ok(());
    }
    let detail = format!("expected {:?}, got {:?}", expected, actual);
    Err(AssertionError::new(if message.is_empty() {
        detail
    } else {
        format!("{}: {}", message, detail)
    }))
}
