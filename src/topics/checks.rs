//! Declarative checks for TOML test files
//!
//! Each test in a TOML file names the kind of check with `expect` and
//! carries its expected values:
//!
//! ```toml
//! [topics."Index tests".tests."The page should have a title"]
//! expect = "element"
//! selector = "head title"
//! equals = "Home"
//! ```
//!
//! Expected strings may contain `:name` placeholders, which are replaced by
//! the path variables bound from the topic's URL pattern.

use crate::crawler::RouteContext;
use crate::suite::{ensure, ensure_eq, AssertionError, TestError};
use crate::topics::TestCase;
use crate::url::{replace_placeholders_in_string, PathVariables};
use scraper::{Html, Selector};
use serde::Deserialize;

/// Expected values for a piece of text, placeholders already filled in
#[derive(Debug, Default)]
struct TextMatch {
    equals: Option<String>,
    contains: Option<String>,
    absent: bool,
}

/// One declarative check
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "expect", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Check {
    /// Response status code
    Status { equals: u16 },

    /// A response header
    Header {
        name: String,
        equals: Option<String>,
        contains: Option<String>,
        #[serde(default)]
        absent: bool,
    },

    /// A header of the request the response answered
    RequestHeader {
        name: String,
        equals: Option<String>,
        contains: Option<String>,
        #[serde(default)]
        absent: bool,
    },

    /// Elements selected by a CSS selector
    ///
    /// `equals` and `contains` look at the first selected element: its
    /// `attribute` when given, its text otherwise. With no expectation at
    /// all the check requires at least one element.
    Element {
        selector: String,
        attribute: Option<String>,
        equals: Option<String>,
        contains: Option<String>,
        count: Option<usize>,
        exists: Option<bool>,
    },

    /// The response body
    Body { contains: String },
}

impl Check {
    /// Wraps the check in a test case
    pub fn into_test_case(self) -> TestCase {
        TestCase::new(move |context, document, path_variables| {
            self.verify(context, document, path_variables)
        })
    }

    pub fn verify(
        &self,
        context: &RouteContext,
        document: &Html,
        path_variables: &PathVariables,
    ) -> Result<(), TestError> {
        let fill = |s: &str| substitute(s, path_variables);

        match self {
            Check::Status { equals } => {
                ensure_eq(context.response.status, *equals, "status code")?;
            }
            Check::Header {
                name,
                equals,
                contains,
                absent,
            } => {
                let expected = TextMatch {
                    equals: equals.as_deref().map(fill),
                    contains: contains.as_deref().map(fill),
                    absent: *absent,
                };
                check_text(
                    &format!("response header '{}'", name),
                    context.response.header(name),
                    &expected,
                )?;
            }
            Check::RequestHeader {
                name,
                equals,
                contains,
                absent,
            } => {
                let expected = TextMatch {
                    equals: equals.as_deref().map(fill),
                    contains: contains.as_deref().map(fill),
                    absent: *absent,
                };
                check_text(
                    &format!("request header '{}'", name),
                    context.response.request_header(name),
                    &expected,
                )?;
            }
            Check::Element {
                selector,
                attribute,
                equals,
                contains,
                count,
                exists,
            } => {
                let parsed = Selector::parse(selector).map_err(|e| {
                    TestError::Unexpected(anyhow::anyhow!("invalid selector '{}': {}", selector, e))
                })?;
                let elements: Vec<_> = document.select(&parsed).collect();

                if let Some(count) = count {
                    ensure_eq(
                        elements.len(),
                        *count,
                        &format!("number of elements matching '{}'", selector),
                    )?;
                }
                match exists {
                    Some(true) => ensure(
                        !elements.is_empty(),
                        format!("expected an element matching '{}'", selector),
                    )?,
                    Some(false) => ensure(
                        elements.is_empty(),
                        format!(
                            "expected no element matching '{}', found {}",
                            selector,
                            elements.len()
                        ),
                    )?,
                    None => {}
                }

                if equals.is_none() && contains.is_none() {
                    if count.is_none() && exists.is_none() {
                        ensure(
                            !elements.is_empty(),
                            format!("expected an element matching '{}'", selector),
                        )?;
                    }
                    return Ok(());
                }

                let first = elements.first().ok_or_else(|| {
                    AssertionError::new(format!("no element matches '{}'", selector))
                })?;
                let (what, value) = match attribute {
                    Some(attribute) => (
                        format!("attribute '{}' of '{}'", attribute, selector),
                        first.value().attr(attribute).map(str::to_string),
                    ),
                    None => (
                        format!("text of '{}'", selector),
                        Some(first.text().collect::<String>().trim().to_string()),
                    ),
                };
                let expected = TextMatch {
                    equals: equals.as_deref().map(fill),
                    contains: contains.as_deref().map(fill),
                    absent: false,
                };
                check_text(&what, value.as_deref(), &expected)?;
            }
            Check::Body { contains } => {
                let expected = fill(contains);
                ensure(
                    context.response.body.contains(&expected),
                    format!("expected the body to contain {:?}", expected),
                )?;
            }
        }
        Ok(())
    }
}

/// Replaces placeholders only when the pattern bound any
fn substitute(s: &str, path_variables: &PathVariables) -> String {
    if path_variables.is_empty() {
        s.to_string()
    } else {
        replace_placeholders_in_string(s, path_variables)
    }
}

fn check_text(what: &str, actual: Option<&str>, expected: &TextMatch) -> Result<(), AssertionError> {
    if expected.absent {
        return ensure(
            actual.is_none(),
            format!("expected {} to be absent, got {:?}", what, actual.unwrap_or_default()),
        );
    }

    let Some(actual) = actual else {
        return Err(AssertionError::new(format!("{} is missing", what)));
    };
    if let Some(equals) = &expected.equals {
        ensure_eq(actual, equals.as_str(), what)?;
    }
    if let Some(contains) = &expected.contains {
        ensure(
            actual.contains(contains.as_str()),
            format!("expected {} to contain {:?}, got {:?}", what, contains, actual),
        )?;
    }
    Ok(())
}
