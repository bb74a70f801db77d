use crate::crawler::RouteContext;
use crate::headers::HeaderSet;
use crate::suite::{AssertFn, TestError};
use crate::topics::TopicError;
use crate::url::{replace_placeholders_with_wildcard, PathVariables};
use regex::Regex;
use scraper::Html;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A single test: an assertion run against every matching response
#[derive(Clone, Default)]
pub struct TestCase {
    assert: Option<Arc<AssertFn>>,
}

impl TestCase {
    pub fn new<F>(assert: F) -> Self
    where
        F: Fn(&RouteContext, &Html, &PathVariables) -> Result<(), TestError> + Send + Sync + 'static,
    {
        Self {
            assert: Some(Arc::new(assert)),
        }
    }

    /// A test with nothing to run; executing it is a configuration error
    pub fn without_assertion() -> Self {
        Self::default()
    }

    pub fn assertion(&self) -> Option<&Arc<AssertFn>> {
        self.assert.as_ref()
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("assert", &self.assert.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Named tests in declaration order
///
/// Inserting an existing name replaces that test in place.
#[derive(Debug, Clone, Default)]
pub struct TestSet {
    entries: Vec<(String, TestCase)>,
}

impl TestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, test: TestCase) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = test,
            None => self.entries.push((name, test)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, test)| test)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TestCase)> {
        self.entries.iter().map(|(name, test)| (name.as_str(), test))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mixin name to the tests it contributes
pub type Mixins = BTreeMap<String, TestSet>;

/// A group of tests applied to every URL matching `url_pattern`
#[derive(Debug, Clone)]
pub struct Topic {
    url_pattern: String,

    /// Wildcard form of `url_pattern`, compiled on first use and shared by
    /// clones
    compiled: Arc<OnceLock<Result<Regex, regex::Error>>>,

    /// Shown next to the topic name in reports
    pub description: Option<String>,

    /// Request headers overriding the defaults; the topic only runs against
    /// responses to requests sent with exactly these headers
    pub request_headers: Option<HeaderSet>,

    /// Names of mixins merged into `tests` before the topic runs
    pub include: Vec<String>,

    /// `Some(false)` stops link discovery from matching responses
    pub continue_spidering: Option<bool>,

    pub tests: TestSet,
}

impl Topic {
    pub fn new(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: url_pattern.into(),
            compiled: Arc::new(OnceLock::new()),
            description: None,
            request_headers: None,
            include: Vec::new(),
            continue_spidering: None,
            tests: TestSet::new(),
        }
    }

    /// Regular expression matched against the fetched URL; `/:name/`
    /// segments match anything and bind a path variable
    pub fn url_pattern(&self) -> &str {
        &self.url_pattern
    }

    /// The compiled wildcard form of the URL pattern
    pub fn pattern(&self) -> Result<&Regex, TopicError> {
        self.compiled
            .get_or_init(|| Regex::new(&replace_placeholders_with_wildcard(&self.url_pattern)))
            .as_ref()
            .map_err(|source| TopicError::InvalidPattern {
                pattern: self.url_pattern.clone(),
                source: source.clone(),
            })
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a closure test
    pub fn test<F>(self, name: impl Into<String>, assert: F) -> Self
    where
        F: Fn(&RouteContext, &Html, &PathVariables) -> Result<(), TestError> + Send + Sync + 'static,
    {
        self.test_case(name, TestCase::new(assert))
    }

    pub fn test_case(mut self, name: impl Into<String>, test: TestCase) -> Self {
        self.tests.insert(name, test);
        self
    }

    /// Sets one request header, creating the header set if needed
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.request_headers
            .get_or_insert_with(HeaderSet::new)
            .insert(name.to_lowercase(), value.into());
        self
    }

    pub fn include(mut self, mixin: impl Into<String>) -> Self {
        self.include.push(mixin.into());
        self
    }

    pub fn continue_spidering(mut self, proceed: bool) -> Self {
        self.continue_spidering = Some(proceed);
        self
    }
}

/// The topics and mixins of one test file
#[derive(Debug, Clone)]
pub struct TestFile {
    /// Where the tests came from; reported with every result
    pub path: String,
    pub topics: Vec<(String, Topic)>,
    pub mixins: Option<Mixins>,
}

impl TestFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            topics: Vec::new(),
            mixins: None,
        }
    }

    pub fn topic(mut self, name: impl Into<String>, topic: Topic) -> Self {
        self.topics.push((name.into(), topic));
        self
    }

    pub fn mixin(mut self, name: impl Into<String>, tests: TestSet) -> Self {
        self.mixins
            .get_or_insert_with(Mixins::new)
            .insert(name.into(), tests);
        self
    }
}
