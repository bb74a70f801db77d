//! Result aggregates: suite → topic → test result

use std::time::Duration;

/// The error attached to a failed or errored test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFailure {
    /// Error kind, e.g. `AssertionError`
    pub name: String,

    /// Human readable message
    pub message: String,
}

impl TestFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// How a single test ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The assertion returned normally
    Pass,

    /// The assertion reported a mismatch
    Fail(TestFailure),

    /// The assertion failed for any other reason
    Error(TestFailure),
}

impl TestOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestOutcome::Pass)
    }

    /// The attached error; `None` exactly when the test passed
    pub fn failure(&self) -> Option<&TestFailure> {
        match self {
            TestOutcome::Pass => None,
            TestOutcome::Fail(failure) | TestOutcome::Error(failure) => Some(failure),
        }
    }
}

/// The recorded result of one test execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub name: String,
    pub outcome: TestOutcome,
    pub test_file: String,

    /// Elapsed time, truncated to whole milliseconds
    pub time: Duration,
}

impl TestResult {
    pub fn new(
        name: impl Into<String>,
        outcome: TestOutcome,
        test_file: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            outcome,
            test_file: test_file.into(),
            time: Duration::from_millis(elapsed.as_millis() as u64),
        }
    }
}

/// Test counters, summed bottom-up through the aggregates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub tests: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: usize,
}

impl Counts {
    /// Counts one more test with the given outcome
    pub fn record(&mut self, outcome: &TestOutcome) {
        self.tests += 1;
        match outcome {
            TestOutcome::Pass => self.success += 1,
            TestOutcome::Fail(_) => self.failed += 1,
            TestOutcome::Error(_) => self.errors += 1,
        }
    }

    pub fn add(&mut self, other: &Counts) {
        self.tests += other.tests;
        self.success += other.success;
        self.failed += other.failed;
        self.errors += other.errors;
    }

    /// Returns true when nothing failed or errored
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Overall outcome of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicOutcome {
    Pass,
    Fail,
    Error,
    NoTests,
}

/// Results of one topic within one suite
#[derive(Debug, Clone, PartialEq)]
pub struct TopicResults {
    pub name: String,
    pub description: Option<String>,
    results: Vec<TestResult>,
    counts: Counts,
    time: Duration,
}

impl TopicResults {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            results: Vec::new(),
            counts: Counts::default(),
            time: Duration::ZERO,
        }
    }

    /// Appends a result unless an identical one is already recorded
    ///
    /// Returns whether the result was added.
    pub fn add(&mut self, result: TestResult) -> bool {
        if self.results.contains(&result) {
            return false;
        }
        self.counts.record(&result.outcome);
        self.time += result.time;
        self.results.push(result);
        true
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    /// Error beats failure beats pass; an empty topic has no outcome
    pub fn outcome(&self) -> TopicOutcome {
        if self.counts.errors > 0 {
            TopicOutcome::Error
        } else if self.counts.failed > 0 {
            TopicOutcome::Fail
        } else if self.counts.success > 0 {
            TopicOutcome::Pass
        } else {
            TopicOutcome::NoTests
        }
    }
}

/// Results of every topic run against one fetched URL
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteResults {
    /// The fetched URL
    pub name: String,
    pub description: Option<String>,
    topics: Vec<TopicResults>,
}

impl SuiteResults {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            topics: Vec::new(),
        }
    }

    /// Returns the named topic, creating it at the end if missing
    pub fn topic_mut(&mut self, name: &str) -> &mut TopicResults {
        let index = match self.topics.iter().position(|t| t.name == name) {
            Some(index) => index,
            None => {
                self.topics.push(TopicResults::new(name));
                self.topics.len() - 1
            }
        };
        &mut self.topics[index]
    }

    pub fn topic(&self, name: &str) -> Option<&TopicResults> {
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn topics(&self) -> &[TopicResults] {
        &self.topics
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for topic in &self.topics {
            counts.add(&topic.counts());
        }
        counts
    }

    pub fn time(&self) -> Duration {
        self.topics.iter().map(TopicResults::time).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(name: &str, ms: u64) -> TestResult {
        TestResult::new(name, TestOutcome::Pass, "tests/a.toml", Duration::from_millis(ms))
    }

    fn fail(name: &str) -> TestResult {
        TestResult::new(
            name,
            TestOutcome::Fail(TestFailure::new("AssertionError", "expected 200, got 404")),
            "tests/a.toml",
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_time_is_truncated_to_millis() {
        let result = TestResult::new(
            "t",
            TestOutcome::Pass,
            "f",
            Duration::from_micros(2_750),
        );
        assert_eq!(result.time, Duration::from_millis(2));
    }

    #[test]
    fn test_identical_results_are_recorded_once() {
        let mut topic = TopicResults::new("Index tests");
        assert!(topic.add(pass("a", 3)));
        assert!(!topic.add(pass("a", 3)));
        assert!(topic.add(pass("a", 4)));

        assert_eq!(topic.results().len(), 2);
        assert_eq!(topic.counts().tests, 2);
        assert_eq!(topic.time(), Duration::from_millis(7));
    }

    #[test]
    fn test_topic_outcome_precedence() {
        let mut topic = TopicResults::new("t");
        assert_eq!(topic.outcome(), TopicOutcome::NoTests);

        topic.add(pass("a", 1));
        assert_eq!(topic.outcome(), TopicOutcome::Pass);

        topic.add(fail("b"));
        assert_eq!(topic.outcome(), TopicOutcome::Fail);

        topic.add(TestResult::new(
            "c",
            TestOutcome::Error(TestFailure::new("Error", "boom")),
            "f",
            Duration::ZERO,
        ));
        assert_eq!(topic.outcome(), TopicOutcome::Error);
    }

    #[test]
    fn test_suite_sums_topics() {
        let mut suite = SuiteResults::new("http://localhost:80/");
        suite.topic_mut("one").add(pass("a", 2));
        suite.topic_mut("two").add(fail("b"));
        suite.topic_mut("one").add(pass("c", 5));

        let names: Vec<&str> = suite.topics().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(
            suite.counts(),
            Counts {
                tests: 3,
                success: 2,
                failed: 1,
                errors: 0
            }
        );
        assert_eq!(suite.time(), Duration::from_millis(8));
    }

    #[test]
    fn test_outcome_failure_accessor() {
        assert!(TestOutcome::Pass.failure().is_none());
        assert_eq!(fail("x").outcome.failure().unwrap().name, "AssertionError");
    }
}
