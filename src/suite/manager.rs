use crate::crawler::RouteContext;
use crate::output::{ConsoleReporter, ReportResult, Reporter};
use crate::suite::{
    Counts, SuiteError, SuiteResults, TestError, TestFailure, TestOutcome, TestResult,
};
use crate::topics::TestCase;
use crate::url::PathVariables;
use scraper::Html;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A suite manager shared between spiders and the runner
pub type SharedSuiteManager = Arc<Mutex<SuiteManager>>;

/// Everything needed to run one test against one response
pub struct TestExecution<'a> {
    /// Suite name: the fetched URL
    pub suite: &'a str,
    /// Recorded when the suite has no description yet
    pub suite_description: Option<&'a str>,
    pub topic: &'a str,
    pub topic_description: Option<&'a str>,
    pub test_name: &'a str,
    pub test: &'a TestCase,
    pub test_file: &'a str,
    pub context: &'a RouteContext,
    pub document: &'a Html,
    pub path_variables: &'a PathVariables,
}

/// Runs assertions and keeps their results, grouped by suite and topic
#[derive(Debug, Default)]
pub struct SuiteManager {
    suites: Vec<SuiteResults>,
}

impl SuiteManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSuiteManager {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Runs the test's assertion and records its outcome
    ///
    /// The suite and topic are created on first use. A test without an
    /// assertion is a configuration error, not a failed test.
    ///
    /// Classification:
    /// - `Ok(())` → pass
    /// - `Err(TestError::Assertion)` → fail
    /// - `Err(TestError::Unexpected)` → error
    /// - a panic whose message starts with `assertion` (as raised by
    ///   `assert!` and friends) → fail, any other panic → error
    pub fn run_suite_test(&mut self, request: TestExecution<'_>) -> Result<(), SuiteError> {
        let suite = self.suite_mut(request.suite);
        if suite.description.is_none() {
            suite.description = request.suite_description.map(str::to_string);
        }
        let topic = suite.topic_mut(request.topic);
        if topic.description.is_none() {
            topic.description = request.topic_description.map(str::to_string);
        }

        let Some(assertion) = request.test.assertion() else {
            return Err(SuiteError::MissingAssertion {
                topic: request.topic.to_string(),
                test: request.test_name.to_string(),
            });
        };

        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            assertion(request.context, request.document, request.path_variables)
        }));
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(Ok(())) => TestOutcome::Pass,
            Ok(Err(TestError::Assertion(e))) => {
                TestOutcome::Fail(TestFailure::new("AssertionError", e.message))
            }
            Ok(Err(TestError::Unexpected(e))) => {
                TestOutcome::Error(TestFailure::new("Error", format!("{:#}", e)))
            }
            Err(payload) => classify_panic(payload.as_ref()),
        };

        tracing::debug!(
            "{} / {} / {}: {:?}",
            request.suite,
            request.topic,
            request.test_name,
            outcome
        );

        topic.add(TestResult::new(
            request.test_name,
            outcome,
            request.test_file,
            elapsed,
        ));
        Ok(())
    }

    /// Walks every suite, topic and result once, notifying each reporter
    /// of every event in turn
    ///
    /// With no reporters the results go to a [`ConsoleReporter`] on stdout.
    /// Returns the totals over all suites.
    pub fn generate_report(&self, reporters: &mut [Box<dyn Reporter>]) -> ReportResult<Counts> {
        if reporters.is_empty() {
            let mut fallback: Vec<Box<dyn Reporter>> = vec![Box::new(ConsoleReporter::stdout())];
            return self.walk(&mut fallback);
        }
        self.walk(reporters)
    }

    fn walk(&self, reporters: &mut [Box<dyn Reporter>]) -> ReportResult<Counts> {
        notify(reporters, |r| r.suites_start())?;

        for suite in &self.suites {
            notify(reporters, |r| r.suite_start(suite))?;

            for topic in suite.topics() {
                notify(reporters, |r| r.topic_start(suite, topic))?;

                for test in topic.results() {
                    notify(reporters, |r| r.test_start(topic, test))?;
                    match &test.outcome {
                        TestOutcome::Pass => notify(reporters, |r| r.test_success(topic, test))?,
                        TestOutcome::Fail(failure) => {
                            notify(reporters, |r| r.test_failure(topic, test, failure))?
                        }
                        TestOutcome::Error(failure) => {
                            notify(reporters, |r| r.test_error(topic, test, failure))?
                        }
                    }
                    notify(reporters, |r| r.test_end(topic, test))?;
                }

                notify(reporters, |r| r.topic_end(suite, topic))?;
            }

            notify(reporters, |r| r.suite_end(suite))?;
        }

        let totals = self.totals();
        let time = self.total_time();
        notify(reporters, |r| r.suites_end(&totals, time))?;
        Ok(totals)
    }

    /// Forgets every recorded result
    pub fn clean(&mut self) {
        self.suites.clear();
    }

    pub fn suites(&self) -> &[SuiteResults] {
        &self.suites
    }

    pub fn suite(&self, name: &str) -> Option<&SuiteResults> {
        self.suites.iter().find(|s| s.name == name)
    }

    pub fn totals(&self) -> Counts {
        let mut totals = Counts::default();
        for suite in &self.suites {
            totals.add(&suite.counts());
        }
        totals
    }

    pub fn total_time(&self) -> Duration {
        self.suites.iter().map(SuiteResults::time).sum()
    }

    fn suite_mut(&mut self, name: &str) -> &mut SuiteResults {
        let index = match self.suites.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.suites.push(SuiteResults::new(name));
                self.suites.len() - 1
            }
        };
        &mut self.suites[index]
    }
}

fn notify<F>(reporters: &mut [Box<dyn Reporter>], mut event: F) -> ReportResult<()>
where
    F: FnMut(&mut dyn Reporter) -> ReportResult<()>,
{
    for reporter in reporters.iter_mut() {
        event(reporter.as_mut())?;
    }
    Ok(())
}

fn classify_panic(payload: &(dyn std::any::Any + Send)) -> TestOutcome {
    let message = crate::crawler::panic_message(payload);
    if message.starts_with("assertion") {
        TestOutcome::Fail(TestFailure::new("AssertionError", message))
    } else {
        TestOutcome::Error(TestFailure::new("Panic", message))
    }
}
