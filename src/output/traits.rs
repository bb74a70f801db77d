//! Reporter trait and associated error type
//!
//! A reporter receives the events of one walk over the suite manager's
//! results. Every method has a no-op default so implementations only
//! override what they render.

use crate::suite::{Counts, SuiteResults, TestFailure, TestResult, TopicResults};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reporting
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reporting operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Receives the results of a test run
///
/// Events arrive in this order:
///
/// ```text
/// suites_start
///   suite_start
///     topic_start
///       test_start, test_success | test_failure | test_error, test_end
///     topic_end
///   suite_end
/// suites_end
/// ```
pub trait Reporter: Send {
    /// Called once before anything else
    fn suites_start(&mut self) -> ReportResult<()> {
        Ok(())
    }

    /// Called for each suite; the suite already holds its final counts
    fn suite_start(&mut self, _suite: &SuiteResults) -> ReportResult<()> {
        Ok(())
    }

    fn topic_start(&mut self, _suite: &SuiteResults, _topic: &TopicResults) -> ReportResult<()> {
        Ok(())
    }

    fn test_start(&mut self, _topic: &TopicResults, _test: &TestResult) -> ReportResult<()> {
        Ok(())
    }

    fn test_success(&mut self, _topic: &TopicResults, _test: &TestResult) -> ReportResult<()> {
        Ok(())
    }

    fn test_failure(
        &mut self,
        _topic: &TopicResults,
        _test: &TestResult,
        _failure: &TestFailure,
    ) -> ReportResult<()> {
        Ok(())
    }

    fn test_error(
        &mut self,
        _topic: &TopicResults,
        _test: &TestResult,
        _failure: &TestFailure,
    ) -> ReportResult<()> {
        Ok(())
    }

    fn test_end(&mut self, _topic: &TopicResults, _test: &TestResult) -> ReportResult<()> {
        Ok(())
    }

    fn topic_end(&mut self, _suite: &SuiteResults, _topic: &TopicResults) -> ReportResult<()> {
        Ok(())
    }

    fn suite_end(&mut self, _suite: &SuiteResults) -> ReportResult<()> {
        Ok(())
    }

    /// Called once after everything else with the totals of the run
    fn suites_end(&mut self, _totals: &Counts, _time: Duration) -> ReportResult<()> {
        Ok(())
    }
}

/// `name - description`, or just `name`
pub(crate) fn display_name(name: &str, description: Option<&str>) -> String {
    match description {
        Some(description) if !description.is_empty() => format!("{} - {}", name, description),
        _ => name.to_string(),
    }
}
