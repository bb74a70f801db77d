//! Suite manager: assertion execution and result aggregation
//!
//! Results are grouped as suite (one per fetched URL) → topic → test
//! result. Identical results are stored once, so a response handled twice
//! does not inflate the counts.

mod assertion;
mod manager;
mod results;

pub use assertion::{ensure, ensure_eq, AssertFn, AssertionError, TestError};
pub use manager::{SharedSuiteManager, SuiteManager, TestExecution};
pub use results::{
    Counts, SuiteResults, TestFailure, TestOutcome, TestResult, TopicOutcome, TopicResults,
};

use thiserror::Error;

/// Errors raised while running a test, as opposed to a test failing
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Test '{test}' of topic '{topic}' does not have an assert function")]
    MissingAssertion { topic: String, test: String },
}
