//! Human readable console report

use crate::output::traits::{display_name, ReportResult, Reporter};
use crate::suite::{Counts, SuiteResults, TestFailure, TestResult, TopicOutcome, TopicResults};
use std::io::{self, Write};
use std::time::Duration;

const RED: &str = "\u{1b}[31m";
const GREEN: &str = "\u{1b}[32m";
const RESET_COLOR: &str = "\u{1b}[39m";
const BOLD: &str = "\u{1b}[1m";
const RESET_BOLD: &str = "\u{1b}[22m";

fn ok(s: &str) -> String {
    format!("{}{}{}", GREEN, s, RESET_COLOR)
}

fn error(s: &str) -> String {
    format!("{}{}{}", RED, s, RESET_COLOR)
}

fn bold(s: &str) -> String {
    format!("{}{}{}", BOLD, s, RESET_BOLD)
}

/// Prints suites, topics and tests with ✔/✖/❎ markers and a summary line
pub struct ConsoleReporter {
    out: Box<dyn Write + Send>,
}

impl ConsoleReporter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }
}

impl Reporter for ConsoleReporter {
    fn suite_start(&mut self, suite: &SuiteResults) -> ReportResult<()> {
        let name = display_name(&suite.name, suite.description.as_deref());
        writeln!(self.out, "{}", bold(&format!("\n{}", name)))?;
        Ok(())
    }

    fn topic_start(&mut self, _suite: &SuiteResults, topic: &TopicResults) -> ReportResult<()> {
        let name = display_name(&topic.name, topic.description.as_deref());
        let line = match topic.outcome() {
            TopicOutcome::Pass => ok(&bold(&format!("\n✔ {}", name))),
            TopicOutcome::Error => error(&bold(&format!("\n❎ {}", name))),
            TopicOutcome::Fail => error(&bold(&format!("\n✖ {}", name))),
            TopicOutcome::NoTests => error(&bold(&format!("\n? {} (NO TESTS FOUND)", name))),
        };
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    fn test_success(&mut self, _topic: &TopicResults, test: &TestResult) -> ReportResult<()> {
        writeln!(self.out, "    ✔ {}", test.name)?;
        Ok(())
    }

    fn test_failure(
        &mut self,
        _topic: &TopicResults,
        test: &TestResult,
        failure: &TestFailure,
    ) -> ReportResult<()> {
        writeln!(self.out, "    ✖ {}", test.name)?;
        writeln!(self.out, "        {}: {}", failure.name, failure.message)?;
        writeln!(self.out, "          in {}", test.test_file)?;
        Ok(())
    }

    fn test_error(
        &mut self,
        _topic: &TopicResults,
        test: &TestResult,
        failure: &TestFailure,
    ) -> ReportResult<()> {
        writeln!(self.out, "    ❎ {}\n", test.name)?;
        writeln!(self.out, "        {}: {}", failure.name, failure.message)?;
        Ok(())
    }

    fn suites_end(&mut self, totals: &Counts, _time: Duration) -> ReportResult<()> {
        let summary = format!(
            "\nTests: {}, Passed: {}, Failed: {}, Errors: {}",
            totals.tests, totals.success, totals.failed, totals.errors
        );
        let line = if totals.all_passed() {
            bold(&ok(&summary))
        } else {
            bold(&error(&summary))
        };
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }
}
