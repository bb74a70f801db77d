//! JUnit XML reports
//!
//! [`JUnitReporter`] produces a single `<testsuites>` document for the
//! whole run; [`MultiFileJUnitReporter`] writes one `<testsuite>` file per
//! suite.

use crate::output::traits::{display_name, ReportError, ReportResult, Reporter};
use crate::suite::{Counts, SuiteResults, TestFailure, TestResult, TopicResults};
use chrono::{SecondsFormat, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Escapes text for use inside an XML attribute value
fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            c if (c as u32) < 0x20 => {}
            c => escaped.push(c),
        }
    }
    escaped
}

fn seconds(time: Duration) -> String {
    format!("{:.3}", time.as_secs_f64())
}

/// Host name recorded on every `<testsuite>`
fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

/// Accumulates the XML of `<testsuite>` elements
#[derive(Debug, Default)]
struct SuiteXml {
    xml: String,
    classname: String,
    hostname: String,
}

impl SuiteXml {
    fn new() -> Self {
        Self {
            hostname: hostname(),
            ..Self::default()
        }
    }

    fn open_suite(&mut self, suite: &SuiteResults, indent: &str) {
        let counts = suite.counts();
        let name = display_name(&suite.name, suite.description.as_deref());
        self.xml.push_str(&format!(
            "{}<testsuite name=\"{}\" timestamp=\"{}\" hostname=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{}\">\n",
            indent,
            escape_attr(&name),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            escape_attr(&self.hostname),
            counts.tests,
            counts.failed,
            counts.errors,
            seconds(suite.time()),
        ));
    }

    fn close_suite(&mut self, indent: &str) {
        self.xml.push_str(&format!("{}</testsuite>\n", indent));
    }

    fn set_topic(&mut self, topic: &TopicResults) {
        self.classname = display_name(&topic.name, topic.description.as_deref());
    }

    fn open_testcase(&mut self, test: &TestResult, indent: &str) {
        self.xml.push_str(&format!(
            "{}  <testcase name=\"{}\" classname=\"{}\" time=\"{}\">\n",
            indent,
            escape_attr(&test.name),
            escape_attr(&self.classname),
            seconds(test.time),
        ));
    }

    fn problem(&mut self, element: &str, failure: &TestFailure, indent: &str) {
        self.xml.push_str(&format!(
            "{}    <{} name=\"{}\" message=\"{}\"/>\n",
            indent,
            element,
            escape_attr(&failure.name),
            escape_attr(&failure.message),
        ));
    }

    fn close_testcase(&mut self, indent: &str) {
        self.xml.push_str(&format!("{}  </testcase>\n", indent));
    }

    fn push(&mut self, text: &str) {
        self.xml.push_str(text);
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.xml)
    }
}

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn write_file(path: &Path, contents: &str) -> ReportResult<()> {
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Emits one `<testsuites>` document, to stdout or to `output_file`
pub struct JUnitReporter {
    output_file: Option<PathBuf>,
    doc: SuiteXml,
}

impl JUnitReporter {
    pub fn new(output_file: Option<PathBuf>) -> Self {
        Self {
            output_file,
            doc: SuiteXml::new(),
        }
    }
}

impl Reporter for JUnitReporter {
    fn suites_start(&mut self) -> ReportResult<()> {
        self.doc.take();
        self.doc.push(XML_DECLARATION);
        self.doc.push("<testsuites>\n");
        Ok(())
    }

    fn suite_start(&mut self, suite: &SuiteResults) -> ReportResult<()> {
        self.doc.open_suite(suite, "  ");
        Ok(())
    }

    fn topic_start(&mut self, _suite: &SuiteResults, topic: &TopicResults) -> ReportResult<()> {
        self.doc.set_topic(topic);
        Ok(())
    }

    fn test_start(&mut self, _topic: &TopicResults, test: &TestResult) -> ReportResult<()> {
        self.doc.open_testcase(test, "  ");
        Ok(())
    }

    fn test_failure(
        &mut self,
        _topic: &TopicResults,
        _test: &TestResult,
        failure: &TestFailure,
    ) -> ReportResult<()> {
        self.doc.problem("failure", failure, "  ");
        Ok(())
    }

    fn test_error(
        &mut self,
        _topic: &TopicResults,
        _test: &TestResult,
        failure: &TestFailure,
    ) -> ReportResult<()> {
        self.doc.problem("error", failure, "  ");
        Ok(())
    }

    fn test_end(&mut self, _topic: &TopicResults, _test: &TestResult) -> ReportResult<()> {
        self.doc.close_testcase("  ");
        Ok(())
    }

    fn suite_end(&mut self, _suite: &SuiteResults) -> ReportResult<()> {
        self.doc.close_suite("  ");
        Ok(())
    }

    fn suites_end(&mut self, _totals: &Counts, _time: Duration) -> ReportResult<()> {
        self.doc.push("</testsuites>\n");
        let xml = self.doc.take();

        match &self.output_file {
            Some(path) => {
                write_file(path, &xml)?;
                tracing::info!("JUnit report written to {}", path.display());
            }
            None => {
                let mut out = io::stdout().lock();
                out.write_all(xml.as_bytes())?;
                out.flush()?;
            }
        }
        Ok(())
    }
}

/// Writes one JUnit file per suite into `output_dir`
pub struct MultiFileJUnitReporter {
    output_dir: PathBuf,
    doc: SuiteXml,
}

impl MultiFileJUnitReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            doc: SuiteXml::new(),
        }
    }

    /// Path of the report file for a suite
    pub fn target(&self, suite_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.xml", report_file_stem(suite_name)))
    }
}

/// Turns a suite name (a URL) into a file name stem
///
/// # Examples
///
/// ```
/// use spider_probe::output::report_file_stem;
///
/// assert_eq!(report_file_stem("http://localhost:80/a/b.html"), "localhost-80-a-b.html");
/// ```
pub fn report_file_stem(suite_name: &str) -> String {
    let without_scheme = suite_name
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(suite_name);
    without_scheme.replace(['/', ':'], "-")
}

impl Reporter for MultiFileJUnitReporter {
    fn suite_start(&mut self, suite: &SuiteResults) -> ReportResult<()> {
        self.doc.take();
        self.doc.push(XML_DECLARATION);
        self.doc.open_suite(suite, "");
        Ok(())
    }

    fn topic_start(&mut self, _suite: &SuiteResults, topic: &TopicResults) -> ReportResult<()> {
        self.doc.set_topic(topic);
        Ok(())
    }

    fn test_start(&mut self, _topic: &TopicResults, test: &TestResult) -> ReportResult<()> {
        self.doc.open_testcase(test, "");
        Ok(())
    }

    fn test_failure(
        &mut self,
        _topic: &TopicResults,
        _test: &TestResult,
        failure: &TestFailure,
    ) -> ReportResult<()> {
        self.doc.problem("failure", failure, "");
        Ok(())
    }

    fn test_error(
        &mut self,
        _topic: &TopicResults,
        _test: &TestResult,
        failure: &TestFailure,
    ) -> ReportResult<()> {
        self.doc.problem("error", failure, "");
        Ok(())
    }

    fn test_end(&mut self, _topic: &TopicResults, _test: &TestResult) -> ReportResult<()> {
        self.doc.close_testcase("");
        Ok(())
    }

    fn suite_end(&mut self, suite: &SuiteResults) -> ReportResult<()> {
        self.doc.close_suite("");
        let xml = self.doc.take();

        fs::create_dir_all(&self.output_dir).map_err(|source| ReportError::Write {
            path: self.output_dir.display().to_string(),
            source,
        })?;
        let target = self.target(&suite.name);
        write_file(&target, &xml)?;
        tracing::debug!("Suite report written to {}", target.display());
        Ok(())
    }
}
