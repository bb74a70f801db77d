//! Output module: reporters for test results
//!
//! This module handles:
//! - The `Reporter` event interface used by the suite manager's report walk
//! - Console output with a pass/fail summary
//! - JUnit XML, as one document or one file per suite
//! - Resolving reporters from configuration keys

mod console;
mod junit;
mod registry;
mod traits;

pub use console::ConsoleReporter;
pub use junit::{report_file_stem, JUnitReporter, MultiFileJUnitReporter};
pub use registry::{ReporterFactory, ReporterRegistry};
pub use traits::{ReportError, ReportResult, Reporter};
