//! Test run orchestration
//!
//! Wires one [`Spider`] per start URL to the topic matcher and the shared
//! [`SuiteManager`], waits for every crawl to finish and generates the
//! report.

use crate::config::RunConfig;
use crate::crawler::{route_callback, Completion, Discovery, Spider};
use crate::headers::HeaderSet;
use crate::output::Reporter;
use crate::suite::{Counts, SharedSuiteManager};
use crate::topics::{build_header_provider, execute_matching_topics, load_test_files, TestFile};
use crate::url::{resolve_many, ResolvedUrl};
use crate::{ConfigError, SpiderProbeError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Restores the process working directory when dropped
struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    fn change_to(dir: &Path) -> std::io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        tracing::debug!("Working directory set to {}", dir.display());
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            tracing::warn!(
                "Failed to restore working directory {}: {}",
                self.previous.display(),
                e
            );
        }
    }
}

/// Runs test files against crawls of one or more start URLs
pub struct TestRunner {
    config: RunConfig,
    suites: SharedSuiteManager,
}

impl TestRunner {
    pub fn new(config: RunConfig, suites: SharedSuiteManager) -> Self {
        Self { config, suites }
    }

    pub fn suites(&self) -> &SharedSuiteManager {
        &self.suites
    }

    /// Loads the test files below `tests_dir` and runs them
    ///
    /// When `working_dir` is given the files are loaded with it as the
    /// current directory, so relative paths resolve against it; the
    /// previous directory is restored afterwards.
    pub async fn run_tests<S: AsRef<str>>(
        &self,
        start_urls: &[S],
        tests_dir: &Path,
        working_dir: Option<&Path>,
        reporters: &mut [Box<dyn Reporter>],
    ) -> crate::Result<Counts> {
        let test_files = {
            let _guard = working_dir.map(WorkingDirGuard::change_to).transpose()?;
            load_test_files(tests_dir)?
        };

        self.run_test_files(start_urls, test_files, reporters).await
    }

    /// Crawls every start URL, runs the matching tests and reports
    ///
    /// Results of a previous run are discarded first. Returns the total
    /// counts of the report.
    pub async fn run_test_files<S: AsRef<str>>(
        &self,
        start_urls: &[S],
        test_files: Vec<TestFile>,
        reporters: &mut [Box<dyn Reporter>],
    ) -> crate::Result<Counts> {
        if test_files.is_empty() {
            return Err(ConfigError::Validation("no test files to run".to_string()).into());
        }

        let started = Instant::now();
        self.suites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clean();

        let start = resolve_many(start_urls)?;
        let test_files = Arc::new(test_files);
        let defaults = self.config.spider.default_headers.clone();
        let failure: Arc<Mutex<Option<SpiderProbeError>>> = Arc::new(Mutex::new(None));

        let mut spiders = Vec::with_capacity(start.len());
        let mut fatal: Option<SpiderProbeError> = None;
        for resolved in &start {
            match self.start_spider(resolved, &test_files, &defaults, &failure) {
                Ok(spider) => spiders.push(spider),
                Err(e) => {
                    fatal = Some(e);
                    break;
                }
            }
        }

        // Shut down every spider, also on error, before reporting
        for spider in &spiders {
            if fatal.is_none()
                && spider.wait_idle(self.config.idle_timeout).await == Completion::IdleTimeout
            {
                tracing::warn!(
                    "Stopped waiting after {:?} without progress; {} request(s) still pending",
                    spider.effective_idle_timeout(self.config.idle_timeout),
                    spider.pending()
                );
            }
            spider.shutdown().await;
            if let Some(e) = spider.take_fatal() {
                fatal.get_or_insert(e.into());
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        let failure = failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(e) = failure {
            return Err(e);
        }

        let seen: usize = spiders.iter().map(Spider::seen_urls).sum();
        tracing::info!("Crawled {} URL(s) in {:.2?}", seen, started.elapsed());

        let manager = self
            .suites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let totals = manager.generate_report(reporters)?;
        Ok(totals)
    }

    /// Creates the spider for one start URL, routes its host to the topic
    /// matcher and requests the start URL
    fn start_spider(
        &self,
        resolved: &ResolvedUrl,
        test_files: &Arc<Vec<TestFile>>,
        defaults: &HeaderSet,
        failure: &Arc<Mutex<Option<SpiderProbeError>>>,
    ) -> crate::Result<Spider> {
        tracing::info!("Spidering {}", resolved.href);

        let spider = Spider::new(self.config.spider.clone())?;
        let files = test_files.clone();
        let suites = self.suites.clone();
        let callback_defaults = defaults.clone();
        let failure_slot = failure.clone();

        spider.route(
            &[resolved.host.as_str()],
            ".*",
            route_callback(move |context, document, href| {
                if failure_slot
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .is_some()
                {
                    return Discovery::Halt;
                }

                match execute_matching_topics(
                    context,
                    document,
                    href,
                    &files,
                    &callback_defaults,
                    &suites,
                ) {
                    Ok(true) => Discovery::Continue,
                    Ok(false) => Discovery::Halt,
                    Err(e) => {
                        tracing::error!("Aborting test run at {}: {}", href, e);
                        failure_slot
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .get_or_insert(e);
                        Discovery::Halt
                    }
                }
            }),
        )?;

        let provider = build_header_provider(test_files.clone(), defaults.clone());
        spider.get(&resolved.href, Some(provider))?;
        Ok(spider)
    }
}
