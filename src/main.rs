//! Spider-Probe main entry point
//!
//! This is the command-line interface for the Spider-Probe test runner.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use spider_probe::config::{parse_config, validate, Config};
use spider_probe::output::ReporterRegistry;
use spider_probe::{SuiteManager, TestRunner};
use tracing_subscriber::EnvFilter;

/// Spider-Probe: crawl a website and test every page it finds
///
/// Starting from one or more URLs, Spider-Probe follows links, images,
/// scripts and stylesheets, and runs the tests of every topic whose URL
/// pattern matches a fetched page.
#[derive(Parser, Debug)]
#[command(name = "spider-probe")]
#[command(version = "1.0.0")]
#[command(about = "A crawling integration test runner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// URL to start spidering from; may be repeated
    #[arg(short = 's', long = "start", value_name = "URL")]
    start: Vec<String>,

    /// Directory containing the test files
    #[arg(short = 't', long, value_name = "DIR")]
    test_dir: Option<PathBuf>,

    /// Working directory while test files are loaded
    #[arg(short = 'w', long, value_name = "DIR")]
    working_dir: Option<PathBuf>,

    /// Comma separated reporters (console, junit, multi-junit)
    #[arg(short = 'r', long, value_name = "KEYS")]
    reporters: Option<String>,

    /// Reporter options, e.g. '{"outputDir": "reports"}'
    #[arg(long, value_name = "OPTIONS")]
    reporter_options: Option<String>,

    /// Milliseconds without progress before a crawl is considered done
    #[arg(long, value_name = "MS")]
    idle_timeout: Option<u64>,

    /// Maximum number of concurrent requests per start URL
    #[arg(long, value_name = "N")]
    max_sockets: Option<usize>,

    /// Abort when a discovered URL has no route
    #[arg(long)]
    fail_on_missing_route: bool,

    /// Abort when a request gets no response
    #[arg(long)]
    fail_on_no_response: bool,

    /// Abort when a response body cannot be read
    #[arg(long)]
    fail_on_parse_error: bool,

    /// Follow links to other hosts
    #[arg(long)]
    spider_cross_domain: bool,

    /// Do not send back cookies set by previous responses
    #[arg(long)]
    no_cookies: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and list the test files without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(2)
        }
    }
}

/// Runs the tests; returns whether every test passed
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(true);
    }

    let mut reporters = ReporterRegistry::new()
        .resolve(&config.reporters, config.reporter_options.as_deref())?;

    let runner = TestRunner::new(config.run_config(), SuiteManager::shared());
    let totals = runner
        .run_tests(
            &config.spider_start,
            &config.test_dir,
            config.working_dir.as_deref(),
            &mut reporters,
        )
        .await?;

    tracing::info!(
        "{} test(s): {} passed, {} failed, {} errors",
        totals.tests,
        totals.success,
        totals.failed,
        totals.errors
    );
    Ok(totals.all_passed())
}

/// Loads the configuration file, if any, and applies command line overrides
fn build_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            parse_config(path)?
        }
        None => {
            let test_dir = cli
                .test_dir
                .clone()
                .ok_or("either --config or --test-dir is required")?;
            Config::new(Vec::new(), test_dir)
        }
    };

    if !cli.start.is_empty() {
        config.spider_start = cli.start.clone();
    }
    if let Some(test_dir) = &cli.test_dir {
        config.test_dir = test_dir.clone();
    }
    if let Some(working_dir) = &cli.working_dir {
        config.working_dir = Some(working_dir.clone());
    }
    if let Some(reporters) = &cli.reporters {
        config.reporters = reporters.clone();
    }
    if let Some(options) = &cli.reporter_options {
        config.reporter_options = Some(options.clone());
    }
    if let Some(idle_timeout) = cli.idle_timeout {
        config.idle_timeout_ms = idle_timeout;
    }
    if let Some(max_sockets) = cli.max_sockets {
        config.max_sockets = max_sockets;
    }
    config.spider.fail_on_missing_route |= cli.fail_on_missing_route;
    config.spider.fail_on_no_response |= cli.fail_on_no_response;
    config.spider.fail_on_parse_error |= cli.fail_on_parse_error;
    config.spider.spider_cross_domain |= cli.spider_cross_domain;
    if cli.no_cookies {
        config.spider.retain_cookies = false;
    }

    config.test_dir = absolute(&config.test_dir)?;

    validate(&config)?;
    Ok(config)
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spider_probe=info,warn"),
            1 => EnvFilter::new("spider_probe=debug,info"),
            2 => EnvFilter::new("spider_probe=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be run
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Spider-Probe Dry Run ===\n");

    println!("Start URLs ({}):", config.spider_start.len());
    for url in &config.spider_start {
        println!("  - {}", url);
    }

    println!("\nSpider:");
    println!("  Max sockets: {}", config.max_sockets);
    println!("  Idle timeout: {}ms", config.idle_timeout_ms);
    println!("  Retain cookies: {}", config.spider.retain_cookies);
    println!("  Cross domain: {}", config.spider.spider_cross_domain);

    println!("\nReporters: {}", config.reporters);

    let files = spider_probe::topics::discover_test_files(&config.test_dir)?;
    println!("\nTest files in {} ({}):", config.test_dir.display(), files.len());
    for file in &files {
        println!("  - {}", file.display());
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}
