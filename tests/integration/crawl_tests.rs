//! Integration tests for test runs
//!
//! These tests use wiremock to create mock HTTP servers and run test files
//! against full crawls end-to-end.

use spider_probe::config::RunConfig;
use spider_probe::crawler::{route_callback, Discovery, Spider, SpiderError, SpiderOptions};
use spider_probe::url::host_key;
use spider_probe::output::{Reporter, ReporterRegistry};
use spider_probe::suite::{ensure, ensure_eq, Counts, SuiteError, SuiteManager, TestOutcome};
use spider_probe::topics::{TestCase, TestFile, TestSet};
use spider_probe::{SpiderProbeError, TestRunner, Topic};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX_PAGE: &str = r#"<html>
<head>
    <title>Index</title>
    <link rel="stylesheet" href="testCss/some.css">
    <script src="/testJs/app.js"></script>
</head>
<body>
    <a href="/testFolder/index.html">folder</a>
    <a href="/testFolder/index.html#top">folder again</a>
    <img src="/img/logo.png">
</body>
</html>"#;

const FOLDER_PAGE: &str = r#"<html>
<head><title>Folder</title></head>
<body>
    <a href="/testIndex.html">back</a>
    <a href="testFolder2/page.html">deeper</a>
</body>
</html>"#;

struct Quiet;

impl Reporter for Quiet {}

fn quiet() -> Vec<Box<dyn Reporter>> {
    vec![Box::new(Quiet)]
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=UTF-8")
}

fn run_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.idle_timeout = Duration::from_secs(2);
    config
}

/// Mounts the index and folder pages; every other path is a 404
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/testIndex.html"))
        .respond_with(html(INDEX_PAGE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/testFolder/index.html"))
        .respond_with(html(FOLDER_PAGE))
        .mount(server)
        .await;
}

fn status_is(expected: u16) -> TestCase {
    TestCase::new(move |context, _, _| {
        ensure_eq(context.response.status, expected, "status code")?;
        Ok(())
    })
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/testIndex.html"))
        .respond_with(html(INDEX_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/testFolder/index.html"))
        .respond_with(html(FOLDER_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let files = vec![TestFile::new("html.rs").topic(
        "HTML pages",
        Topic::new(r"\.html$").test_case("should respond", status_is(200)),
    )];

    let suites = SuiteManager::shared();
    let runner = TestRunner::new(run_config(), suites.clone());
    let start = format!("{}/testIndex.html", server.uri());
    let totals = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await
        .unwrap();

    // testIndex and testFolder/index pass, testFolder/testFolder2/page.html is a 404
    assert_eq!(totals.tests, 3);
    assert_eq!(totals.success, 2);
    assert_eq!(totals.failed, 1);

    let manager = suites.lock().unwrap();
    let index = manager.suite(&start).unwrap();
    assert_eq!(index.topic("HTML pages").unwrap().results().len(), 1);

    // The resources the index links to were all requested
    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    for resource in ["/testCss/some.css", "/testJs/app.js", "/img/logo.png"] {
        assert_eq!(
            requested.iter().filter(|p| p.as_str() == resource).count(),
            1,
            "{} requested {:?}",
            resource,
            requested
        );
    }
}

#[tokio::test]
async fn test_header_variants_get_their_own_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/testIndex.html"))
        .and(header("accept-language", "ja-jp"))
        .respond_with(html("<html><body>こんにちは</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/testIndex.html"))
        .respond_with(html("<html><body>Hello</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let files = vec![
        TestFile::new("english.rs").topic(
            "English",
            Topic::new("testIndex.html").test("says hello", |context, _, _| {
                ensure(context.response.body.contains("Hello"), "expected English")?;
                Ok(())
            }),
        ),
        TestFile::new("japanese.rs").topic(
            "Japanese",
            Topic::new("testIndex.html")
                .header("Accept-Language", "ja-jp")
                .test("says konnichiwa", |context, _, _| {
                    ensure_eq(
                        context.response.request_header("accept-language"),
                        Some("ja-jp"),
                        "accept-language",
                    )?;
                    ensure(context.response.body.contains("こんにちは"), "expected Japanese")?;
                    Ok(())
                }),
        ),
    ];

    let suites = SuiteManager::shared();
    let runner = TestRunner::new(run_config(), suites.clone());
    let start = format!("{}/testIndex.html", server.uri());
    let totals = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await
        .unwrap();

    assert_eq!(
        totals,
        Counts {
            tests: 2,
            success: 2,
            failed: 0,
            errors: 0
        }
    );

    let manager = suites.lock().unwrap();
    let suite = manager.suite(&start).unwrap();
    let topics: Vec<&str> = suite.topics().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(topics.len(), 2);
    assert!(topics.contains(&"English"));
    assert!(topics.contains(&"Japanese"));
}

#[tokio::test]
async fn test_mixins_and_path_variables() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let mut common = TestSet::new();
    common.insert("HTML responses should have a statusCode of 200", status_is(200));

    let files = vec![TestFile::new("folder.rs").mixin("common", common).topic(
        "Folder pages",
        Topic::new("/:parentFolder/index.html")
            .include("common")
            .test("The parent folder should be :parentFolder", |context, _, vars| {
                ensure_eq(
                    context.url.path(),
                    format!("/{}/index.html", vars["parentFolder"]).as_str(),
                    "path",
                )?;
                Ok(())
            }),
    )];

    let suites = SuiteManager::shared();
    let runner = TestRunner::new(run_config(), suites.clone());
    let start = format!("{}/testIndex.html", server.uri());
    let totals = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await
        .unwrap();

    assert_eq!(totals.tests, 2);
    assert!(totals.all_passed());

    let manager = suites.lock().unwrap();
    let folder = manager
        .suite(&format!("{}/testFolder/index.html", server.uri()))
        .unwrap();
    let names: Vec<&str> = folder
        .topic("Folder pages")
        .unwrap()
        .results()
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "The parent folder should be testFolder",
            "HTML responses should have a statusCode of 200"
        ]
    );
}

#[tokio::test]
async fn test_continue_spidering_false_stops_discovery() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/testIndex.html"))
        .respond_with(html(INDEX_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/testFolder/index.html"))
        .respond_with(html(FOLDER_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let files = vec![TestFile::new("index.rs").topic(
        "Index only",
        Topic::new("testIndex.html")
            .continue_spidering(false)
            .test_case("should respond", status_is(200)),
    )];

    let runner = TestRunner::new(run_config(), SuiteManager::shared());
    let start = format!("{}/testIndex.html", server.uri());
    let totals = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await
        .unwrap();

    assert_eq!(totals.tests, 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failures_and_errors_are_classified() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let files = vec![TestFile::new("outcomes.rs").topic(
        "Outcomes",
        Topic::new("testIndex.html")
            .continue_spidering(false)
            .test("passes", |_, _, _| Ok(()))
            .test("fails", |context, _, _| {
                ensure_eq(context.response.status, 404, "status code")?;
                Ok(())
            })
            .test("errors", |_, _, _| Err(anyhow::anyhow!("database unavailable").into()))
            .test("panics on assert", |_, _, _| {
                assert_eq!(1, 2);
                Ok(())
            }),
    )];

    let suites = SuiteManager::shared();
    let runner = TestRunner::new(run_config(), suites.clone());
    let start = format!("{}/testIndex.html", server.uri());
    let totals = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await
        .unwrap();

    assert_eq!(
        totals,
        Counts {
            tests: 4,
            success: 1,
            failed: 2,
            errors: 1
        }
    );

    let manager = suites.lock().unwrap();
    let results = manager
        .suite(&start)
        .unwrap()
        .topic("Outcomes")
        .unwrap()
        .results();
    match &results[1].outcome {
        TestOutcome::Fail(failure) => {
            assert_eq!(failure.name, "AssertionError");
            assert_eq!(failure.message, "status code: expected 404, got 200");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    match &results[2].outcome {
        TestOutcome::Error(failure) => assert!(failure.message.contains("database unavailable")),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_assertion_aborts_run() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let files = vec![TestFile::new("todo.rs").topic(
        "Unfinished",
        Topic::new("testIndex.html").test_case("not written yet", TestCase::without_assertion()),
    )];

    let runner = TestRunner::new(run_config(), SuiteManager::shared());
    let start = format!("{}/testIndex.html", server.uri());
    let result = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await;

    assert!(matches!(
        result,
        Err(SpiderProbeError::Suite(SuiteError::MissingAssertion { .. }))
    ));
}

#[tokio::test]
async fn test_cookies_are_retained() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            html(r#"<html><body><a href="/account">account</a></body></html>"#)
                .insert_header("set-cookie", "session=abc123; Path=/; HttpOnly"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(html("<html><body>Account</body></html>"))
        .mount(&server)
        .await;

    let cookie_test = |expected: Option<&'static str>| {
        vec![TestFile::new("cookies.rs").topic(
            "Account",
            Topic::new("/account$").test("cookie header", move |context, _, _| {
                ensure_eq(context.response.request_header("cookie"), expected, "cookie")?;
                Ok(())
            }),
        )]
    };
    let start = format!("{}/login", server.uri());

    let runner = TestRunner::new(run_config(), SuiteManager::shared());
    let totals = runner
        .run_test_files(&[start.as_str()], cookie_test(Some("session=abc123")), &mut quiet())
        .await
        .unwrap();
    assert_eq!(totals.success, 1);

    let mut config = run_config();
    config.spider.retain_cookies = false;
    let runner = TestRunner::new(config, SuiteManager::shared());
    let totals = runner
        .run_test_files(&[start.as_str()], cookie_test(None), &mut quiet())
        .await
        .unwrap();
    assert_eq!(totals.success, 1);
}

#[tokio::test]
async fn test_multiple_start_urls() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html("<html><body>home</body></html>"))
            .expect(1)
            .mount(server)
            .await;
    }

    let files = vec![TestFile::new("home.rs").topic(
        "Home",
        Topic::new(".*").test_case("should respond", status_is(200)),
    )];

    let suites = SuiteManager::shared();
    let runner = TestRunner::new(run_config(), suites.clone());
    let starts = [first.uri(), second.uri()];
    let totals = runner.run_test_files(&starts, files, &mut quiet()).await.unwrap();

    assert_eq!(totals.tests, 2);
    let manager = suites.lock().unwrap();
    assert_eq!(manager.suites().len(), 2);
    assert!(manager.suite(&format!("{}/", first.uri())).is_some());
    assert!(manager.suite(&format!("{}/", second.uri())).is_some());
}

#[tokio::test]
async fn test_strict_missing_route_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="http://unrouted.invalid/page.html">away</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    let files = vec![TestFile::new("home.rs").topic(
        "Home",
        Topic::new(".*").test_case("should respond", status_is(200)),
    )];

    let start = server.uri();

    // Skipped by default
    let runner = TestRunner::new(run_config(), SuiteManager::shared());
    let totals = runner
        .run_test_files(&[start.as_str()], files.clone(), &mut quiet())
        .await
        .unwrap();
    assert_eq!(totals.tests, 1);

    let mut config = run_config();
    config.spider.throw_on_missing_route = true;
    let runner = TestRunner::new(config, SuiteManager::shared());
    let result = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await;
    assert!(matches!(
        result,
        Err(SpiderProbeError::Spider(SpiderError::NoRouteForHost { .. }))
    ));
}

#[tokio::test]
async fn test_run_from_toml_test_dir() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let tests_dir = TempDir::new().unwrap();
    std::fs::write(
        tests_dir.path().join("index.toml"),
        r#"
[mixins.common."HTML responses should have a statusCode of 200"]
expect = "status"
equals = 200

[topics."Index tests"]
url-pattern = "testIndex.html"
include = "common"

[topics."Index tests".tests."The first css link should be testCss/some.css"]
expect = "element"
selector = "head link"
attribute = "href"
equals = "testCss/some.css"

[topics."Index tests".tests."The page should be served as HTML"]
expect = "header"
name = "Content-Type"
contains = "text/html"

[topics."Folder pages"]
url-pattern = "/:folder/index.html"

[topics."Folder pages".tests."The page should link back from :folder"]
expect = "element"
selector = "a"
attribute = "href"
equals = "/testIndex.html"
"#,
    )
    .unwrap();

    let report_dir = TempDir::new().unwrap();
    let options = format!(r#"{{"outputDir": "{}"}}"#, report_dir.path().display());
    let mut reporters = ReporterRegistry::new()
        .resolve("multi-junit", Some(&options))
        .unwrap();

    let runner = TestRunner::new(run_config(), SuiteManager::shared());
    let start = format!("{}/testIndex.html", server.uri());
    let totals = runner
        .run_tests(&[start.as_str()], tests_dir.path(), None, &mut reporters)
        .await
        .unwrap();

    assert_eq!(
        totals,
        Counts {
            tests: 4,
            success: 4,
            failed: 0,
            errors: 0
        }
    );

    let reports: Vec<_> = std::fs::read_dir(report_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(reports.len(), 2, "{:?}", reports);
    assert!(reports.iter().all(|name| name.ends_with(".xml")));
}

#[tokio::test]
async fn test_html_helper_sets_content_type() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let files = vec![TestFile::new("type.rs").topic(
        "Index",
        Topic::new("testIndex.html").test("content type is html", |context, _, _| {
            ensure_eq(
                context.response.headers.get("content-type").map(String::as_str),
                Some("text/html; charset=UTF-8"),
                "content type",
            )?;
            Ok(())
        }),
    )];
    let start = format!("{}/testIndex.html", server.uri());

    let runner = TestRunner::new(run_config(), SuiteManager::shared());
    let totals = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await
        .unwrap();
    assert_eq!(totals.tests, 1);
    assert_eq!(totals.success, 1);
}

#[tokio::test]
async fn test_slow_response_within_request_timeout_is_tested() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.html"))
        .respond_with(html("<html><body>slow</body></html>").set_delay(Duration::from_millis(1500)))
        .mount(&server)
        .await;

    let files = vec![TestFile::new("slow.rs").topic(
        "Slow",
        Topic::new("slow.html").test_case("should respond", status_is(200)),
    )];
    let start = format!("{}/slow.html", server.uri());

    let runner = TestRunner::new(RunConfig::default(), SuiteManager::shared());
    let totals = runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await
        .unwrap();
    assert_eq!(totals.tests, 1);
    assert_eq!(totals.success, 1);
}

/// Crawls the server root with both host spellings of the server routed,
/// returning every URL a route callback ran for
async fn crawl_both_hosts(server: &MockServer, options: SpiderOptions) -> Vec<String> {
    let base = Url::parse(&server.uri()).unwrap();
    let port = base.port().unwrap();
    let visited = Arc::new(Mutex::new(Vec::new()));
    let sink = visited.clone();

    let spider = Spider::new(options).unwrap();
    spider
        .route(
            &[host_key(&base), format!("localhost:{}", port)],
            ".*",
            route_callback(move |_, _, href| {
                sink.lock().unwrap().push(href.to_string());
                Discovery::Continue
            }),
        )
        .unwrap();

    spider.get(&format!("{}/", server.uri()), None).unwrap();
    spider.wait_idle(Duration::from_secs(2)).await;
    spider.shutdown().await;

    let mut visited = visited.lock().unwrap().clone();
    visited.sort();
    visited
}

#[tokio::test]
async fn test_cross_domain_links_followed_only_when_enabled() {
    let server = MockServer::start().await;
    let port = Url::parse(&server.uri()).unwrap().port().unwrap();
    let other = format!("http://localhost:{}/other.html", port);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><body><a href="{}">elsewhere</a></body></html>"#,
            other
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/other.html"))
        .respond_with(html("<html><body>other</body></html>"))
        .mount(&server)
        .await;

    let visited = crawl_both_hosts(&server, SpiderOptions::default()).await;
    assert_eq!(visited, vec![format!("{}/", server.uri())]);

    let options = SpiderOptions {
        spider_cross_domain: true,
        ..SpiderOptions::default()
    };
    let visited = crawl_both_hosts(&server, options).await;
    assert_eq!(visited, vec![format!("{}/", server.uri()), other]);
}

/// A start URL on a port nothing listens on
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

#[tokio::test]
async fn test_no_response_is_logged_or_fatal() {
    let files = || {
        vec![TestFile::new("down.rs").topic(
            "Down",
            Topic::new(".*").test_case("should respond", status_is(200)),
        )]
    };
    let start = closed_port_url();

    let runner = TestRunner::new(run_config(), SuiteManager::shared());
    let totals = runner
        .run_test_files(&[start.as_str()], files(), &mut quiet())
        .await
        .unwrap();
    assert_eq!(totals.tests, 0);

    let mut config = run_config();
    config.spider.throw_on_no_response = true;
    let runner = TestRunner::new(config, SuiteManager::shared());
    let result = runner
        .run_test_files(&[start.as_str()], files(), &mut quiet())
        .await;
    assert!(matches!(
        result,
        Err(SpiderProbeError::Spider(SpiderError::NoResponse { .. }))
    ));
}

#[tokio::test]
async fn test_unreadable_body_is_logged_or_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"definitely not gzip".to_vec(), "text/html")
                .insert_header("content-encoding", "gzip"),
        )
        .mount(&server)
        .await;

    let files = || {
        vec![TestFile::new("broken.rs").topic(
            "Broken",
            Topic::new(".*").test_case("should respond", status_is(200)),
        )]
    };
    let start = format!("{}/", server.uri());

    let runner = TestRunner::new(run_config(), SuiteManager::shared());
    let totals = runner
        .run_test_files(&[start.as_str()], files(), &mut quiet())
        .await
        .unwrap();
    assert_eq!(totals.tests, 0);

    let mut config = run_config();
    config.spider.throw_on_failed_parse = true;
    let runner = TestRunner::new(config, SuiteManager::shared());
    let result = runner
        .run_test_files(&[start.as_str()], files(), &mut quiet())
        .await;
    assert!(matches!(
        result,
        Err(SpiderProbeError::Spider(SpiderError::ResponseParse { .. }))
    ));
}

#[tokio::test]
async fn test_current_url_set_only_during_callback() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let base = Url::parse(&server.uri()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let spider = Spider::new(SpiderOptions::default()).unwrap();
    spider
        .route(
            &[host_key(&base)],
            "testIndex.html",
            route_callback(move |context, _, href| {
                sink.lock()
                    .unwrap()
                    .push((href.to_string(), context.spider.current_url()));
                Discovery::Halt
            }),
        )
        .unwrap();

    let start = format!("{}/testIndex.html", server.uri());
    assert_eq!(spider.current_url(), None);
    spider.get(&start, None).unwrap();
    spider.wait_idle(Duration::from_secs(2)).await;

    assert_eq!(*seen.lock().unwrap(), vec![(start.clone(), Some(start))]);
    assert_eq!(spider.current_url(), None);
}

#[tokio::test]
async fn test_descriptions_recorded_for_reports() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let files = vec![TestFile::new("described.rs").topic(
        "Index tests",
        Topic::new("testIndex.html")
            .description("The start page")
            .test_case("should respond", status_is(200)),
    )];
    let start = format!("{}/testIndex.html", server.uri());

    let suites = SuiteManager::shared();
    let runner = TestRunner::new(run_config(), suites.clone());
    runner
        .run_test_files(&[start.as_str()], files, &mut quiet())
        .await
        .unwrap();

    let manager = suites.lock().unwrap();
    let suite = manager.suite(&start).unwrap();
    assert_eq!(suite.description.as_deref(), Some("Index"));
    assert_eq!(
        suite.topic("Index tests").unwrap().description.as_deref(),
        Some("The start page")
    );
}
