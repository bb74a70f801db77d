//! The spider: frontier, routing and response handling
//!
//! A [`Spider`] is a cheap handle around shared state, so route callbacks
//! and the tasks fetching each request can re-enter it with [`Spider::get`].
//! Every request runs in its own tokio task; the number of requests in
//! flight is bounded by a semaphore with `max_sockets` permits.

use crate::crawler::log::LogStream;
use crate::crawler::router::Router;
use crate::crawler::tracker::InFlight;
use crate::crawler::{
    build_http_client, discover_links, fetch_url, Completion, Discovery, FetchResult,
    HeaderProvider, LogEntry, LogLevel, LogListener, RouteCallback, SpiderError, SpiderOptions,
    SpiderResponse,
};
use crate::headers::{build_cookie_header, extract_header_cookies, object_keys_to_lower_case, HeaderSet};
use crate::url::{canonical_href, host_key, request_path};
use reqwest::Client;
use scraper::Html;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Slack on top of the request timeout before a silent crawl is abandoned
const IDLE_MARGIN: Duration = Duration::from_secs(5);

/// Context handed to a route callback
pub struct RouteContext {
    /// The spider that fetched the response
    pub spider: Spider,

    /// The response being handled
    pub response: SpiderResponse,

    /// The URL that was requested
    pub url: Url,
}

/// Crawl engine handle
#[derive(Clone)]
pub struct Spider {
    inner: Arc<SpiderInner>,
}

struct SpiderInner {
    options: SpiderOptions,
    client: Client,
    routers: RwLock<HashMap<String, Router>>,
    seen: Mutex<HashSet<String>>,
    first_hostname: Mutex<Option<String>>,
    cookies: Mutex<Vec<String>>,
    current_url: Mutex<Option<String>>,
    fatal: Mutex<Option<SpiderError>>,
    permits: Arc<Semaphore>,
    in_flight: InFlight,
    tasks: Mutex<JoinSet<()>>,
    stopped: AtomicBool,
    log: LogStream,
}

/// Locks a mutex, recovering the data if a panicking callback poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Spider {
    /// Creates a spider with its own HTTP client
    pub fn new(options: SpiderOptions) -> Result<Self, SpiderError> {
        let client = build_http_client(&options)?;
        let permits = Arc::new(Semaphore::new(options.max_sockets.max(1)));

        Ok(Self {
            inner: Arc::new(SpiderInner {
                options,
                client,
                routers: RwLock::new(HashMap::new()),
                seen: Mutex::new(HashSet::new()),
                first_hostname: Mutex::new(None),
                cookies: Mutex::new(Vec::new()),
                current_url: Mutex::new(None),
                fatal: Mutex::new(None),
                permits,
                in_flight: InFlight::new(),
                tasks: Mutex::new(JoinSet::new()),
                stopped: AtomicBool::new(false),
                log: LogStream::default(),
            }),
        })
    }

    pub fn options(&self) -> &SpiderOptions {
        &self.inner.options
    }

    /// Registers `callback` for every host in `hosts` and paths matching
    /// the regular expression `pattern`
    ///
    /// Hosts are `hostname:port` keys, e.g. `localhost:8080`. Routes of a
    /// host are tried in registration order.
    pub fn route<S: AsRef<str>>(
        &self,
        hosts: &[S],
        pattern: &str,
        callback: RouteCallback,
    ) -> Result<&Self, SpiderError> {
        let mut routers = self
            .inner
            .routers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for host in hosts {
            routers
                .entry(host.as_ref().to_lowercase())
                .or_default()
                .add_route(pattern, callback.clone())?;
        }
        Ok(self)
    }

    /// Requests `url` once per header set
    ///
    /// URLs already requested by this spider, URLs without a route, and
    /// (unless cross-domain spidering is enabled) URLs on a different
    /// hostname than the first one requested are skipped. A missing route
    /// is an error instead when `throw_on_missing_route` is set.
    ///
    /// Must be called from within a tokio runtime; the requests themselves
    /// run in spawned tasks.
    pub fn get(&self, url: &str, provider: Option<HeaderProvider>) -> Result<(), SpiderError> {
        if self.is_aborted() {
            return Ok(());
        }

        let target = match canonical_href(url) {
            Ok(target) => target,
            Err(e) => {
                self.emit(LogLevel::Debug, format!("Skipping {}: {}", url, e));
                return Ok(());
            }
        };
        let href = target.to_string();

        if !lock(&self.inner.seen).insert(href.clone()) {
            self.emit(
                LogLevel::Debug,
                format!("Already received one get request for {}. skipping.", href),
            );
            return Ok(());
        }

        let hostname = target.host_str().unwrap_or_default().to_string();
        lock(&self.inner.first_hostname).get_or_insert_with(|| hostname.clone());

        if !self.check_route(&target)? {
            return Ok(());
        }

        if !self.inner.options.spider_cross_domain {
            let first = lock(&self.inner.first_hostname).clone();
            if first.as_deref() != Some(hostname.as_str()) {
                tracing::debug!("Not following {} to another domain", href);
                return Ok(());
            }
        }

        for headers in self.header_sets(&href, provider.as_ref()) {
            let headers = self.prepare_headers(headers, &href);
            self.dispatch(target.clone(), headers, provider.clone());
        }

        Ok(())
    }

    /// Subscribes a listener printing entries at or above `level`
    pub fn log(&self, level: LogLevel) -> &Self {
        self.on_log(Box::new(move |entry: &LogEntry| {
            if entry.level >= level {
                println!("[{}] {}", entry.level, entry.message);
            }
        }))
    }

    /// Subscribes a listener to every log entry
    pub fn on_log(&self, listener: LogListener) -> &Self {
        self.inner.log.subscribe(listener);
        self
    }

    /// The URL whose route callback is running, if any
    pub fn current_url(&self) -> Option<String> {
        lock(&self.inner.current_url).clone()
    }

    /// Number of distinct URLs requested so far
    pub fn seen_urls(&self) -> usize {
        lock(&self.inner.seen).len()
    }

    /// Number of requests spawned but not yet handled
    pub fn pending(&self) -> usize {
        self.inner.in_flight.pending()
    }

    /// Waits until every request has been handled, or nothing happened for
    /// the [effective idle timeout](Self::effective_idle_timeout)
    pub async fn wait_idle(&self, idle_timeout: Duration) -> Completion {
        self.inner
            .in_flight
            .wait_idle(self.effective_idle_timeout(idle_timeout))
            .await
    }

    /// The idle timeout actually used by [`wait_idle`](Self::wait_idle)
    ///
    /// Never shorter than the request timeout plus a margin, so a response
    /// that is slow but within the request timeout is still waited for.
    pub fn effective_idle_timeout(&self, idle_timeout: Duration) -> Duration {
        idle_timeout.max(self.inner.options.request_timeout + IDLE_MARGIN)
    }

    /// Stops the crawl and cancels every request task still running
    ///
    /// Afterwards no route callback runs and further `get` calls are
    /// no-ops. Returns once every task has finished or been aborted.
    pub async fn shutdown(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);

        let mut cancelled = 0;
        loop {
            let mut tasks = std::mem::take(&mut *lock(&self.inner.tasks));
            if tasks.is_empty() {
                break;
            }
            tasks.abort_all();
            while let Some(joined) = tasks.join_next().await {
                if joined.is_err_and(|e| e.is_cancelled()) {
                    cancelled += 1;
                }
            }
        }

        if cancelled > 0 {
            tracing::debug!("{} request(s) cancelled at shutdown", cancelled);
        }
    }

    /// Takes the first error recorded by a request task, if any
    pub fn take_fatal(&self) -> Option<SpiderError> {
        lock(&self.inner.fatal).take()
    }

    fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    fn is_aborted(&self) -> bool {
        self.is_stopped() || lock(&self.inner.fatal).is_some()
    }

    fn emit(&self, level: LogLevel, message: String) {
        self.inner.log.emit(level, message);
    }

    fn record_fatal(&self, error: SpiderError) {
        self.emit(LogLevel::Error, error.to_string());
        let mut fatal = lock(&self.inner.fatal);
        if fatal.is_none() {
            *fatal = Some(error);
        }
    }

    /// Returns whether a route covers `target`; fails instead when none does
    /// and the missing-route policy is strict
    fn check_route(&self, target: &Url) -> Result<bool, SpiderError> {
        let host = host_key(target);
        let path = request_path(target);
        let routers = self
            .inner
            .routers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let error = match routers.get(&host) {
            None => SpiderError::NoRouteForHost { host },
            Some(router) if router.match_path(path).is_none() => SpiderError::NoRouteForPath {
                url: target.to_string(),
            },
            Some(_) => return Ok(true),
        };

        if self.inner.options.throw_on_missing_route {
            return Err(error);
        }
        self.emit(LogLevel::Debug, format!("{}. skipping.", error));
        Ok(false)
    }

    fn header_sets(&self, href: &str, provider: Option<&HeaderProvider>) -> Vec<HeaderSet> {
        if let Some(provider) = provider {
            let provided: Vec<HeaderSet> = provider(href)
                .into_iter()
                .filter(|set| !set.is_empty())
                .collect();
            if !provided.is_empty() {
                return provided;
            }
        }
        vec![self.inner.options.default_headers.clone()]
    }

    /// Lower-cases names, defaults `referer` and folds retained and inline
    /// cookies into a single `cookie` header
    fn prepare_headers(&self, headers: HeaderSet, href: &str) -> HeaderSet {
        let mut headers = object_keys_to_lower_case(&headers);
        headers
            .entry("referer".to_string())
            .or_insert_with(|| href.to_string());

        let mut jar = if self.inner.options.retain_cookies {
            lock(&self.inner.cookies).clone()
        } else {
            Vec::new()
        };
        jar.extend(extract_header_cookies(&mut headers));

        if let Some(cookie) = build_cookie_header(&jar) {
            headers.insert("cookie".to_string(), cookie);
        }
        headers
    }

    fn dispatch(&self, url: Url, headers: HeaderSet, provider: Option<HeaderProvider>) {
        let guard = self.inner.in_flight.begin();
        let spider = self.clone();

        let mut tasks = lock(&self.inner.tasks);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let _guard = guard;
            let result = {
                let Ok(_permit) = spider.inner.permits.clone().acquire_owned().await else {
                    return;
                };
                fetch_url(&spider.inner.client, &url, &headers).await
            };
            spider.settle(&url, result, provider);
        });
    }

    fn settle(&self, url: &Url, result: FetchResult, provider: Option<HeaderProvider>) {
        if self.is_stopped() {
            return;
        }
        self.inner.in_flight.touch();
        self.emit(LogLevel::Debug, format!("Response received for {}.", url));
        let options = &self.inner.options;

        match result {
            FetchResult::NoResponse { error } => {
                if options.throw_on_no_response {
                    self.record_fatal(SpiderError::NoResponse {
                        url: url.to_string(),
                        message: error,
                    });
                } else {
                    self.emit(
                        LogLevel::Error,
                        format!("Failed to get response from: {} ({})", url, error),
                    );
                }
            }
            FetchResult::UnreadableBody { status_code, error } => {
                let message = format!("status {}: {}", status_code, error);
                if options.throw_on_failed_parse {
                    self.record_fatal(SpiderError::ResponseParse {
                        url: url.to_string(),
                        message,
                    });
                } else {
                    self.emit(
                        LogLevel::Error,
                        format!("Failed to parse response from: {} ({})", url, message),
                    );
                }
            }
            FetchResult::Success(response) => {
                if options.retain_cookies {
                    *lock(&self.inner.cookies) = response.set_cookies.clone();
                }
                self.handle_response(url, response, provider);
            }
        }
    }

    /// Runs the route callback for a response and follows what it links to
    ///
    /// Panics raised by the callback or by link discovery are logged and
    /// contained to this response.
    fn handle_response(&self, url: &Url, response: SpiderResponse, provider: Option<HeaderProvider>) {
        let href = url.to_string();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let document = Html::parse_document(&response.body);
            let base = response.url.clone();

            let discovery = match self.find_callback(url) {
                Some(callback) => {
                    *lock(&self.inner.current_url) = Some(href.clone());
                    let context = RouteContext {
                        spider: self.clone(),
                        response,
                        url: url.clone(),
                    };
                    let discovery = callback(&context, &document, &href);
                    *lock(&self.inner.current_url) = None;
                    self.inner.in_flight.touch();
                    discovery
                }
                None => Discovery::Continue,
            };

            if discovery == Discovery::Continue && self.inner.options.auto_discover.any() {
                discover_links(&document, &base, &self.inner.options.auto_discover)
            } else {
                Vec::new()
            }
        }));

        let links = match outcome {
            Ok(links) => links,
            Err(payload) => {
                *lock(&self.inner.current_url) = None;
                self.emit(
                    LogLevel::Error,
                    format!(
                        "Handling {} panicked: {}",
                        href,
                        panic_message(payload.as_ref())
                    ),
                );
                self.emit(
                    LogLevel::Error,
                    "This might be happening because some http response is too large or deeply nested to handle. The crawl continues without it.".to_string(),
                );
                return;
            }
        };

        for link in links {
            if let Err(e) = self.get(&link, provider.clone()) {
                self.record_fatal(e);
                return;
            }
        }
    }

    fn find_callback(&self, url: &Url) -> Option<RouteCallback> {
        let routers = self
            .inner
            .routers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        routers
            .get(&host_key(url))
            .and_then(|router| router.match_path(request_path(url)))
    }
}

/// Extracts the message of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
