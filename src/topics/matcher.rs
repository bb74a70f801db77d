//! Topic matching
//!
//! Selects the topics that apply to a fetched URL, resolves their mixins and
//! directives, supplies the header sets the spider requests each URL with,
//! and hands every applicable test to the suite manager.

use crate::crawler::{header_provider, HeaderProvider, RouteContext};
use crate::headers::{contains_headers, headers_equal, merge_headers, HeaderSet};
use crate::suite::{SuiteManager, TestExecution};
use crate::topics::{Mixins, TestFile, Topic, TopicError};
use crate::url::{extract_path_variables, replace_placeholders_in_string};
use scraper::{Html, Selector};
use std::sync::{Arc, Mutex};

/// Calls `visitor` for every topic whose pattern matches `href`
///
/// Files are visited in order and topics in declaration order. Each visit
/// gets a fresh copy of the topic with its mixins already merged in.
pub fn find_matching_topics<E, F>(href: &str, test_files: &[TestFile], mut visitor: F) -> Result<(), E>
where
    E: From<TopicError>,
    F: FnMut(&str, Topic, &TestFile) -> Result<(), E>,
{
    for test_file in test_files {
        for (name, topic) in &test_file.topics {
            if !topic.pattern()?.is_match(href) {
                continue;
            }
            let mut topic = topic.clone();
            resolve_mixins(&mut topic, test_file.mixins.as_ref())?;
            visitor(name.as_str(), topic, test_file)?;
        }
    }
    Ok(())
}

/// Merges the tests of every included mixin into the topic
///
/// Mixins are applied in the order listed; a test from a later mixin
/// replaces a same-named earlier one. The include list is emptied. Does
/// nothing when the file defines no mixins.
pub fn resolve_mixins(topic: &mut Topic, mixins: Option<&Mixins>) -> Result<(), TopicError> {
    let Some(mixins) = mixins else {
        return Ok(());
    };

    for name in std::mem::take(&mut topic.include) {
        let mixin = mixins
            .get(&name)
            .ok_or_else(|| TopicError::NoSuchMixin(name.clone()))?;
        for (test_name, test) in mixin.iter() {
            topic.tests.insert(test_name, test.clone());
        }
    }
    Ok(())
}

/// Takes the topic's continue-spidering directive, leaving `None` behind
pub fn resolve_continue_directive(topic: &mut Topic) -> Option<bool> {
    topic.continue_spidering.take()
}

/// The headers a topic's tests expect the request to have been sent with
pub fn effective_headers(topic: &Topic, defaults: &HeaderSet) -> HeaderSet {
    merge_headers(
        defaults,
        topic.request_headers.as_ref().unwrap_or(&HeaderSet::new()),
    )
}

/// Builds the provider telling the spider which header sets to request a
/// URL with: one per distinct effective header set among the matching
/// topics
///
/// Topics with invalid patterns are skipped here; they fail the run when
/// the response is matched.
pub fn build_header_provider(test_files: Arc<Vec<TestFile>>, defaults: HeaderSet) -> HeaderProvider {
    header_provider(move |url: &str| {
        let mut sets: Vec<HeaderSet> = Vec::new();
        for test_file in test_files.iter() {
            for (_, topic) in &test_file.topics {
                let matches = topic
                    .pattern()
                    .map(|re| re.is_match(url))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
                let headers = effective_headers(topic, &defaults);
                if !contains_headers(&sets, &headers) {
                    sets.push(headers);
                }
            }
        }
        sets
    })
}

/// The trimmed text of the document's `<title>`, if it has a non-empty one
pub fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document.select(&selector).next()?.text().collect::<String>();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Runs the tests of every topic applicable to a response
///
/// A topic applies when its pattern matches `href` and its effective
/// headers equal the headers the request was sent with. Path variables are
/// bound from the response URL's path and substituted into test names.
///
/// Returns whether links in the response should still be followed: false
/// when any applicable topic says not to continue spidering.
pub fn execute_matching_topics(
    context: &RouteContext,
    document: &Html,
    href: &str,
    test_files: &[TestFile],
    defaults: &HeaderSet,
    suites: &Mutex<SuiteManager>,
) -> crate::Result<bool> {
    let mut proceed = true;
    let path = context.url.path();
    let title = page_title(document);

    find_matching_topics(href, test_files, |topic_name, mut topic, test_file| {
        let expected = effective_headers(&topic, defaults);
        if !headers_equal(&expected, &context.response.request_headers) {
            return Ok(());
        }

        if resolve_continue_directive(&mut topic) == Some(false) {
            proceed = false;
        }

        let path_variables = extract_path_variables(path, topic.url_pattern(), topic.pattern()?);
        let mut manager = suites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for (test_name, test) in topic.tests.iter() {
            let test_name = replace_placeholders_in_string(test_name, &path_variables);
            manager.run_suite_test(TestExecution {
                suite: href,
                suite_description: title.as_deref(),
                topic: topic_name,
                topic_description: topic.description.as_deref(),
                test_name: &test_name,
                test,
                test_file: &test_file.path,
                context,
                document,
                path_variables: &path_variables,
            })?;
        }
        Ok::<(), crate::SpiderProbeError>(())
    })?;

    Ok(proceed)
}
