//! Test file discovery and loading

use crate::headers::{object_keys_to_lower_case, HeaderSet};
use crate::topics::{Check, TestCase, TestFile, TestSet, Topic};
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTestFile {
    #[serde(default)]
    mixins: Table,
    #[serde(default)]
    topics: Table,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawTopic {
    url_pattern: String,
    description: Option<String>,
    request_headers: Option<HeaderSet>,
    include: Option<Include>,
    continue_spidering: Option<bool>,
    #[serde(default)]
    tests: Table,
}

/// `include = "common"` or `include = ["common", "header"]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Include {
    One(String),
    Many(Vec<String>),
}

impl Include {
    fn into_vec(self) -> Vec<String> {
        match self {
            Include::One(name) => vec![name],
            Include::Many(names) => names,
        }
    }
}

/// Returns every `*.toml` file below `dir`, sorted by path
pub fn discover_test_files(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_toml_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_toml_files(dir: &Path, files: &mut Vec<PathBuf>) -> ConfigResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_toml_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    Ok(())
}

/// Discovers and loads every test file below `dir`
///
/// Fails with [`ConfigError::NoTestFiles`] when the directory holds none.
pub fn load_test_files(dir: &Path) -> ConfigResult<Vec<TestFile>> {
    let paths = discover_test_files(dir)?;
    if paths.is_empty() {
        return Err(ConfigError::NoTestFiles(dir.to_path_buf()));
    }

    let files = paths
        .iter()
        .map(|path| load_test_file(path))
        .collect::<ConfigResult<Vec<_>>>()?;
    tracing::info!("Loaded {} test file(s) from {}", files.len(), dir.display());
    Ok(files)
}

/// Loads a single test file
pub fn load_test_file(path: &Path) -> ConfigResult<TestFile> {
    let content = std::fs::read_to_string(path)?;
    parse_test_file(&path.display().to_string(), &content).map_err(|message| {
        ConfigError::TestFile {
            path: path.to_path_buf(),
            message,
        }
    })
}

/// Parses test file content; `path` is recorded on every result
pub fn parse_test_file(path: &str, content: &str) -> Result<TestFile, String> {
    let raw: RawTestFile = toml::from_str(content).map_err(|e| e.to_string())?;
    let mut file = TestFile::new(path);

    for (name, tests) in raw.mixins {
        let tests = table(tests, &format!("mixin '{}'", name))?;
        file = file.mixin(name.clone(), test_set(tests, &format!("mixin '{}'", name))?);
    }

    for (name, value) in raw.topics {
        let raw_topic: RawTopic = value
            .try_into()
            .map_err(|e: toml::de::Error| format!("topic '{}': {}", name, e.message()))?;

        let mut topic = Topic::new(raw_topic.url_pattern);
        topic.description = raw_topic.description;
        topic.request_headers = raw_topic
            .request_headers
            .as_ref()
            .map(object_keys_to_lower_case);
        topic.include = raw_topic.include.map(Include::into_vec).unwrap_or_default();
        topic.continue_spidering = raw_topic.continue_spidering;
        topic.tests = test_set(raw_topic.tests, &format!("topic '{}'", name))?;

        file = file.topic(name, topic);
    }

    Ok(file)
}

fn table(value: Value, owner: &str) -> Result<Table, String> {
    match value {
        Value::Table(table) => Ok(table),
        other => Err(format!("{} must be a table, found {}", owner, other.type_str())),
    }
}

fn test_set(tests: Table, owner: &str) -> Result<TestSet, String> {
    let mut set = TestSet::new();
    for (name, value) in tests {
        let body = table(value, &format!("test '{}' of {}", name, owner))?;
        let test = if body.is_empty() {
            TestCase::without_assertion()
        } else {
            let check: Check = Value::Table(body).try_into().map_err(|e: toml::de::Error| {
                format!("test '{}' of {}: {}", name, owner, e.message())
            })?;
            check.into_test_case()
        };
        set.insert(name, test);
    }
    Ok(set)
}
