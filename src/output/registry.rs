use crate::headers::objectify;
use crate::output::{ConsoleReporter, JUnitReporter, MultiFileJUnitReporter, Reporter};
use crate::{ConfigError, ConfigResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Builds a reporter from its (objectified) options
pub type ReporterFactory = fn(&Value) -> Box<dyn Reporter>;

/// Maps reporter keys to constructors
///
/// The built-in keys are `console`, `junit` (option `outputFile`) and
/// `multi-junit` (option `outputDir`).
pub struct ReporterRegistry {
    factories: BTreeMap<String, ReporterFactory>,
}

impl Default for ReporterRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: BTreeMap::new(),
        };
        registry.register("console", |_| Box::new(ConsoleReporter::stdout()));
        registry.register("junit", |options| {
            Box::new(JUnitReporter::new(string_option(options, "outputFile").map(PathBuf::from)))
        });
        registry.register("multi-junit", |options| {
            Box::new(MultiFileJUnitReporter::new(
                string_option(options, "outputDir").unwrap_or_else(|| ".".to_string()),
            ))
        });
        registry
    }
}

impl ReporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the constructor for `key`
    pub fn register(&mut self, key: &str, factory: ReporterFactory) {
        self.factories.insert(key.to_lowercase(), factory);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Creates the reporter registered under `key`
    pub fn create(&self, key: &str, options: &Value) -> ConfigResult<Box<dyn Reporter>> {
        let factory = self
            .factories
            .get(&key.trim().to_lowercase())
            .ok_or_else(|| ConfigError::UnknownReporter(key.trim().to_string()))?;
        Ok(factory(options))
    }

    /// Creates every reporter of a comma separated key list
    ///
    /// `options` is passed through [`objectify`], so it may be a JSON
    /// object such as `{"outputDir": "reports"}`. Empty entries are ignored.
    pub fn resolve(&self, keys: &str, options: Option<&str>) -> ConfigResult<Vec<Box<dyn Reporter>>> {
        let options = options.map(objectify).unwrap_or(Value::Null);
        keys.split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| self.create(key, &options))
            .collect()
    }
}

fn string_option(options: &Value, name: &str) -> Option<String> {
    options.get(name).and_then(Value::as_str).map(str::to_string)
}
