use crate::crawler::{RouteCallback, SpiderError};
use regex::Regex;

/// A path pattern and the callback it dispatches to
struct Route {
    pattern: Regex,
    callback: RouteCallback,
}

/// Routes registered for one host, tried in registration order
#[derive(Default)]
pub(crate) struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compiles `pattern` and appends it
    pub fn add_route(&mut self, pattern: &str, callback: RouteCallback) -> Result<(), SpiderError> {
        let compiled = Regex::new(pattern).map_err(|source| SpiderError::InvalidRoutePattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.routes.push(Route {
            pattern: compiled,
            callback,
        });
        Ok(())
    }

    /// Returns the callback of the first route whose pattern matches `path`
    pub fn match_path(&self, path: &str) -> Option<RouteCallback> {
        self.routes
            .iter()
            .find(|route| route.pattern.is_match(path))
            .map(|route| route.callback.clone())
    }
}
