//! Mirrors "a result is available" into shareable navigation state.
//!
//! The flag lives in an explicit key/value annotation store instead of the
//! page itself, so changing it never reloads anything or touches the
//! in-memory registry.

use super::registry::FileRegistry;

/// Query key used for the "result available" flag.
pub const RESULT_FLAG: &str = "result";

/// The navigation collaborator: a set of boolean annotations on the current
/// location.
pub trait NavigationBoundary: Send {
    fn set_flag(&mut self, key: &str, value: bool);
    fn clear_flag(&mut self, key: &str);
    fn flag(&self, key: &str) -> bool;
    /// The addressable location including its annotations.
    fn location(&self) -> String;
}

/// In-process navigation state: a path plus its query parameters.
///
/// Parameters other than the flags we write are kept as they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAnnotations {
    path: String,
    params: Vec<(String, String)>,
}

impl QueryAnnotations {
    pub fn parse(href: &str) -> Self {
        let href = href.split('#').next().unwrap_or_default();
        let (path, query) = match href.split_once('?') {
            Some((path, query)) => (path, query),
            None => (href, ""),
        };
        let params = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();

        Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            params,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl NavigationBoundary for QueryAnnotations {
    fn set_flag(&mut self, key: &str, value: bool) {
        if !value {
            self.clear_flag(key);
            return;
        }
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = "true".to_string(),
            None => self.params.push((key.to_string(), "true".to_string())),
        }
    }

    fn clear_flag(&mut self, key: &str) {
        self.params.retain(|(k, _)| k != key);
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    fn location(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// Keeps the "result available" annotation in step with the registry.
#[derive(Debug)]
pub struct ViewStateSynchronizer<N: NavigationBoundary = QueryAnnotations> {
    boundary: N,
    key: String,
}

impl ViewStateSynchronizer<QueryAnnotations> {
    /// Reads the initial location once, as the view is created.
    pub fn from_location(href: &str, key: &str) -> Self {
        let synchronizer = Self::new(QueryAnnotations::parse(href), key);
        if synchronizer.has_result() {
            tracing::info!("View opened with a result already available ({})", href);
        }
        synchronizer
    }
}

impl<N: NavigationBoundary> ViewStateSynchronizer<N> {
    pub fn new(boundary: N, key: impl Into<String>) -> Self {
        Self {
            boundary,
            key: key.into(),
        }
    }

    pub fn has_result(&self) -> bool {
        self.boundary.flag(&self.key)
    }

    pub fn location(&self) -> String {
        self.boundary.location()
    }

    pub fn boundary(&self) -> &N {
        &self.boundary
    }

    /// Sets the flag when at least one item completed and clears it
    /// otherwise. Returns `true` if the location changed.
    ///
    /// The key is either `true` or absent afterwards; any other value found
    /// at initialization is dropped.
    pub fn reflect(&mut self, has_completed: bool) -> bool {
        let before = self.boundary.location();
        if has_completed {
            self.boundary.set_flag(&self.key, true);
        } else {
            self.boundary.clear_flag(&self.key);
        }
        self.location_changed(before)
    }

    /// Empties the registry and drops the annotation. Returns `true` if the
    /// location changed.
    pub fn reset(&mut self, registry: &mut FileRegistry) -> bool {
        registry.clear();
        let before = self.boundary.location();
        self.boundary.clear_flag(&self.key);
        self.location_changed(before)
    }

    fn location_changed(&self, before: String) -> bool {
        let after = self.boundary.location();
        if after == before {
            return false;
        }
        tracing::info!("Navigation updated to {}", after);
        true
    }
}

impl Default for ViewStateSynchronizer<QueryAnnotations> {
    fn default() -> Self {
        Self::from_location("/", RESULT_FLAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawFile;

    #[test]
    fn test_parse_and_render_location() {
        let q = QueryAnnotations::parse("/uploadpage?lang=id&result=true#top");
        assert_eq!(q.path(), "/uploadpage");
        assert_eq!(q.get("lang"), Some("id"));
        assert!(q.flag(RESULT_FLAG));
        assert_eq!(q.location(), "/uploadpage?lang=id&result=true");
    }

    #[test]
    fn test_set_and_clear_preserve_other_params() {
        let mut q = QueryAnnotations::parse("/uploadpage?lang=id");
        q.set_flag(RESULT_FLAG, true);
        assert_eq!(q.location(), "/uploadpage?lang=id&result=true");
        q.set_flag(RESULT_FLAG, true);
        assert_eq!(q.location(), "/uploadpage?lang=id&result=true");
        q.clear_flag(RESULT_FLAG);
        assert_eq!(q.location(), "/uploadpage?lang=id");
        q.set_flag("lang", false);
        assert_eq!(q.location(), "/uploadpage");
    }

    #[test]
    fn test_initial_flag_is_read_once() {
        let sync = ViewStateSynchronizer::from_location("/uploadpage?result=true", RESULT_FLAG);
        assert!(sync.has_result());

        let sync = ViewStateSynchronizer::from_location("/uploadpage?result=false", RESULT_FLAG);
        assert!(!sync.has_result());
    }

    #[test]
    fn test_reflect_sets_and_clears() {
        let mut sync = ViewStateSynchronizer::from_location("/uploadpage", RESULT_FLAG);
        assert!(sync.reflect(true));
        assert_eq!(sync.location(), "/uploadpage?result=true");
        assert!(!sync.reflect(true), "unchanged flag reports no change");
        assert!(sync.reflect(false));
        assert_eq!(sync.location(), "/uploadpage");
    }

    #[test]
    fn test_reset_clears_registry_and_flag() {
        let mut registry = FileRegistry::new();
        registry.add(vec![RawFile::new("a.png", "/tmp/a.png", "image/png", 1)]);
        let mut sync = ViewStateSynchronizer::from_location("/uploadpage?result=true", RESULT_FLAG);

        assert!(sync.reset(&mut registry));
        assert!(registry.is_empty());
        assert!(!sync.has_result());
        assert_eq!(sync.location(), "/uploadpage");
        assert!(!sync.reset(&mut registry));
    }

    #[test]
    fn test_non_true_flag_value_is_removed() {
        let mut sync =
            ViewStateSynchronizer::from_location("/uploadpage?result=false&lang=id", RESULT_FLAG);
        assert!(!sync.has_result());

        assert!(sync.reflect(false));
        assert_eq!(sync.location(), "/uploadpage?lang=id");
        assert!(!sync.reflect(false));

        let mut sync = ViewStateSynchronizer::from_location("/uploadpage?result=0", RESULT_FLAG);
        assert!(sync.reflect(true));
        assert_eq!(sync.location(), "/uploadpage?result=true");

        let mut registry = FileRegistry::new();
        let mut sync = ViewStateSynchronizer::from_location("/uploadpage?result=", RESULT_FLAG);
        assert!(sync.reset(&mut registry));
        assert_eq!(sync.location(), "/uploadpage");
    }
}
