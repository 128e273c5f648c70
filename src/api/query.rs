//! Query-string builder for endpoint wrappers

use url::form_urlencoded;

/// Collects query parameters, skipping unset ones
#[derive(Debug, Default)]
pub(crate) struct Query<'a> {
    pairs: Vec<(&'a str, String)>,
}

impl<'a> Query<'a> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn opt<T: ToString>(mut self, key: &'a str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.pairs.push((key, value.to_string()));
        }
        self
    }

    /// One `key=value` pair per element
    pub(crate) fn list(mut self, key: &'a str, values: &[String]) -> Self {
        self.pairs
            .extend(values.iter().map(|value| (key, value.clone())));
        self
    }

    /// `path` with the encoded query appended, or `path` alone when empty
    pub(crate) fn append_to(self, path: &str) -> String {
        if self.pairs.is_empty() {
            return path.to_string();
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs)
            .finish();
        format!("{}?{}", path, encoded)
    }
}
