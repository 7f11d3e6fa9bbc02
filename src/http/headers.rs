//! Ordered header list with case-insensitive lookup.

/// A case-insensitive, multi-value HTTP header map.
///
/// Entries keep their insertion order so responses serialize headers in the
/// order handlers added them.
///
/// # Examples
///
/// ```
/// use kvprobe::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "text/html; charset=utf-8");
/// assert_eq!(headers.get("content-type"), Some("text/html; charset=utf-8"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends an entry. Repeated names are kept as separate entries.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries, not unique names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut h = Headers::new();
        h.insert("Content-Type", "text/html");
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/html"));
        assert!(h.contains("content-type"));
        assert!(!h.contains("x-missing"));
    }

    #[test]
    fn first_value_wins_and_order_is_kept() {
        let mut h = Headers::new();
        h.insert("X-Trace", "a");
        h.insert("X-Trace", "b");
        assert_eq!(h.get("x-trace"), Some("a"));
        let names: Vec<_> = h.iter().map(|(_, v)| v).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(h.len(), 2);
    }
}
