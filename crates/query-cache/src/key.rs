//! Composite query keys.

use std::fmt;

/// Logical identity of a cached read: entity name followed by its parameters,
/// e.g. `["sellers-by-status", "pending"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Entity segment of the key
    pub fn root(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Segment-wise prefix match
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(":"))
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(parts: [&str; N]) -> Self {
        Self::new(parts)
    }
}

impl From<Vec<String>> for QueryKey {
    fn from(parts: Vec<String>) -> Self {
        Self(parts)
    }
}

impl From<&QueryKey> for QueryKey {
    fn from(key: &QueryKey) -> Self {
        key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_prefix() {
        let key = QueryKey::from(["sellers-by-status", "pending"]);
        assert_eq!(key.to_string(), "sellers-by-status:pending");
        assert_eq!(key.root(), Some("sellers-by-status"));

        assert!(key.starts_with(&QueryKey::from(["sellers-by-status"])));
        assert!(key.starts_with(&key));
        assert!(!key.starts_with(&QueryKey::from(["sellers"])));
        assert!(!QueryKey::from(["products-by-status", "pending"]).starts_with(&QueryKey::from(["products"])));
    }
}
