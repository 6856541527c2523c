//! Ordered key/value tag collection

use std::fmt;

/// A small ordered list of key/value tags
///
/// Keys are unique after `add_or_replace`; plain `add` appends without
/// checking, mirroring how raw OSM tags arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tags {
    pairs: Vec<(String, String)>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Set `key` to `value`, replacing an existing entry in place
    pub fn add_or_replace(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.pairs.iter().any(|(k, v)| k == key && v == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Copy of the tags sorted by key, then value
    pub fn sorted(&self) -> Tags {
        let mut pairs = self.pairs.clone();
        pairs.sort();
        Tags { pairs }
    }

    /// Order-independent equality
    pub fn same_as(&self, other: &Tags) -> bool {
        self.len() == other.len() && self.sorted() == other.sorted()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tags {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_or_replace_keeps_keys_unique() {
        let mut tags = Tags::new();
        tags.add_or_replace("highway", "residential");
        tags.add_or_replace("highway", "primary");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("highway"), Some("primary"));
    }

    #[test]
    fn test_same_as_ignores_order() {
        let a: Tags = [("highway", "primary"), ("oneway", "yes")].into_iter().collect();
        let b: Tags = [("oneway", "yes"), ("highway", "primary")].into_iter().collect();
        assert!(a.same_as(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let tags: Tags = [("highway", "primary"), ("name", "Rue Neuve")].into_iter().collect();
        assert_eq!(tags.to_string(), "highway=primary name=Rue Neuve");
    }
}
