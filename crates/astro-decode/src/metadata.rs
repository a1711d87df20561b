//! Ordered, key-unique metadata map.

use std::collections::HashMap;

use crate::value::MetadataValue;

/// Suffix of the sibling key holding a value's free-text comment.
pub const COMMENT_SUFFIX: &str = "_Comment";

/// Namespace separator inside XISF property identifiers.
const NAMESPACE_SEPARATOR: char = ':';

/// Flatten a namespaced identifier into a plain key (`PCL:Observer` becomes
/// `PCL_Observer`).
pub fn flatten_key(id: &str) -> String {
    id.trim().replace(NAMESPACE_SEPARATOR, "_")
}

/// Header metadata in the order keys first appeared.
///
/// Re-inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataMap {
    entries: Vec<(String, MetadataValue)>,
    index: HashMap<String, usize>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: MetadataValue) -> Option<MetadataValue> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Insert `value` under `key` and, if present, `comment` under
    /// `key_Comment`.
    pub fn insert_with_comment(
        &mut self,
        key: &str,
        value: MetadataValue,
        comment: Option<String>,
    ) {
        self.insert(key, value);
        if let Some(comment) = comment.filter(|c| !c.is_empty()) {
            self.insert(
                format!("{key}{COMMENT_SUFFIX}"),
                MetadataValue::String(comment),
            );
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// The comment stored alongside `key`, if any.
    pub fn comment(&self, key: &str) -> Option<&str> {
        self.get(&format!("{key}{COMMENT_SUFFIX}"))
            .and_then(MetadataValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Look up each of `keys`, returning their display strings.
    ///
    /// Missing keys yield `None` so a caller can lay out fixed columns.
    pub fn select<'a>(&self, keys: &'a [&'a str]) -> Vec<(&'a str, Option<String>)> {
        keys.iter()
            .map(|&k| (k, self.get(k).map(ToString::to_string)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a MetadataMap {
    type Item = (&'a str, &'a MetadataValue);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a MetadataValue)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_kept() {
        let mut map = MetadataMap::new();
        map.insert("SIMPLE", MetadataValue::Bool(true));
        map.insert("BITPIX", MetadataValue::Int64(16));
        map.insert("NAXIS", MetadataValue::Int64(2));
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["SIMPLE", "BITPIX", "NAXIS"]);
    }

    #[test]
    fn duplicate_overwrites_in_place() {
        let mut map = MetadataMap::new();
        map.insert("HISTORY", MetadataValue::String("first".into()));
        map.insert("OBJECT", MetadataValue::String("M42".into()));
        let prev = map.insert("HISTORY", MetadataValue::String("second".into()));
        assert_eq!(prev, Some(MetadataValue::String("first".into())));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("HISTORY").and_then(|v| v.as_str()), Some("second"));
        assert_eq!(map.keys().next(), Some("HISTORY"));
    }

    #[test]
    fn comments_go_to_sibling_key() {
        let mut map = MetadataMap::new();
        map.insert_with_comment("EXPTIME", MetadataValue::Float64(300.0), Some("seconds".into()));
        map.insert_with_comment("GAIN", MetadataValue::Int64(100), None);
        assert_eq!(map.comment("EXPTIME"), Some("seconds"));
        assert!(map.contains_key("EXPTIME_Comment"));
        assert!(!map.contains_key("GAIN_Comment"));
    }

    #[test]
    fn flatten_namespaced_ids() {
        assert_eq!(flatten_key("PCL:Observer"), "PCL_Observer");
        assert_eq!(flatten_key("Instrument:Camera:Gain"), "Instrument_Camera_Gain");
        assert_eq!(flatten_key(" OBJECT "), "OBJECT");
    }

    #[test]
    fn select_reports_missing_keys() {
        let mut map = MetadataMap::new();
        map.insert("FILTER", MetadataValue::String("Ha".into()));
        let row = map.select(&["FILTER", "CCD-TEMP"]);
        assert_eq!(row[0], ("FILTER", Some("Ha".to_string())));
        assert_eq!(row[1], ("CCD-TEMP", None));
    }

    #[test]
    fn empty_map() {
        let map = MetadataMap::default();
        assert!(map.is_empty());
        assert_eq!(map.iter().count(), 0);
        assert!(map.get("ANY").is_none());
    }
}
