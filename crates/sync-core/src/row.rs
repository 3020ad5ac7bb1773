//! Row and property-map representations.

use crate::values::{GraphValue, SourceValue};
use std::sync::Arc;

/// One row read from a relational table.
///
/// Column names are shared between all rows of a scan; values are stored in
/// column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    columns: Arc<[String]>,
    values: Vec<SourceValue>,
}

impl SourceRow {
    /// Create a row. Missing trailing values read as `Null`, extra values are
    /// dropped.
    pub fn new(columns: Arc<[String]>, mut values: Vec<SourceValue>) -> Self {
        values.resize(columns.len(), SourceValue::Null);
        Self { columns, values }
    }

    /// Column names in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value of a column, `None` if the column does not exist.
    pub fn get(&self, column: &str) -> Option<&SourceValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered mapping from property name to [`GraphValue`].
///
/// Keeps insertion order so node properties follow the table's column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, GraphValue)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry map, the shape of a stub node.
    pub fn single(key: impl Into<String>, value: GraphValue) -> Self {
        Self {
            entries: vec![(key.into(), value)],
        }
    }

    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace a property, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: GraphValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Merge `other` into `self`.
    ///
    /// Non-null values from `other` overwrite, null values never erase an
    /// existing property. Keys only present in `self` are kept.
    pub fn merge(&mut self, other: &Properties) {
        for (key, value) in other.non_null() {
            self.insert(key, value.clone());
        }
    }

    /// Properties with a non-null value, in order.
    pub fn non_null(&self) -> impl Iterator<Item = (&str, &GraphValue)> {
        self.iter().filter(|(_, v)| !v.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GraphValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, GraphValue)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, GraphValue)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}
