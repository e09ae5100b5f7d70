use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::types::RowValues;

/// A row from a SELECT, mapping column names to values.
///
/// Column order is the order the driver reported. Rows from the same result share their
/// column names and lookup cache.
#[derive(Debug, Clone)]
pub struct ResultRow {
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    // column name -> index, built once per result
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl ResultRow {
    /// Create a new row. Prefer [`ResultRow::with_shared_columns`] when building many rows.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = Self::index_cache(&column_names);
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    pub(crate) fn with_shared_columns(
        column_names: Arc<Vec<String>>,
        column_index_cache: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
        }
    }

    pub(crate) fn index_cache(column_names: &[String]) -> Arc<HashMap<String, usize>> {
        // First occurrence wins when a projection repeats a name.
        let mut cache = HashMap::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            cache.entry(name.clone()).or_insert(i);
        }
        Arc::new(cache)
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index_cache.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Copy the row into an unordered map.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, RowValues> {
        self.iter()
            .map(|(name, value)| (name.to_owned(), value.clone()))
            .collect()
    }

    /// Convert the row into a JSON object keyed by column name.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut obj = JsonMap::with_capacity(self.values.len());
        for (name, value) in self.iter() {
            let json = serde_json::to_value(value).unwrap_or(JsonValue::Null);
            obj.insert(name.to_owned(), json);
        }
        JsonValue::Object(obj)
    }
}

impl PartialEq for ResultRow {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
