// used to print out rows in request field order
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::provider::ColumnValue;

/// Value of one field in a returned row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
}
impl FieldValue {
    pub fn empty() -> Self {
        Self::Text(String::new())
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}
// JSON has no NaN or infinity, so those floats travel as text.
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Self::Float(f) => serializer.serialize_str(&f.to_string()),
        }
    }
}
impl From<&str> for FieldValue {
    fn from(s: &str) -> Self { Self::Text(s.to_string()) }
}
impl From<i64> for FieldValue {
    fn from(i: i64) -> Self { Self::Integer(i) }
}
impl From<f64> for FieldValue {
    fn from(f: f64) -> Self { Self::Float(f) }
}

/// Converts a store value; anything missing or unrepresentable becomes an empty string.
pub fn materialize(value: Option<&ColumnValue>) -> FieldValue {
    match value {
        Some(ColumnValue::Text(Some(s))) => FieldValue::Text(s.clone()),
        Some(ColumnValue::Integer(i)) => FieldValue::Integer(*i),
        Some(ColumnValue::Float(f)) if f.is_finite() => FieldValue::Float(*f),
        Some(ColumnValue::Float(f)) => FieldValue::Text(f.to_string()),
        Some(ColumnValue::Other(Some(s))) => FieldValue::Text(s.clone()),
        Some(ColumnValue::Text(None)) | Some(ColumnValue::Other(None)) | Some(ColumnValue::Null) | None => {
            FieldValue::empty()
        }
    }
}

/// One record keyed by abstract field name, in the order the fields were requested.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    entries: Vec<(String, FieldValue)>,
}
impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }
    /// A repeated field keeps its first position and takes the latest value.
    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        match self.entries.iter_mut().find(|(k, _)| *k == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == field).map(|(_, v)| v)
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
impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, value) in &self.entries {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}
