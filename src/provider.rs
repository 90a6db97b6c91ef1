//! The seam to whatever store actually holds the PIM data.
//!
//! A provider answers one [`ContentQuery`] with typed [`Record`]s. On a device
//! this is the platform's content resolver; [`crate::store::SqliteStore`] plays
//! that role everywhere else.

use crate::catalog::DataSource;
use crate::error::Result;

/// Native type tag of one returned column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(Option<String>),
    Integer(i64),
    Float(f64),
    Null,
    Other(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    columns: Vec<(String, ColumnValue)>,
}
impl Record {
    pub fn new(columns: Vec<(String, ColumnValue)>) -> Self {
        Self { columns }
    }
    pub fn push(&mut self, column: impl Into<String>, value: ColumnValue) {
        self.columns.push((column.into(), value));
    }
    /// First column with this name, if the record carries it.
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }
    pub fn columns(&self) -> &[(String, ColumnValue)] {
        &self.columns
    }
}

/// Fully concrete query: columns, placeholders and arguments are store-level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub source: DataSource,
    pub projection: Vec<&'static str>,
    pub selection: String,
    pub arguments: Vec<String>,
    pub sort_order: String,
    /// Providers stop reading once this many records are collected.
    pub limit: usize,
}

pub trait ContentProvider {
    fn query(&self, query: &ContentQuery) -> Result<Vec<Record>>;
}
