//! Relational sink abstraction and an in-memory implementation.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use super::schema::Column;
use crate::error::{AppResult, HessioError};

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int(i64::from(v))
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<u64> for CellValue {
    fn from(v: u64) -> Self {
        CellValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for CellValue {
    fn from(v: usize) -> Self {
        CellValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

/// Opaque reference to a table inside one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableHandle(pub(crate) usize);

/// Destination of exported rows.
pub trait ExportSink {
    /// Creates a table. Fails if the sink already holds a table of that name.
    fn create_table(&mut self, name: &str, columns: &[Column]) -> AppResult<TableHandle>;

    /// Finds an existing table, including ones left by an earlier session where the sink
    /// supports that.
    fn locate_table(&mut self, name: &str) -> AppResult<Option<TableHandle>>;

    /// Appends one row; the cell count must match the table's columns.
    fn append_row(&mut self, table: TableHandle, row: &[CellValue]) -> AppResult<()>;

    fn flush(&mut self) -> AppResult<()>;
}

impl<S: ExportSink + ?Sized> ExportSink for Box<S> {
    fn create_table(&mut self, name: &str, columns: &[Column]) -> AppResult<TableHandle> {
        (**self).create_table(name, columns)
    }

    fn locate_table(&mut self, name: &str) -> AppResult<Option<TableHandle>> {
        (**self).locate_table(name)
    }

    fn append_row(&mut self, table: TableHandle, row: &[CellValue]) -> AppResult<()> {
        (**self).append_row(table, row)
    }

    fn flush(&mut self) -> AppResult<()> {
        (**self).flush()
    }
}

/// Table kept by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
}

impl MemoryTable {
    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }
}

/// Sink holding every table in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Vec<MemoryTable>,
    flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn tables(&self) -> &[MemoryTable] {
        &self.tables
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl ExportSink for MemorySink {
    fn create_table(&mut self, name: &str, columns: &[Column]) -> AppResult<TableHandle> {
        if self.table(name).is_some() {
            return Err(HessioError::Export(format!("table {name} already exists")));
        }
        self.tables.push(MemoryTable {
            name: name.to_string(),
            columns: columns.to_vec(),
            rows: Vec::new(),
        });
        Ok(TableHandle(self.tables.len() - 1))
    }

    fn locate_table(&mut self, name: &str) -> AppResult<Option<TableHandle>> {
        Ok(self
            .tables
            .iter()
            .position(|t| t.name == name)
            .map(TableHandle))
    }

    fn append_row(&mut self, table: TableHandle, row: &[CellValue]) -> AppResult<()> {
        let table = self
            .tables
            .get_mut(table.0)
            .ok_or_else(|| HessioError::Export(format!("no table with handle {}", table.0)))?;
        if row.len() != table.columns.len() {
            return Err(HessioError::Export(format!(
                "{}: row has {} cells for {} columns",
                table.name,
                row.len(),
                table.columns.len()
            )));
        }
        table.rows.push(row.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> AppResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

type SinkFactory = Box<dyn Fn(&Path) -> AppResult<Box<dyn ExportSink>> + Send + Sync>;

/// Registry of sink formats available in this build.
///
/// ```
/// use rust_hessio::export::SinkRegistry;
///
/// let registry = SinkRegistry::new();
/// assert!(registry.is_available("memory"));
/// # #[cfg(feature = "storage_csv")]
/// assert!(registry.is_available("csv"));
/// ```
pub struct SinkRegistry {
    factories: HashMap<String, SinkFactory>,
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkRegistry {
    /// Creates a registry holding every format enabled by Cargo features.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("memory", |_| Ok(Box::new(MemorySink::new())));

        #[cfg(feature = "storage_csv")]
        registry.register("csv", |dir| {
            Ok(Box::new(super::csv_sink::CsvSink::new(dir)?))
        });

        registry
    }

    pub fn register<F>(&mut self, format: impl Into<String>, factory: F)
    where
        F: Fn(&Path) -> AppResult<Box<dyn ExportSink>> + Send + Sync + 'static,
    {
        self.factories.insert(format.into(), Box::new(factory));
    }

    /// Creates a sink of `format` writing below `dir`.
    pub fn create(&self, format: &str, dir: &Path) -> AppResult<Box<dyn ExportSink>> {
        match self.factories.get(format) {
            Some(factory) => factory(dir),
            None if format == "csv" => Err(HessioError::FeatureNotEnabled("storage_csv".into())),
            None => Err(HessioError::Configuration(format!(
                "unknown export format '{format}'; available: {}",
                self.list_formats().join(", ")
            ))),
        }
    }

    pub fn is_available(&self, format: &str) -> bool {
        self.factories.contains_key(format)
    }

    /// Sorted names of the registered formats.
    pub fn list_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.factories.keys().cloned().collect();
        formats.sort();
        formats
    }
}
