//! CSV export sink: one file per table.
//!
//! Each file starts with `#`-prefixed comment lines naming the table and the column
//! units, followed by a header row. Tables found on disk are reopened in append mode,
//! so the shared run-header table accumulates across sessions.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::schema::Column;
use super::sink::{CellValue, ExportSink, TableHandle};
use crate::error::{AppResult, HessioError};

struct CsvTable {
    name: String,
    path: PathBuf,
    width: usize,
    writer: csv::Writer<File>,
}

/// Writes every table as `<dir>/<table>.csv`.
pub struct CsvSink {
    dir: PathBuf,
    tables: Vec<CsvTable>,
}

impl CsvSink {
    /// Creates the output directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .map_err(|e| HessioError::Export(format!("cannot create {}: {e}", dir.display())))?;
        }
        info!(dir = %dir.display(), "CSV export directory ready");
        Ok(Self {
            dir,
            tables: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `table`.
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }

    fn handle_of(&self, name: &str) -> Option<TableHandle> {
        self.tables
            .iter()
            .position(|t| t.name == name)
            .map(TableHandle)
    }

    fn storage_error(table: &str, e: impl std::fmt::Display) -> HessioError {
        HessioError::Export(format!("{table}: {e}"))
    }
}

impl ExportSink for CsvSink {
    fn create_table(&mut self, name: &str, columns: &[Column]) -> AppResult<TableHandle> {
        if self.handle_of(name).is_some() {
            return Err(HessioError::Export(format!("table {name} already exists")));
        }
        let path = self.table_path(name);
        let mut file = File::create(&path).map_err(|e| Self::storage_error(name, e))?;

        let units: Vec<&str> = columns.iter().map(|c| c.unit).collect();
        writeln!(file, "# table: {name}")
            .and_then(|_| writeln!(file, "# units: {}", units.join(",")))
            .map_err(|e| Self::storage_error(name, e))?;

        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(columns.iter().map(|c| c.name))
            .map_err(|e| Self::storage_error(name, e))?;

        debug!(table = name, path = %path.display(), "Created CSV table");
        self.tables.push(CsvTable {
            name: name.to_string(),
            path,
            width: columns.len(),
            writer,
        });
        Ok(TableHandle(self.tables.len() - 1))
    }

    fn locate_table(&mut self, name: &str) -> AppResult<Option<TableHandle>> {
        if let Some(handle) = self.handle_of(name) {
            return Ok(Some(handle));
        }
        let path = self.table_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let width = {
            let mut reader = csv::ReaderBuilder::new()
                .comment(Some(b'#'))
                .from_path(&path)
                .map_err(|e| Self::storage_error(name, e))?;
            reader
                .headers()
                .map_err(|e| Self::storage_error(name, e))?
                .len()
        };
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| Self::storage_error(name, e))?;
        debug!(table = name, path = %path.display(), "Reopened CSV table for append");
        self.tables.push(CsvTable {
            name: name.to_string(),
            path,
            width,
            writer: csv::Writer::from_writer(file),
        });
        Ok(Some(TableHandle(self.tables.len() - 1)))
    }

    fn append_row(&mut self, table: TableHandle, row: &[CellValue]) -> AppResult<()> {
        let table = self
            .tables
            .get_mut(table.0)
            .ok_or_else(|| HessioError::Export(format!("no table with handle {}", table.0)))?;
        if row.len() != table.width {
            return Err(HessioError::Export(format!(
                "{}: row has {} cells for {} columns",
                table.name,
                row.len(),
                table.width
            )));
        }
        table
            .writer
            .write_record(row.iter().map(ToString::to_string))
            .map_err(|e| Self::storage_error(&table.name, e))
    }

    fn flush(&mut self) -> AppResult<()> {
        for table in &mut self.tables {
            table
                .writer
                .flush()
                .map_err(|e| HessioError::Export(format!("{}: {e}", table.path.display())))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::schema::{MC_SHOWER_COLUMNS, RUN_HEADER_TABLE, TELESCOPE_COLUMNS};

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn writes_units_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        let table = sink.create_table("HEADER_TEL_5", &TELESCOPE_COLUMNS).unwrap();
        let row: Vec<CellValue> = (0..TELESCOPE_COLUMNS.len() as i32).map(CellValue::from).collect();
        sink.append_row(table, &row).unwrap();
        sink.flush().unwrap();

        let text = std::fs::read_to_string(sink.table_path("HEADER_TEL_5")).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("# table: HEADER_TEL_5"));
        assert!(lines.next().unwrap().starts_with("# units: DN,[m],[m],[m]"));
        assert!(lines.next().unwrap().starts_with("tel_id,tel_pos_x"));
        assert_eq!(read_rows(&sink.table_path("HEADER_TEL_5")).len(), 1);
    }

    #[test]
    fn reopened_table_appends() {
        let dir = tempfile::tempdir().unwrap();
        for seq in 0..2 {
            let mut sink = CsvSink::new(dir.path()).unwrap();
            let table = match sink.locate_table(RUN_HEADER_TABLE).unwrap() {
                Some(table) => table,
                None => sink.create_table(RUN_HEADER_TABLE, &MC_SHOWER_COLUMNS).unwrap(),
            };
            let row: Vec<CellValue> = (0..MC_SHOWER_COLUMNS.len())
                .map(|_| CellValue::from(seq))
                .collect();
            sink.append_row(table, &row).unwrap();
            sink.flush().unwrap();
        }
        let rows = read_rows(&dir.path().join("HEADER_RUN.csv"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "1");
    }

    #[test]
    fn rejects_wrong_row_width() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("nested")).unwrap();
        let table = sink.create_table("T", &TELESCOPE_COLUMNS).unwrap();
        assert!(sink.append_row(table, &[CellValue::from("x")]).is_err());
        assert!(sink.append_row(TableHandle(9), &[]).is_err());
    }
}
