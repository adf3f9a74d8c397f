//! CSV output for tabular results: full writes, the append-only combined file,
//! and reading a written file back.

use crate::database::Column;
use crate::database::ColumnType;
use crate::database::Table;
use crate::database::Value;
use crate::error::TankRecordsError;
use csv::Writer;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;

/// Writes a table to a new (or truncated) CSV file, header first.
pub fn write_table(path: &Path, table: &Table) -> Result<(), TankRecordsError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(table.column_names())?;
    write_rows(&mut writer, table, None)?;
    writer.flush()?;
    Ok(())
}

/// Writes every row, optionally reordering values by `order` (source column index per output column).
fn write_rows(writer: &mut Writer<File>, table: &Table, order: Option<&[usize]>) -> Result<(), TankRecordsError> {
    for row in &table.rows {
        match order {
            Some(order) => writer.write_record(order.iter().map(|index| row[*index].to_string()))?,
            None => writer.write_record(row.iter().map(Value::to_string))?,
        }
    }
    Ok(())
}

/// Reads a CSV file written by this crate back into a table.
///
/// Every field comes back as text; empty fields become NULL.
pub fn read_table(path: &Path) -> Result<Table, TankRecordsError> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns = reader
        .headers()?
        .iter()
        .map(|name| Column::new(name, ColumnType::Varchar))
        .collect();
    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record?;
        table.push(
            record
                .iter()
                .map(|field| if field.is_empty() { Value::Null } else { Value::Text(field.to_owned()) })
                .collect(),
        );
    }
    Ok(table)
}

/// Append-only writer for the combined output file.
///
/// The file is created and the header written when the first table is appended;
/// later tables must carry the same column set and are written in header order.
pub struct CombinedWriter {
    path: PathBuf,
    header: Vec<String>,
    writer: Option<Writer<File>>,
}

impl CombinedWriter {
    /// Nothing touches the filesystem until the first append.
    pub fn new(path: &Path) -> Self {
        CombinedWriter {
            path: path.to_owned(),
            header: Vec::new(),
            writer: None,
        }
    }

    /// Returns true once the header has been written.
    pub fn is_started(&self) -> bool {
        self.writer.is_some()
    }

    /// Maps the table's columns onto the header, or reports a mismatch.
    /// Before the first append any column set is accepted as-is.
    pub fn column_order(&self, table: &Table) -> Result<Vec<usize>, TankRecordsError> {
        if !self.is_started() {
            return Ok((0..table.columns.len()).collect());
        }
        let mismatch = || TankRecordsError::SchemaMismatch {
            expected: self.header.join(", "),
            found: table.column_names().join(", "),
        };
        if table.columns.len() != self.header.len() {
            return Err(mismatch());
        }
        self.header
            .iter()
            .map(|name| table.column_index(name).ok_or_else(mismatch))
            .collect()
    }

    /// Appends the rows of a table, writing the header first if this is the first table.
    /// Returns the number of rows written.
    pub fn append(&mut self, table: &Table, order: &[usize]) -> Result<usize, TankRecordsError> {
        if self.writer.is_none() {
            let mut writer = Writer::from_path(&self.path)?;
            self.header = table.column_names().into_iter().map(str::to_owned).collect();
            writer.write_record(&self.header)?;
            self.writer = Some(writer);
        }
        if let Some(writer) = self.writer.as_mut() {
            write_rows(writer, table, Some(order))?;
            writer.flush()?;
        }
        Ok(table.len())
    }
}
