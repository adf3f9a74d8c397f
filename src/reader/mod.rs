//! # Single-File Reader Module
//!
//! Scoped access to the tables of one Access database file: open a connection,
//! list tables, run projection queries with column normalization, write the
//! result to CSV, and close the connection on every exit path.
use crate::database::Connection;
use crate::database::Driver;
use crate::database::Projection;
use crate::database::Table;
use crate::error::TankRecordsError;
use crate::output;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

pub mod normalize;

pub use normalize::Normalization;

/// Connection lifecycle of a reader.
enum State {
    Unopened,
    Open(Box<dyn Connection>),
    Closed,
}

/// Reader over the tables of one database file.
pub struct MdbReader<'d> {
    path: PathBuf,
    driver: &'d dyn Driver,
    normalization: Normalization,
    state: State,
}

impl<'d> MdbReader<'d> {
    /// Creates a reader for `path`; no connection is made until [`MdbReader::open`].
    pub fn new(driver: &'d dyn Driver, path: &Path, normalization: Normalization) -> Self {
        MdbReader {
            path: path.to_owned(),
            driver,
            normalization,
            state: State::Unopened,
        }
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true while a connection is held.
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Connects to the database file.
    ///
    /// # Errors
    ///
    /// * `ConnectionError` - the file does not exist or the driver cannot open it
    /// * `StateError` - the reader is already open
    pub fn open(&mut self) -> Result<(), TankRecordsError> {
        if self.is_open() {
            Err(TankRecordsError::StateError(format!("'{}' is already open", self.path.display())))?;
        }
        if !self.path.is_file() {
            Err(TankRecordsError::ConnectionError(format!(
                "Database file not found at '{}'",
                self.path.display()
            )))?;
        }
        let connection = self.driver.connect(&self.path)?;
        debug!(path = %self.path.display(), "opened database");
        self.state = State::Open(connection);
        Ok(())
    }

    /// Names of the user tables in the database.
    ///
    /// Fails with `StateError` before [`MdbReader::open`] or after [`MdbReader::close`].
    pub fn list_tables(&mut self) -> Result<Vec<String>, TankRecordsError> {
        match &mut self.state {
            State::Open(connection) => connection.list_tables(),
            State::Unopened => Err(TankRecordsError::StateError(format!(
                "'{}' has not been opened",
                self.path.display()
            ))),
            State::Closed => Err(TankRecordsError::StateError(format!("'{}' is closed", self.path.display()))),
        }
    }

    /// Selects `columns` (all columns for `None`) from `table_name` and normalizes the result.
    ///
    /// # Errors
    ///
    /// * `QueryError` - the table or a column does not exist, or the column list is malformed
    /// * `StateError` - the reader has not been opened
    /// * `ConnectionError` - the reader has been closed
    pub fn read_table(&mut self, table_name: &str, columns: Option<&[String]>) -> Result<Table, TankRecordsError> {
        let path = self.path.display().to_string();
        let connection = match &mut self.state {
            State::Open(connection) => connection,
            State::Unopened => Err(TankRecordsError::StateError(format!("'{path}' has not been opened")))?,
            State::Closed => Err(TankRecordsError::ConnectionError(format!("Connection to '{path}' is closed")))?,
        };

        let tables = connection.list_tables()?;
        let table_name = tables
            .iter()
            .find(|name| name.eq_ignore_ascii_case(table_name))
            .ok_or_else(|| {
                TankRecordsError::QueryError(format!(
                    "Table '{table_name}' not found. Available tables: [{}]",
                    tables.join(", ")
                ))
            })?;

        let projection = Projection::new(table_name, columns)?;
        let mut table = connection.select(&projection)?;
        self.normalization.apply(&mut table);
        debug!(
            path = %path,
            table = %table_name,
            rows = table.len(),
            columns = ?table.columns.iter().map(|column| format!("{} {}", column.name, column.kind.as_str())).collect::<Vec<_>>(),
            "read table"
        );
        Ok(table)
    }

    /// Reads a table and writes it, header included, to a new CSV file at `destination`.
    /// Returns the number of data rows written.
    pub fn write_csv(
        &mut self,
        table_name: &str,
        destination: &Path,
        columns: Option<&[String]>,
    ) -> Result<usize, TankRecordsError> {
        let table = self.read_table(table_name, columns)?;
        output::write_table(destination, &table)?;
        Ok(table.len())
    }

    /// Releases the connection. Closing a reader that is not open does nothing.
    pub fn close(&mut self) -> Result<(), TankRecordsError> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(connection) => {
                debug!(path = %self.path.display(), "closing database");
                connection.close()
            }
            State::Unopened => {
                self.state = State::Unopened;
                Ok(())
            }
            State::Closed => Ok(()),
        }
    }
}

/// Opens `path`, runs `body` with the open reader and closes it on every exit path.
///
/// When `body` fails its error is returned even if closing fails too; the close
/// error is then only logged.
pub fn with_reader<T, F>(
    driver: &dyn Driver,
    path: &Path,
    normalization: Normalization,
    body: F,
) -> Result<T, TankRecordsError>
where
    F: FnOnce(&mut MdbReader) -> Result<T, TankRecordsError>,
{
    let mut reader = MdbReader::new(driver, path, normalization);
    reader.open()?;
    let result = body(&mut reader);
    let closed = reader.close();
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_error)) => {
            warn!(path = %path.display(), error = %close_error, "failed to close database after error");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDriver;
    use crate::database::Column;
    use crate::database::ColumnType;
    use crate::database::Value;
    use chrono::NaiveDateTime;
    use std::fs::File;
    use tempfile::TempDir;

    fn tank_records() -> Table {
        let mut table = Table::new(vec![
            Column::new("BACKGROUND_TIME_STAMP", ColumnType::Timestamp),
            Column::new("TANK_NAME", ColumnType::Varchar),
            Column::new("PRODUCT_NAME", ColumnType::Varchar),
            Column::new("PRODUCT_TEMP", ColumnType::Double),
            Column::new("CORRECTION_FACTOR", ColumnType::Double),
            Column::new("GSV", ColumnType::Double),
            Column::new("PRODUCT_LEVEL", ColumnType::Double),
        ]);
        for (minute, tank, temp, gsv) in [(0, "T1", 21.456, 1500.9), (2, "T2", 19.994, 880.2)] {
            let timestamp = NaiveDateTime::parse_from_str(&format!("2024-05-01 06:0{minute}:00"), "%Y-%m-%d %H:%M:%S").unwrap();
            table.push(vec![
                Value::Timestamp(timestamp),
                Value::Text(tank.to_owned()),
                Value::Text("DIESEL 50PPM".to_owned()),
                Value::Float(temp),
                Value::Float(0.9912),
                Value::Float(gsv),
                Value::Float(1200.5),
            ]);
        }
        table
    }

    fn setup() -> (TempDir, PathBuf, MemoryDriver) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.mdb");
        File::create(&path).unwrap();
        let driver = MemoryDriver::default().with_tables(&path, vec![("TankRecords", tank_records())]);
        (dir, path, driver)
    }

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|column| column.to_string()).collect()
    }

    #[test]
    fn open_missing_file() {
        let (dir, _, driver) = setup();
        let mut reader = MdbReader::new(&driver, &dir.path().join("missing.mdb"), Normalization::default());
        assert!(matches!(reader.open(), Err(TankRecordsError::ConnectionError(_))));
        assert_eq!(driver.opened.get(), 0);
    }

    #[test]
    fn open_twice() {
        let (_dir, path, driver) = setup();
        let mut reader = MdbReader::new(&driver, &path, Normalization::default());
        reader.open().unwrap();
        assert!(matches!(reader.open(), Err(TankRecordsError::StateError(_))));
        reader.close().unwrap();
    }

    #[test]
    fn state_errors() {
        let (_dir, path, driver) = setup();
        let mut reader = MdbReader::new(&driver, &path, Normalization::default());
        assert!(matches!(reader.list_tables(), Err(TankRecordsError::StateError(_))));
        assert!(matches!(reader.read_table("TankRecords", None), Err(TankRecordsError::StateError(_))));

        reader.open().unwrap();
        assert_eq!(reader.list_tables().unwrap(), vec!["TankRecords"]);
        reader.close().unwrap();

        assert!(matches!(reader.list_tables(), Err(TankRecordsError::StateError(_))));
        assert!(matches!(reader.read_table("TankRecords", None), Err(TankRecordsError::ConnectionError(_))));
    }

    #[test]
    fn close_is_idempotent() {
        let (_dir, path, driver) = setup();
        let mut reader = MdbReader::new(&driver, &path, Normalization::default());
        reader.close().unwrap();
        reader.close().unwrap();

        reader.open().unwrap();
        reader.close().unwrap();
        reader.close().unwrap();
        assert_eq!(driver.closed.get(), 1);
        assert!(!reader.is_open());
    }

    #[test]
    fn read_requested_columns_in_order() {
        let (_dir, path, driver) = setup();
        let columns = names(&["GSV", "TANK_NAME", "PRODUCT_TEMP"]);
        let table = with_reader(&driver, &path, Normalization::default(), |reader| {
            reader.read_table("tankrecords", Some(&columns))
        })
        .unwrap();

        assert_eq!(table.column_names(), vec!["GSV", "TANK_NAME", "PRODUCT_TEMP"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "GSV"), Some(&Value::Integer(1500)));
        assert_eq!(table.get(1, "PRODUCT_TEMP"), Some(&Value::Decimal { value: 19.99, scale: 2 }));
    }

    #[test]
    fn read_all_columns() {
        let (_dir, path, driver) = setup();
        let table = with_reader(&driver, &path, Normalization::none(), |reader| reader.read_table("TankRecords", None)).unwrap();
        assert_eq!(table, tank_records());
    }

    #[test]
    fn query_errors() {
        let (_dir, path, driver) = setup();
        let mut reader = MdbReader::new(&driver, &path, Normalization::default());
        reader.open().unwrap();

        let error = reader.read_table("Alarms", None).unwrap_err();
        assert!(matches!(&error, TankRecordsError::QueryError(message) if message.contains("TankRecords")));
        let columns = names(&["TANK_NAME", "NOT_A_COLUMN"]);
        assert!(matches!(reader.read_table("TankRecords", Some(&columns)), Err(TankRecordsError::QueryError(_))));
        assert!(matches!(reader.read_table("TankRecords", Some(&[])), Err(TankRecordsError::QueryError(_))));
        reader.close().unwrap();
    }

    #[test]
    fn scoped_reader_closes_after_failure() {
        let (_dir, path, driver) = setup();
        let result = with_reader(&driver, &path, Normalization::default(), |reader| reader.read_table("Missing", None));
        assert!(result.is_err());
        assert_eq!(driver.opened.get(), 1);
        assert_eq!(driver.closed.get(), 1);

        let result: Result<(), _> = with_reader(&driver, &path, Normalization::default(), |_| {
            Err(TankRecordsError::StateError("early exit".to_owned()))
        });
        assert!(result.is_err());
        assert_eq!(driver.closed.get(), 2);
    }

    #[test]
    fn write_csv_round_trip() {
        let (dir, path, driver) = setup();
        let destination = dir.path().join("out.csv");
        std::fs::write(&destination, "stale content\n").unwrap();

        let rows = with_reader(&driver, &path, Normalization::default(), |reader| {
            reader.write_csv("TankRecords", &destination, None)
        })
        .unwrap();
        assert_eq!(rows, 2);

        let mut csv = csv::Reader::from_path(&destination).unwrap();
        let header: Vec<String> = csv.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(header, tank_records().column_names());
        let records: Vec<csv::StringRecord> = csv.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "2024-05-01 06:00:00");
        assert_eq!(&records[0][3], "21.46");
        assert_eq!(&records[0][5], "1500");
        assert_eq!(&records[1][3], "19.99");
        assert_eq!(&records[1][5], "880");
    }

    #[test]
    fn write_csv_unwritable_destination() {
        let (dir, path, driver) = setup();
        let destination = dir.path().join("missing-dir").join("out.csv");
        let result = with_reader(&driver, &path, Normalization::default(), |reader| {
            reader.write_csv("TankRecords", &destination, None)
        });
        assert!(matches!(result, Err(TankRecordsError::IoError(_)) | Err(TankRecordsError::CsvError(_))));
        assert_eq!(driver.closed.get(), 1);
    }
}
