//! # Database Access Module
//!
//! Driver-facing side of the extractor: the [`Driver`] and [`Connection`] traits,
//! the tagged [`Value`] type produced at the read boundary, and the [`Table`]
//! and [`Projection`] types passed across it.
use crate::error::TankRecordsError;
use std::path::Path;

pub mod column;
#[cfg(test)]
pub(crate) mod memory;
#[cfg(feature = "odbc")]
pub mod odbc;
pub mod table;
pub mod value;

pub use column::Column;
pub use column::ColumnType;
pub use table::Projection;
pub use table::Table;
pub use value::Value;

/// Opens connections to database files.
pub trait Driver {
    /// Connects to the database file at `path`.
    ///
    /// Any failure (driver missing, architecture mismatch, locked or corrupt file)
    /// is reported as [`TankRecordsError::ConnectionError`].
    fn connect(&self, path: &Path) -> Result<Box<dyn Connection>, TankRecordsError>;
}

/// An open connection to one database file.
pub trait Connection {
    /// Names of the user tables, system tables excluded.
    fn list_tables(&mut self) -> Result<Vec<String>, TankRecordsError>;

    /// Runs the projection query and maps every value to a [`Value`].
    fn select(&mut self, projection: &Projection) -> Result<Table, TankRecordsError>;

    /// Releases the connection.
    fn close(self: Box<Self>) -> Result<(), TankRecordsError>;
}
