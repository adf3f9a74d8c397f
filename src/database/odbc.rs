//! ODBC backed [`Driver`] for Microsoft Access database files.

use crate::database::Column;
use crate::database::ColumnType;
use crate::database::Connection;
use crate::database::Driver;
use crate::database::Projection;
use crate::database::Table;
use crate::database::Value;
use crate::error::TankRecordsError;
use odbc_api::ConnectionOptions;
use odbc_api::Cursor;
use odbc_api::DataType;
use odbc_api::Environment;
use odbc_api::ResultSetMetadata;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Driver name registered by the Access Database Engine.
pub const ACCESS_DRIVER: &str = "Microsoft Access Driver (*.mdb, *.accdb)";

/// Seconds to wait for the driver to open a database file.
const LOGIN_TIMEOUT_SECONDS: u32 = 30;

/// Process-wide ODBC environment, allocated on first use.
fn environment() -> Result<&'static Environment, TankRecordsError> {
    static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();
    if let Some(environment) = ENVIRONMENT.get() {
        return Ok(environment);
    }
    let environment = Environment::new()
        .map_err(|e| TankRecordsError::ConnectionError(format!("ODBC environment unavailable: {e}")))?;
    Ok(ENVIRONMENT.get_or_init(|| environment))
}

/// Descriptions of the ODBC drivers installed on this host.
pub fn drivers() -> Result<Vec<String>, TankRecordsError> {
    let drivers = environment()?
        .drivers()
        .map_err(|e| TankRecordsError::ConnectionError(format!("Cannot list ODBC drivers: {e}")))?;
    Ok(drivers.into_iter().map(|driver| driver.description).collect())
}

/// Connects to Access files through the ODBC driver manager.
#[derive(Clone, Debug)]
pub struct OdbcDriver {
    /// ODBC driver name placed in the `DRIVER` attribute
    pub driver: String,
    /// Database password placed in the `PWD` attribute
    pub password: Option<String>,
}

impl Default for OdbcDriver {
    fn default() -> Self {
        OdbcDriver {
            driver: ACCESS_DRIVER.to_owned(),
            password: None,
        }
    }
}

impl OdbcDriver {
    /// Builds the connection string for a database file.
    pub fn connection_string(&self, path: &Path) -> String {
        let mut connection_string = format!("DRIVER={{{}}};DBQ={};", self.driver, path.display());
        if let Some(password) = &self.password {
            connection_string.push_str(&format!("PWD={password};"));
        }
        connection_string
    }
}

impl Driver for OdbcDriver {
    fn connect(&self, path: &Path) -> Result<Box<dyn Connection>, TankRecordsError> {
        let environment = environment()?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(drivers = ?drivers().unwrap_or_default(), "available ODBC drivers");
        }
        let options = ConnectionOptions {
            login_timeout_sec: Some(LOGIN_TIMEOUT_SECONDS),
            ..Default::default()
        };
        let connection = environment
            .connect_with_connection_string(&self.connection_string(path), options)
            .map_err(|e| TankRecordsError::ConnectionError(describe_connect_error(&self.driver, &e.to_string())))?;
        Ok(Box::new(OdbcConnection { connection }))
    }
}

/// Adds a hint for the driver manager failures users run into most.
fn describe_connect_error(driver: &str, message: &str) -> String {
    if message.contains("IM014") || message.to_ascii_lowercase().contains("architecture mismatch") {
        format!("{message} (the '{driver}' driver and this program must both be 32-bit or both 64-bit)")
    } else if message.contains("IM002") {
        format!("{message} (is the '{driver}' driver installed?)")
    } else {
        message.to_owned()
    }
}

/// Maps ODBC result-set metadata to the column type used to parse its text.
fn column_type(data_type: DataType) -> ColumnType {
    match data_type {
        DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt | DataType::Bit => ColumnType::Integer,
        DataType::Numeric { scale: 0, .. } | DataType::Decimal { scale: 0, .. } => ColumnType::Integer,
        DataType::Real | DataType::Double | DataType::Float { .. } => ColumnType::Double,
        DataType::Numeric { .. } | DataType::Decimal { .. } => ColumnType::Double,
        DataType::Timestamp { .. } | DataType::Date => ColumnType::Timestamp,
        _ => ColumnType::Varchar,
    }
}

struct OdbcConnection {
    connection: odbc_api::Connection<'static>,
}

impl Connection for OdbcConnection {
    fn list_tables(&mut self) -> Result<Vec<String>, TankRecordsError> {
        let query_error = |e: odbc_api::Error| TankRecordsError::QueryError(e.to_string());
        // Table type 'TABLE' leaves out MSys* system tables and views.
        let mut cursor = self.connection.tables("", "", "", "TABLE").map_err(query_error)?;
        let mut names = Vec::new();
        let mut buffer = Vec::new();
        while let Some(mut row) = cursor.next_row().map_err(query_error)? {
            // TABLE_NAME is the third column of the catalog result set.
            if row.get_wide_text(3, &mut buffer).map_err(query_error)? {
                names.push(String::from_utf16_lossy(&buffer));
            }
        }
        Ok(names)
    }

    fn select(&mut self, projection: &Projection) -> Result<Table, TankRecordsError> {
        let query_error = |e: odbc_api::Error| TankRecordsError::QueryError(e.to_string());
        let sql = projection.to_sql();
        debug!(%sql, "executing projection");
        let mut cursor = self
            .connection
            .execute(&sql, ())
            .map_err(query_error)?
            .ok_or_else(|| TankRecordsError::QueryError(format!("'{sql}' returned no result set")))?;

        let count = cursor.num_result_cols().map_err(query_error)?;
        let mut columns = Vec::new();
        for index in 1..=count as u16 {
            let name = cursor.col_name(index).map_err(query_error)?;
            let kind = column_type(cursor.col_data_type(index).map_err(query_error)?);
            columns.push(Column::new(&name, kind));
        }

        let mut table = Table::new(columns);
        let mut buffer = Vec::new();
        while let Some(mut row) = cursor.next_row().map_err(query_error)? {
            let mut values = Vec::with_capacity(table.columns.len());
            for (index, column) in table.columns.iter().enumerate() {
                let value = if row.get_wide_text(index as u16 + 1, &mut buffer).map_err(query_error)? {
                    Value::parse(column.kind, &String::from_utf16_lossy(&buffer))
                } else {
                    Value::Null
                };
                values.push(value);
            }
            table.push(values);
        }
        Ok(table)
    }

    fn close(self: Box<Self>) -> Result<(), TankRecordsError> {
        // The driver manager disconnects when the handle is released.
        drop(self.connection);
        Ok(())
    }
}
