//! In-memory driver used by unit tests in place of an ODBC data source.

use crate::database::Connection;
use crate::database::Driver;
use crate::database::Projection;
use crate::database::Table;
use crate::error::TankRecordsError;
use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;

/// Contents registered for one database file.
#[derive(Clone)]
enum Contents {
    Tables(Vec<(String, Table)>),
    Broken(String),
}

#[derive(Default)]
pub(crate) struct MemoryDriver {
    databases: HashMap<PathBuf, Contents>,
    /// Number of connections opened so far
    pub(crate) opened: Rc<Cell<usize>>,
    /// Number of connections closed so far
    pub(crate) closed: Rc<Cell<usize>>,
}

impl MemoryDriver {
    /// Registers a database file holding the given tables.
    pub(crate) fn with_tables(mut self, path: &Path, tables: Vec<(&str, Table)>) -> Self {
        let tables = tables.into_iter().map(|(name, table)| (name.to_owned(), table)).collect();
        self.databases.insert(path.to_owned(), Contents::Tables(tables));
        self
    }

    /// Registers a database file whose connection attempt fails.
    pub(crate) fn with_broken(mut self, path: &Path, message: &str) -> Self {
        self.databases.insert(path.to_owned(), Contents::Broken(message.to_owned()));
        self
    }
}

impl Driver for MemoryDriver {
    fn connect(&self, path: &Path) -> Result<Box<dyn Connection>, TankRecordsError> {
        match self.databases.get(path) {
            Some(Contents::Tables(tables)) => {
                self.opened.set(self.opened.get() + 1);
                Ok(Box::new(MemoryConnection {
                    tables: tables.clone(),
                    closed: self.closed.clone(),
                }))
            }
            Some(Contents::Broken(message)) => Err(TankRecordsError::ConnectionError(message.to_owned())),
            None => Err(TankRecordsError::ConnectionError(format!(
                "Unrecognized database format '{}'",
                path.display()
            ))),
        }
    }
}

struct MemoryConnection {
    tables: Vec<(String, Table)>,
    closed: Rc<Cell<usize>>,
}

impl Connection for MemoryConnection {
    fn list_tables(&mut self) -> Result<Vec<String>, TankRecordsError> {
        Ok(self.tables.iter().map(|(name, _)| name.to_owned()).collect())
    }

    fn select(&mut self, projection: &Projection) -> Result<Table, TankRecordsError> {
        let (_, table) = self
            .tables
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&projection.table))
            .ok_or_else(|| TankRecordsError::QueryError(format!("Cannot find table '{}'", projection.table)))?;
        let Some(columns) = &projection.columns else {
            return Ok(table.clone());
        };
        let indexes = columns
            .iter()
            .map(|name| {
                table.column_index(name).ok_or_else(|| {
                    TankRecordsError::QueryError(format!("Too few parameters, unknown column '{name}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut result = Table::new(indexes.iter().map(|index| table.columns[*index].clone()).collect());
        for row in &table.rows {
            result.push(indexes.iter().map(|index| row[*index].clone()).collect());
        }
        Ok(result)
    }

    fn close(self: Box<Self>) -> Result<(), TankRecordsError> {
        self.closed.set(self.closed.get() + 1);
        Ok(())
    }
}
