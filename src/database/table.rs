use crate::database::column::Column;
use crate::database::value::Value;
use crate::error::TankRecordsError;

/// Tabular result of a projection query: ordered columns and rows of values.
///
/// Every row holds exactly one value per column, in column order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Column definitions, defining the row shape
    pub columns: Vec<Column>,
    /// Row values in column order
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding missing trailing values with NULL and dropping extra ones.
    pub fn push(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ordered column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Position of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.is_named(name))
    }

    /// Value of the named column in the given row.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.column_index(name)?;
        self.rows.get(row).and_then(|values| values.get(index))
    }

    /// Iterates a row as (column name, value) pairs.
    pub fn record(&self, row: usize) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.columns
            .iter()
            .map(|column| column.name.as_str())
            .zip(self.rows.get(row).into_iter().flatten())
    }
}

/// A table name plus the ordered columns to select from it.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    /// Table to select from
    pub table: String,
    /// Columns to select, `None` for all columns
    pub columns: Option<Vec<String>>,
}

impl Projection {
    /// Creates a projection, rejecting names that cannot be written as bracketed identifiers.
    pub fn new(table: &str, columns: Option<&[String]>) -> Result<Self, TankRecordsError> {
        check_identifier(table, "table")?;
        if let Some(columns) = columns {
            if columns.is_empty() {
                Err(TankRecordsError::QueryError(format!("Empty column list for table '{table}'")))?;
            }
            for column in columns {
                check_identifier(column, "column")?;
            }
        }
        Ok(Projection {
            table: table.to_owned(),
            columns: columns.map(|columns| columns.to_vec()),
        })
    }

    /// Renders the projection as an Access SQL statement.
    pub fn to_sql(&self) -> String {
        let columns = match &self.columns {
            Some(columns) => columns
                .iter()
                .map(|column| format!("[{column}]"))
                .collect::<Vec<_>>()
                .join(", "),
            None => "*".to_owned(),
        };
        format!("SELECT {columns} FROM [{}]", self.table)
    }
}

/// Access has no escape for `]` inside bracketed identifiers.
fn check_identifier(name: &str, kind: &str) -> Result<(), TankRecordsError> {
    if name.trim().is_empty() || name.contains(['[', ']']) {
        Err(TankRecordsError::QueryError(format!("Invalid {kind} name '{name}'")))?;
    }
    Ok(())
}
