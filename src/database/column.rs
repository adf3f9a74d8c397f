/// Column data types a driver value can be mapped to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// Whole numbers (Byte, Integer, Long Integer, Yes/No)
    Integer,
    /// Floating point and decimal numbers (Single, Double, Currency, Decimal)
    Double,
    /// Text, Memo and anything without a more specific mapping
    Varchar,
    /// Date/Time columns
    Timestamp,
}

/// A named, typed column of a tabular result.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Column name as reported by the driver
    pub name: String,
    /// Column data type
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: &str, kind: ColumnType) -> Self {
        Column {
            name: name.to_owned(),
            kind,
        }
    }

    /// Column names are compared the way Access compares identifiers.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl ColumnType {
    /// Returns the lowercase name of the column type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Double => "double",
            ColumnType::Varchar => "varchar",
            ColumnType::Timestamp => "timestamp",
        }
    }
}
