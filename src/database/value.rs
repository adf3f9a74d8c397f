use crate::database::column::ColumnType;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Timelike;
use std::fmt::Display;

/// Formats accepted when a driver hands back timestamps as text.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// A single value read from a database column.
///
/// Driver values are mapped to one of these variants at the read boundary so that
/// normalization and CSV output work on known types.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    /// Character data
    Text(String),
    /// Whole numbers, including Yes/No columns (0 or 1)
    Integer(i64),
    /// Floating point numbers as returned by the driver
    Float(f64),
    /// Floating point number rendered with a fixed number of decimal places
    Decimal { value: f64, scale: usize },
    /// Date and time without zone
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Parses the textual form of a driver value according to its column type.
    /// Text that does not fit the column type is kept as text.
    pub fn parse(kind: ColumnType, text: &str) -> Self {
        match kind {
            ColumnType::Varchar => Value::Text(text.to_owned()),
            ColumnType::Integer => to_bigint(text)
                .map(Value::Integer)
                .or_else(|| to_double(text).map(Value::Float))
                .unwrap_or_else(|| Value::Text(text.to_owned())),
            ColumnType::Double => to_double(text)
                .map(Value::Float)
                .unwrap_or_else(|| Value::Text(text.to_owned())),
            ColumnType::Timestamp => to_datetime(text)
                .map(Value::Timestamp)
                .unwrap_or_else(|| Value::Text(text.to_owned())),
        }
    }

    /// Returns true for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, parsing text when it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) | Value::Decimal { value, .. } => Some(*value),
            Value::Text(text) => to_double(text),
            Value::Null | Value::Timestamp(_) => None,
        }
    }

    /// Timestamp view of the value, parsing text when it holds a date.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(value) => Some(*value),
            Value::Text(text) => to_datetime(text),
            _ => None,
        }
    }
}

/// Parses an integer, accepting surrounding whitespace.
fn to_bigint(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

/// Parses a double-precision number. NaN and infinities are rejected.
fn to_double(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses a timestamp in the forms ODBC drivers print, or a bare date at midnight.
fn to_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(text) => write!(f, "{text}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Decimal { value, scale } => write!(f, "{value:.scale$}"),
            Value::Timestamp(value) if value.nanosecond() == 0 => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            Value::Timestamp(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%.3f")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn parse_by_column_type() {
        assert_eq!(Value::parse(ColumnType::Integer, "42"), Value::Integer(42));
        assert_eq!(Value::parse(ColumnType::Integer, "42.5"), Value::Float(42.5));
        assert_eq!(Value::parse(ColumnType::Double, " 0.9981 "), Value::Float(0.9981));
        assert_eq!(Value::parse(ColumnType::Varchar, "12"), Value::Text("12".to_owned()));
        assert_eq!(
            Value::parse(ColumnType::Timestamp, "2024-03-01 10:15:00"),
            Value::Timestamp(datetime("2024-03-01 10:15:00"))
        );
        assert_eq!(
            Value::parse(ColumnType::Timestamp, "2024-03-01"),
            Value::Timestamp(datetime("2024-03-01 00:00:00"))
        );
    }

    #[test]
    fn parse_keeps_unexpected_text() {
        assert_eq!(Value::parse(ColumnType::Double, "n/a"), Value::Text("n/a".to_owned()));
        assert_eq!(Value::parse(ColumnType::Double, "NaN"), Value::Text("NaN".to_owned()));
        assert_eq!(Value::parse(ColumnType::Timestamp, "yesterday"), Value::Text("yesterday".to_owned()));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        assert_eq!(Value::Float(1.25).to_string(), "1.25");
        assert_eq!(Value::Decimal { value: 21.5, scale: 2 }.to_string(), "21.50");
        assert_eq!(Value::Timestamp(datetime("2024-03-01 10:15:00")).to_string(), "2024-03-01 10:15:00");
        let fractional = datetime("2024-03-01 10:15:00") + chrono::Duration::milliseconds(250);
        assert_eq!(Value::Timestamp(fractional).to_string(), "2024-03-01 10:15:00.250");
    }

    #[test]
    fn numeric_and_datetime_views() {
        assert_eq!(Value::Text("3.5".to_owned()).as_f64(), Some(3.5));
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Null.as_f64(), None);
        assert_eq!(
            Value::Text("2024-03-01 10:15:00".to_owned()).as_datetime(),
            Some(datetime("2024-03-01 10:15:00"))
        );
        assert_eq!(Value::Float(1.0).as_datetime(), None);
    }
}
