use crate::database::ColumnType;
use crate::database::Table;
use crate::database::Value;
use chrono::Duration;
use chrono::NaiveDateTime;

/// Post-query normalization rules applied to named columns.
///
/// A rule whose column is absent from the result is skipped, and values a rule
/// cannot interpret (NULL, non-numeric text) are left untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Normalization {
    /// Column rounded to `temperature_scale` decimal places
    pub temperature_column: Option<String>,
    /// Decimal places kept for the temperature column
    pub temperature_scale: usize,
    /// Column truncated to an integer
    pub volume_column: Option<String>,
    /// Column rounded to the nearest multiple of `timestamp_round`
    pub timestamp_column: Option<String>,
    /// Rounding step for the timestamp column, `None` keeps the driver value
    pub timestamp_round: Option<Duration>,
}

impl Default for Normalization {
    fn default() -> Self {
        Normalization {
            temperature_column: Some("PRODUCT_TEMP".to_owned()),
            temperature_scale: 2,
            volume_column: Some("GSV".to_owned()),
            timestamp_column: Some("BACKGROUND_TIME_STAMP".to_owned()),
            timestamp_round: Some(Duration::minutes(2)),
        }
    }
}

impl Normalization {
    /// Rules that leave every value as the driver returned it.
    pub fn none() -> Self {
        Normalization {
            temperature_column: None,
            temperature_scale: 0,
            volume_column: None,
            timestamp_column: None,
            timestamp_round: None,
        }
    }

    /// Applies every rule to the table in place.
    pub fn apply(&self, table: &mut Table) {
        if let Some(index) = self.temperature_column.as_deref().and_then(|name| table.column_index(name)) {
            let scale = self.temperature_scale;
            table.columns[index].kind = ColumnType::Double;
            for row in table.rows.iter_mut() {
                if let Some(value) = round_decimal(&row[index], scale) {
                    row[index] = value;
                }
            }
        }
        if let Some(index) = self.volume_column.as_deref().and_then(|name| table.column_index(name)) {
            table.columns[index].kind = ColumnType::Integer;
            for row in table.rows.iter_mut() {
                if let Some(value) = truncate_integer(&row[index]) {
                    row[index] = value;
                }
            }
        }
        if let (Some(index), Some(step)) = (
            self.timestamp_column.as_deref().and_then(|name| table.column_index(name)),
            self.timestamp_round,
        ) {
            table.columns[index].kind = ColumnType::Timestamp;
            for row in table.rows.iter_mut() {
                if let Some(datetime) = row[index].as_datetime().and_then(|datetime| round_datetime(datetime, step)) {
                    row[index] = Value::Timestamp(datetime);
                }
            }
        }
    }
}

/// Rounds a numeric value to `scale` decimal places, halfway values to the even digit.
fn round_decimal(value: &Value, scale: usize) -> Option<Value> {
    let number = value.as_f64()?;
    let factor = 10f64.powi(scale as i32);
    Some(Value::Decimal {
        value: (number * factor).round_ties_even() / factor,
        scale,
    })
}

/// Truncates a numeric value toward zero.
fn truncate_integer(value: &Value) -> Option<Value> {
    let number = value.as_f64()?.trunc();
    if number < i64::MIN as f64 || number > i64::MAX as f64 {
        return None;
    }
    Some(Value::Integer(number as i64))
}

/// Rounds to the nearest multiple of `step` counted from the Unix epoch.
/// A value exactly halfway goes to the even multiple.
fn round_datetime(datetime: NaiveDateTime, step: Duration) -> Option<NaiveDateTime> {
    let step = step.num_microseconds().filter(|step| *step > 0)?;
    let micros = datetime.and_utc().timestamp_micros();
    let quotient = micros.div_euclid(step);
    let remainder = micros.rem_euclid(step);
    let quotient = match (remainder * 2).cmp(&step) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + quotient.rem_euclid(2),
    };
    chrono::DateTime::from_timestamp_micros(quotient * step).map(|rounded| rounded.naive_utc())
}
