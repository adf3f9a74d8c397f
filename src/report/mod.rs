//! # Grade Report Module
//!
//! Pivots combined tank records into one wide CSV per fuel grade: a row per
//! timestamp with the readings of every tank holding that grade side by side.
use crate::database::Column;
use crate::database::ColumnType;
use crate::database::Table;
use crate::database::Value;
use crate::error::ResultMessage;
use crate::error::TankRecordsError;
use crate::output;
use regex::RegexBuilder;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

const TIMESTAMP_COLUMN: &str = "BACKGROUND_TIME_STAMP";
const TANK_COLUMN: &str = "TANK_NAME";
const PRODUCT_COLUMN: &str = "PRODUCT_NAME";

/// Per-tank readings placed after each tank name, in output order.
const TANK_COLUMNS: [&str; 5] = ["PRODUCT_NAME", "PRODUCT_TEMP", "CORRECTION_FACTOR", "GSV", "PRODUCT_LEVEL"];

/// Fuel grades a report can be produced for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Grade {
    Diesel,
    Ulp,
    Kero,
    JetA1,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Diesel, Grade::Ulp, Grade::Kero, Grade::JetA1];

    /// Text searched for in the product name.
    pub const fn label(&self) -> &'static str {
        match self {
            Grade::Diesel => "DIESEL",
            Grade::Ulp => "ULP",
            Grade::Kero => "KERO",
            Grade::JetA1 => "JET A1",
        }
    }

    /// Parses a grade selection (case-insensitive):
    /// - "diesel" or "1", "ulp" or "2", "kero" or "3", "jet-a1"/"jet a1"/"jeta1" or "4"
    /// - "all" or "5" for every grade
    /// - a comma separated list of the above
    pub fn parse_selection(text: &str) -> Result<Vec<Grade>, TankRecordsError> {
        let mut grades = Vec::new();
        for item in text.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let selected: &[Grade] = match item.to_ascii_uppercase().as_str() {
                "1" | "DIESEL" => &[Grade::Diesel],
                "2" | "ULP" => &[Grade::Ulp],
                "3" | "KERO" => &[Grade::Kero],
                "4" | "JET A1" | "JET-A1" | "JETA1" => &[Grade::JetA1],
                "5" | "ALL" => &Grade::ALL,
                _ => Err(TankRecordsError::UnknownGrade(item.to_owned()))?,
            };
            for grade in selected {
                if !grades.contains(grade) {
                    grades.push(*grade);
                }
            }
        }
        if grades.is_empty() {
            Err(TankRecordsError::UnknownGrade(text.to_owned()))?;
        }
        Ok(grades)
    }

    /// File name of the grade's report.
    pub fn file_name(&self) -> String {
        format!("{} Grade_report.csv", self.label())
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Builds the wide table of one grade from combined tank records.
///
/// Rows whose product name contains the grade label are kept. Tanks are ordered by
/// name and timestamps ascending; for each (timestamp, tank) the first record wins,
/// and a tank without a record at a timestamp gets empty readings.
pub fn pivot(table: &Table, grade: Grade) -> Result<Table, TankRecordsError> {
    let index = |name: &str| table.column_index(name).ok_or_else(|| TankRecordsError::MissingColumn(name.to_owned()));
    let timestamp = index(TIMESTAMP_COLUMN)?;
    let tank = index(TANK_COLUMN)?;
    let product = index(PRODUCT_COLUMN)?;
    let readings = TANK_COLUMNS.iter().map(|name| index(*name)).collect::<Result<Vec<_>, _>>()?;

    let matcher = RegexBuilder::new(&regex::escape(grade.label())).case_insensitive(true).build()?;
    let mut tanks = BTreeSet::<String>::new();
    let mut records = BTreeMap::<String, (&Value, BTreeMap<String, &Vec<Value>>)>::new();
    for row in &table.rows {
        if row[product].is_null() || !matcher.is_match(&row[product].to_string()) {
            continue;
        }
        let tank_name = row[tank].to_string();
        tanks.insert(tank_name.to_owned());
        records
            .entry(row[timestamp].to_string())
            .or_insert_with(|| (&row[timestamp], BTreeMap::new()))
            .1
            .entry(tank_name)
            .or_insert(row);
    }

    let mut columns = vec![Column::new(TIMESTAMP_COLUMN, ColumnType::Timestamp)];
    for _ in &tanks {
        columns.push(Column::new(TANK_COLUMN, ColumnType::Varchar));
        for reading in readings.iter() {
            columns.push(table.columns[*reading].clone());
        }
    }

    let mut result = Table::new(columns);
    for (timestamp, by_tank) in records.values() {
        let mut values = vec![(*timestamp).clone()];
        for tank_name in &tanks {
            values.push(Value::Text(tank_name.to_owned()));
            match by_tank.get(tank_name) {
                Some(row) => values.extend(readings.iter().map(|reading| row[*reading].clone())),
                None => values.extend(readings.iter().map(|_| Value::Null)),
            }
        }
        result.push(values);
    }
    Ok(result)
}

/// Writes `<dir>/<GRADE> Grade_report.csv` for every grade.
/// Returns the written paths with their row counts.
pub fn write_reports(table: &Table, grades: &[Grade], dir: &Path) -> Result<Vec<(PathBuf, usize)>, TankRecordsError> {
    let mut written = Vec::new();
    for grade in grades {
        let report = pivot(table, *grade)?;
        let path = dir.join(grade.file_name());
        output::write_table(&path, &report).with_prefix(&path.display().to_string())?;
        info!(grade = %grade, path = %path.display(), rows = report.len(), "wrote grade report");
        written.push((path, report.len()));
    }
    Ok(written)
}
