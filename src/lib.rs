//! # Tank Records Extractor
//!
//! Extracts the `TankRecords` table from Microsoft Access database files
//! (`.mdb`, `.accdb`) and combines the rows of many files into one CSV file.
//!
//! ## Features
//!
//! - **Scoped reader**: open a database file, list its tables, run projection
//!   queries, write CSV, with the connection closed on every exit path
//! - **Typed values**: driver values mapped to an explicit tagged [`Value`]
//! - **Column normalization**: temperature rounded to 2 decimals, volume truncated
//!   to an integer, timestamps rounded to 2-minute boundaries
//! - **Batch combine**: recursive folder walk with one header in the combined
//!   output and per-file failures recorded instead of aborting the run
//! - **Grade reports**: wide per-fuel-grade CSV reports built from the combined rows
//! - **ODBC driver** (feature `odbc`): connects through the Microsoft Access driver
//!
//! ## Example
//!
//! ```rust,ignore
//! use tank_records::batch::{combine, CombineOptions};
//! use tank_records::database::odbc::OdbcDriver;
//!
//! let summary = combine(&OdbcDriver::default(), "reports".as_ref(), "combined.csv".as_ref(), &CombineOptions::default())?;
//! println!("{summary}");
//! ```
pub mod batch;
pub mod database;
pub mod error;
pub mod output;
pub mod reader;
pub mod report;

pub use batch::combine;
pub use batch::CombineOptions;
pub use batch::CombineSummary;
pub use database::Driver;
pub use database::Table;
pub use database::Value;
pub use error::TankRecordsError;
pub use reader::with_reader;
pub use reader::MdbReader;
pub use reader::Normalization;
