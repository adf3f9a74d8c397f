use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use chrono::Duration;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tank_records::batch::CombineOptions;
use tank_records::database::odbc;
use tank_records::database::odbc::OdbcDriver;
use tank_records::output;
use tank_records::report;
use tank_records::report::Grade;
use tank_records::with_reader;
use tank_records::Normalization;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// ODBC driver used to open database files
    #[clap(long, env = "TANK_RECORDS_DRIVER", default_value = odbc::ACCESS_DRIVER, global = true)]
    driver: String,

    /// Password of protected database files
    #[clap(long, env = "TANK_RECORDS_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Print debug information, overriding RUST_LOG
    #[clap(long, global = true)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Projection {
    /// Table to read
    #[clap(short, long, default_value = "TankRecords")]
    table: String,

    /// Comma separated columns to select, the tank gauging columns by default
    #[clap(short, long, value_delimiter = ',', conflicts_with = "all_columns")]
    columns: Option<Vec<String>>,

    /// Select every column of the table
    #[clap(long)]
    all_columns: bool,

    /// Round timestamps to this many minutes, 0 keeps them as stored
    #[clap(long, default_value_t = 2)]
    timestamp_round_minutes: u32,
}

impl Projection {
    fn columns(&self) -> Option<Vec<String>> {
        if self.all_columns {
            None
        } else {
            self.columns.clone().or_else(|| CombineOptions::default().columns)
        }
    }

    fn normalization(&self) -> Normalization {
        Normalization {
            timestamp_round: (self.timestamp_round_minutes > 0)
                .then(|| Duration::minutes(self.timestamp_round_minutes as i64)),
            ..Normalization::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Combine a table from every database file under a folder into one CSV file
    Combine {
        /// Folder searched recursively for .mdb and .accdb files
        root: PathBuf,

        /// Combined CSV file
        #[clap(short, long, default_value = "Combined Tank records.csv")]
        output: PathBuf,

        #[clap(flatten)]
        projection: Projection,

        /// Fuel grade reports to write after combining: diesel, ulp, kero, jet-a1, all (or 1-5)
        #[clap(short, long)]
        grade: Vec<String>,

        /// Folder for grade reports, the output file's folder by default
        #[clap(long)]
        report_dir: Option<PathBuf>,
    },

    /// Export a table of one database file to CSV
    Export {
        /// Database file
        file: PathBuf,

        /// CSV file to write
        output: PathBuf,

        #[clap(flatten)]
        projection: Projection,
    },

    /// List the tables of a database file
    Tables {
        /// Database file
        file: PathBuf,
    },

    /// List the installed ODBC drivers
    Drivers,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.debug))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let driver = OdbcDriver {
        driver: cli.driver,
        password: cli.password,
    };

    match cli.command {
        Commands::Combine {
            root,
            output,
            projection,
            grade,
            report_dir,
        } => {
            let grades = grade
                .iter()
                .map(|selection| Grade::parse_selection(selection))
                .collect::<Result<Vec<_>, _>>()?
                .concat();
            let options = CombineOptions {
                table_name: projection.table.to_owned(),
                columns: projection.columns(),
                normalization: projection.normalization(),
                ..CombineOptions::default()
            };
            let summary = tank_records::combine(&driver, &root, &output, &options)
                .with_context(|| format!("Failed to combine '{}'", root.display()))?;
            println!("{summary}");

            if summary.succeeded() == 0 {
                println!("No database file with a '{}' table was processed", options.table_name);
                return Ok(ExitCode::FAILURE);
            }
            if !grades.is_empty() {
                let combined = output::read_table(&output)
                    .with_context(|| format!("Failed to read '{}'", output.display()))?;
                let dir = report_dir.unwrap_or_else(|| parent_dir(&output));
                for (path, rows) in report::write_reports(&combined, &grades, &dir)? {
                    println!("{} rows saved to {}", rows, path.display());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Export {
            file,
            output,
            projection,
        } => {
            let columns = projection.columns();
            let rows = with_reader(&driver, &file, projection.normalization(), |reader| {
                reader.write_csv(&projection.table, &output, columns.as_deref())
            })
            .with_context(|| format!("Failed to export '{}'", file.display()))?;
            info!(rows, output = %output.display(), "exported");
            println!("{} rows saved to {}", rows, output.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Tables { file } => {
            let tables = with_reader(&driver, &file, Normalization::none(), |reader| reader.list_tables())
                .with_context(|| format!("Failed to list tables of '{}'", file.display()))?;
            for table in tables {
                println!("{table}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Drivers => {
            for driver in odbc::drivers()? {
                println!("{driver}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `--debug` wins over `RUST_LOG`, which wins over the `info` default.
fn log_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Folder holding `path`, the working directory for a bare file name.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
        _ => PathBuf::from("."),
    }
}
