pub mod budgets;
pub mod categories;
pub mod dashboard;
pub mod demo;
pub mod entries;
pub mod export;
pub mod import;
pub mod init;
pub mod profile;
pub mod report;
pub mod status;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{LedgerError, Result};
use crate::models::{EntryKind, Frequency};
use crate::settings::{get_data_dir, load_settings};
use crate::store;

/// Opens the active database and resolves the active profile to its owner id.
pub(crate) fn open_ledger() -> Result<(Connection, i64)> {
    let db_path = get_data_dir().join("saldo.db");
    if !db_path.exists() {
        return Err(LedgerError::Settings(
            "No database found. Run `saldo init` to set one up.".to_string(),
        ));
    }
    let conn = get_connection(&db_path)?;
    let owner = store::ensure_owner(&conn, &load_settings().profile)?;
    Ok((conn, owner))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        LedgerError::Validation(format!("Invalid date '{raw}' (expected YYYY-MM-DD)"))
    })
}

pub(crate) fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() == 2 {
        if let (Ok(year), Ok(month)) = (parts[0].parse::<i32>(), parts[1].parse::<u32>()) {
            if (1..=12).contains(&month) {
                return Ok((year, month));
            }
        }
    }
    Err(LedgerError::Validation(format!(
        "Invalid month '{raw}' (expected YYYY-MM)"
    )))
}

pub(crate) fn month_or_now(month: &Option<String>) -> Result<(i32, u32)> {
    match month {
        Some(raw) => parse_month(raw),
        None => {
            let today = Local::now().date_naive();
            Ok((today.year(), today.month()))
        }
    }
}

pub(crate) fn parse_kind(raw: &str) -> Result<EntryKind> {
    EntryKind::parse(raw).ok_or_else(|| {
        LedgerError::Validation(format!("Invalid kind '{raw}' (expected income or expense)"))
    })
}

pub(crate) fn parse_frequency(raw: &str) -> Result<Frequency> {
    Frequency::parse(raw).ok_or_else(|| {
        LedgerError::Validation(format!(
            "Invalid frequency '{raw}' (expected weekly, monthly, or yearly)"
        ))
    })
}

#[derive(Parser)]
#[command(name = "saldo", about = "Personal finance ledger for the command line.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Saldo: choose a data directory and initialize the database.
    Init {
        /// Path for Saldo data (default: ~/Documents/saldo)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage profiles; each profile keeps its own entries and budgets.
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Manage ledger entries.
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Manage categories.
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage monthly spending budgets.
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
    /// Month-at-a-glance summary with budget alerts (default command).
    Dashboard,
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Import entries from a CSV, TXT, or XLSX file.
    Import {
        /// Path to the file to import
        file: String,
    },
    /// Export a year of entries.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Load a year of sample data to explore Saldo.
    Demo,
    /// Show the active profile, database, and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Add a profile.
    Add {
        /// Profile name, e.g. 'ana'
        name: String,
    },
    /// Switch the active profile.
    Use {
        /// Profile name
        name: String,
    },
    /// List profiles.
    List,
}

#[derive(Subcommand)]
pub enum EntryCommands {
    /// Add a ledger entry.
    Add {
        /// What the money was for, e.g. 'Groceries at the market'
        description: String,
        /// Amount in euros; always positive, the kind decides the sign
        amount: f64,
        /// Entry kind: income or expense
        #[arg(long, default_value = "expense")]
        kind: String,
        /// Category name
        #[arg(long)]
        category: Option<String>,
        /// Date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Repeat this entry automatically
        #[arg(long)]
        recurring: bool,
        /// Recurrence frequency: weekly, monthly, yearly
        #[arg(long)]
        frequency: Option<String>,
    },
    /// List entries, newest first.
    List {
        /// Month filter: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Year filter: YYYY
        #[arg(long)]
        year: Option<i32>,
        /// Kind filter: income or expense
        #[arg(long)]
        kind: Option<String>,
        /// Category name filter
        #[arg(long)]
        category: Option<String>,
        /// Maximum rows to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Update an existing entry.
    Edit {
        /// Entry ID (shown in `saldo entry list`)
        id: i64,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New amount
        #[arg(long)]
        amount: Option<f64>,
        /// New kind: income or expense
        #[arg(long)]
        kind: Option<String>,
        /// New category name; use 'none' to clear it
        #[arg(long)]
        category: Option<String>,
        /// New date: YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// Turn recurrence on or off
        #[arg(long)]
        recurring: Option<bool>,
        /// New frequency: weekly, monthly, yearly
        #[arg(long)]
        frequency: Option<String>,
    },
    /// Delete an entry by ID.
    Delete {
        /// Entry ID (shown in `saldo entry list`)
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category.
    Add {
        /// Category name, e.g. 'Pets'
        name: String,
        /// Category kind: income or expense
        #[arg(long, default_value = "expense")]
        kind: String,
        /// Hex color, e.g. '#20c997'
        #[arg(long)]
        color: Option<String>,
    },
    /// List visible categories with usage counts.
    List,
    /// Update a category you own.
    Edit {
        /// Category ID (shown in `saldo category list`)
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New hex color
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a category you own; it must have no entries.
    Delete {
        /// Category ID (shown in `saldo category list`)
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set (or overwrite) a category's spending limit for a month.
    Set {
        /// Expense category name
        category: String,
        /// Limit in euros
        limit: f64,
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Show budget consumption for a month.
    List {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Copy budget limits from one month to another.
    Copy {
        /// Source month: YYYY-MM
        #[arg(long)]
        from: String,
        /// Target month: YYYY-MM
        #[arg(long)]
        to: String,
    },
    /// Remove a budget by ID.
    Remove {
        /// Budget ID (shown in `saldo budget list`)
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Month-by-month totals and top expense categories for a year.
    Annual {
        /// Year: YYYY (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Daily balance evolution through a month.
    Evolution {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Compare a month against the preceding one.
    Compare {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export a year of entries to CSV.
    Csv {
        /// Year: YYYY (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Output file path
        #[arg(long)]
        output: Option<String>,
    },
    /// Export a year of entries to XLSX.
    #[cfg(feature = "xlsx")]
    Xlsx {
        /// Year: YYYY (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Output file path
        #[arg(long)]
        output: Option<String>,
    },
    /// Export an annual statement to PDF.
    #[cfg(feature = "pdf")]
    Pdf {
        /// Year: YYYY (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Output file path
        #[arg(long)]
        output: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_accepts_valid() {
        assert_eq!(parse_month("2024-03").unwrap(), (2024, 3));
        assert_eq!(parse_month("1999-12").unwrap(), (1999, 12));
    }

    #[test]
    fn test_parse_month_rejects_garbage() {
        for bad in ["2024", "2024-13", "2024-00", "march", "2024-3-1", ""] {
            assert!(parse_month(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_date_round_trip() {
        let date = parse_date("2024-02-29").unwrap();
        assert_eq!(date.to_string(), "2024-02-29");
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("29/02/2024").is_err());
    }

    #[test]
    fn test_parse_kind_and_frequency() {
        assert_eq!(parse_kind("income").unwrap(), EntryKind::Income);
        assert!(parse_kind("transfer").is_err());
        assert_eq!(parse_frequency("weekly").unwrap(), Frequency::Weekly);
        assert!(parse_frequency("daily").is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
