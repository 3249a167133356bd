use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};

use crate::cli::open_ledger;
use crate::error::Result;
use crate::exporter;
#[cfg(feature = "pdf")]
use crate::pdf;
use crate::settings::get_data_dir;
#[cfg(feature = "pdf")]
use crate::settings::load_settings;

fn default_path(name: &str, year: i32, ext: &str) -> PathBuf {
    get_data_dir().join("exports").join(format!("{name}-{year}.{ext}"))
}

fn write_export(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn year_or_now(year: Option<i32>) -> i32 {
    year.unwrap_or_else(|| Local::now().date_naive().year())
}

pub fn csv(year: Option<i32>, output: Option<String>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let year = year_or_now(year);
    let export = exporter::year_export(&conn, owner, year)?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path("entries", year, "csv"));
    write_export(&path, exporter::to_delimited(&export).as_bytes())
}

#[cfg(feature = "xlsx")]
pub fn xlsx(year: Option<i32>, output: Option<String>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let year = year_or_now(year);
    let export = exporter::year_export(&conn, owner, year)?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path("entries", year, "xlsx"));
    write_export(&path, &exporter::to_spreadsheet(&export)?)
}

#[cfg(feature = "pdf")]
pub fn pdf(year: Option<i32>, output: Option<String>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let year = year_or_now(year);
    let export = exporter::year_export(&conn, owner, year)?;
    let profile = load_settings().profile;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path("statement", year, "pdf"));
    write_export(&path, &pdf::render_statement(&export, &profile)?)
}
