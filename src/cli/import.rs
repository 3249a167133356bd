use std::path::Path;

use colored::Colorize;

use crate::cli::open_ledger;
use crate::error::Result;
use crate::importer::import_entries;

pub fn run(file: &str) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let path = Path::new(file);
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    let report = import_entries(&conn, owner, &bytes, &file_name)?;

    println!("{} imported, {} failed", report.succeeded, report.errors.len());
    for error in &report.errors {
        eprintln!("  {}", error.yellow());
    }
    Ok(())
}
