use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};
use crate::models::{Entry, EntryKind, ParsedEntry};
use crate::store;

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

const DESCRIPTION_ALIASES: &[&str] = &["description", "descri\u{e7}\u{e3}o"];
const AMOUNT_ALIASES: &[&str] = &["amount", "valor", "valor (\u{20ac})"];
const KIND_ALIASES: &[&str] = &["tipo", "type"];
const DATE_ALIASES: &[&str] = &["data", "date"];
const CATEGORY_ALIASES: &[&str] = &["categoria", "category"];

fn normalize_header(cell: &str) -> String {
    cell.trim().trim_matches('"').trim().to_lowercase()
}

/// Strips currency symbols and whitespace, then treats a comma as the decimal
/// separator when present ("1.234,56" reads as 1234.56).
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{20ac}' && *c != '$' && *c != '"')
        .collect();
    if s.contains(',') {
        s = s.replace('.', "").replace(',', ".");
    }
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}

pub fn parse_kind(raw: &str) -> Option<EntryKind> {
    match raw.trim().to_lowercase().as_str() {
        "receita" | "income" | "revenue" | "entrada" => Some(EntryKind::Income),
        "despesa" | "expense" | "cost" | "sa\u{ed}da" | "saida" | "gasto" => {
            Some(EntryKind::Expense)
        }
        _ => None,
    }
}

/// Day-first formats take precedence; ISO and a few export-tool variants are
/// the fallback.
pub fn parse_entry_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|dt| dt.date())
        .ok()
}

#[cfg(feature = "xlsx")]
fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Format detection: both sources normalize to the same row-of-fields table
// ---------------------------------------------------------------------------

enum ImportSource {
    Delimited,
    #[cfg(feature = "xlsx")]
    Spreadsheet,
}

fn detect_format(file_name: &str) -> Result<ImportSource> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" => Ok(ImportSource::Delimited),
        #[cfg(feature = "xlsx")]
        "xlsx" | "xls" => Ok(ImportSource::Spreadsheet),
        _ => Err(LedgerError::UnsupportedFormat(if ext.is_empty() {
            file_name.to_string()
        } else {
            ext
        })),
    }
}

struct RawTable {
    headers: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

fn header_map<'a>(cells: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (i, cell) in cells.enumerate() {
        // First occurrence wins when a header repeats
        map.entry(normalize_header(cell)).or_insert(i);
    }
    map
}

fn parse_delimited(bytes: &[u8]) -> Result<RawTable> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let header_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let delimiter = if header_line.contains(';') { b';' } else { b',' };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut headers = HashMap::new();
    let mut rows = Vec::new();
    let mut in_header = true;
    for result in rdr.records() {
        let Ok(record) = result else { continue };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if in_header {
            headers = header_map(record.iter());
            in_header = false;
        } else {
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }
    }
    Ok(RawTable { headers, rows })
}

#[cfg(feature = "xlsx")]
fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Empty | Data::Error(_) => String::new(),
    }
}

#[cfg(feature = "xlsx")]
fn parse_spreadsheet(bytes: &[u8]) -> Result<RawTable> {
    use calamine::Reader;

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|e| LedgerError::Xlsx(format!("Failed to open spreadsheet: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LedgerError::Xlsx("Spreadsheet has no sheets".to_string()))?
        .map_err(|e| LedgerError::Xlsx(format!("Failed to read sheet: {e}")))?;

    let mut rows_iter = range.rows();
    let headers = match rows_iter.next() {
        Some(row) => {
            let cells: Vec<String> = row.iter().map(cell_to_string).collect();
            header_map(cells.iter().map(|c| c.as_str()))
        }
        None => HashMap::new(),
    };
    let mut rows = Vec::new();
    for row in rows_iter {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(cells);
    }
    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

fn field<'a>(row: &'a [String], headers: &HashMap<String, usize>, aliases: &[&str]) -> &'a str {
    for alias in aliases {
        if let Some(&idx) = headers.get(*alias) {
            if let Some(value) = row.get(idx) {
                return value.trim();
            }
        }
    }
    ""
}

fn normalize_row(
    conn: &Connection,
    owner_id: i64,
    headers: &HashMap<String, usize>,
    row: &[String],
    row_number: usize,
) -> std::result::Result<ParsedEntry, String> {
    let description = field(row, headers, DESCRIPTION_ALIASES).to_string();
    if description.is_empty() {
        return Err(format!("Row {row_number}: Missing description"));
    }

    let raw_amount = field(row, headers, AMOUNT_ALIASES);
    let amount = match parse_amount(raw_amount) {
        Some(v) if v > 0.0 => v,
        _ => return Err(format!("Row {row_number}: Invalid amount '{raw_amount}'")),
    };

    let raw_kind = field(row, headers, KIND_ALIASES);
    let kind = parse_kind(raw_kind)
        .ok_or_else(|| format!("Row {row_number}: Unknown kind '{raw_kind}'"))?;

    let raw_date = field(row, headers, DATE_ALIASES);
    let date = parse_entry_date(raw_date)
        .ok_or_else(|| format!("Row {row_number}: Invalid date '{raw_date}'"))?;

    // An unmatched category name is tolerated; the entry lands uncategorized.
    let raw_category = field(row, headers, CATEGORY_ALIASES);
    let category_id = if raw_category.is_empty() {
        None
    } else {
        store::find_category_by_name(conn, owner_id, raw_category, kind)
            .map_err(|e| format!("Row {row_number}: {e}"))?
            .and_then(|category| category.id)
    };

    Ok(ParsedEntry { description, amount, kind, category_id, date })
}

// ---------------------------------------------------------------------------
// import_entries
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ImportReport {
    pub succeeded: usize,
    pub errors: Vec<String>,
}

pub fn import_entries(
    conn: &Connection,
    owner_id: i64,
    bytes: &[u8],
    file_name: &str,
) -> Result<ImportReport> {
    let table = match detect_format(file_name)? {
        ImportSource::Delimited => parse_delimited(bytes)?,
        #[cfg(feature = "xlsx")]
        ImportSource::Spreadsheet => parse_spreadsheet(bytes)?,
    };

    let mut report = ImportReport::default();
    for (i, row) in table.rows.iter().enumerate() {
        // The header line is row 1, so the first data row reports as row 2.
        let row_number = i + 2;
        let parsed = match normalize_row(conn, owner_id, &table.headers, row, row_number) {
            Ok(parsed) => parsed,
            Err(message) => {
                report.errors.push(message);
                continue;
            }
        };
        let entry = Entry {
            id: None,
            owner_id,
            description: parsed.description,
            amount: parsed.amount,
            kind: parsed.kind,
            category_id: parsed.category_id,
            date: parsed.date,
            recurring: false,
            frequency: None,
            cursor_date: None,
        };
        match store::add_entry(conn, &entry) {
            Ok(_) => report.succeeded += 1,
            Err(e) => report.errors.push(format!("Row {row_number}: {e}")),
        }
    }

    record_import(conn, owner_id, file_name, bytes, &report)?;
    Ok(report)
}

fn record_import(
    conn: &Connection,
    owner_id: i64,
    file_name: &str,
    bytes: &[u8],
    report: &ImportReport,
) -> Result<()> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let checksum = hex::encode(hasher.finalize());
    conn.execute(
        "INSERT INTO imports (owner_id, filename, succeeded, failed, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            owner_id,
            file_name,
            report.succeeded as i64,
            report.errors.len() as i64,
            checksum,
        ],
    )?;
    Ok(())
}
