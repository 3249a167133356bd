use rusqlite::Connection;

use crate::error::Result;
use crate::fmt::{amount_pt, date_pt, round2};
use crate::models::{EntryKind, EntryRow};
use crate::store::{self, EntryFilter};

pub const EXPORT_HEADERS: [&str; 5] = ["Date", "Description", "Kind", "Category", "Amount"];

/// One year of entries, newest first, with the totals the summary block needs.
pub struct YearExport {
    pub year: i32,
    pub rows: Vec<EntryRow>,
    pub total_income: f64,
    pub total_expense: f64,
}

impl YearExport {
    pub fn balance(&self) -> f64 {
        round2(self.total_income - self.total_expense)
    }
}

pub fn year_export(conn: &Connection, owner_id: i64, year: i32) -> Result<YearExport> {
    let rows = store::list_entries(
        conn,
        owner_id,
        &EntryFilter { year: Some(year), ..Default::default() },
    )?;
    let mut total_income = 0.0;
    let mut total_expense = 0.0;
    for row in &rows {
        match row.kind {
            EntryKind::Income => total_income += row.amount,
            EntryKind::Expense => total_expense += row.amount,
        }
    }
    Ok(YearExport {
        year,
        rows,
        total_income: round2(total_income),
        total_expense: round2(total_expense),
    })
}

/// Semicolon-separated with a UTF-8 BOM so spreadsheet tools that sniff
/// encodings open it correctly. Amounts keep the comma decimal separator.
pub fn to_delimited(export: &YearExport) -> String {
    let mut out = String::from("\u{feff}");
    out.push_str(&EXPORT_HEADERS.join(";"));
    out.push('\n');
    for row in &export.rows {
        // Semicolons inside a description would split the field
        let description = row.description.replace(';', ",");
        let category = row.category.as_deref().unwrap_or("Uncategorized");
        out.push_str(&format!(
            "{};{};{};{};{}\n",
            date_pt(row.date),
            description,
            row.kind.label(),
            category,
            amount_pt(row.amount),
        ));
    }
    out
}

#[cfg(feature = "xlsx")]
fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> crate::error::LedgerError {
    crate::error::LedgerError::Xlsx(e.to_string())
}

#[cfg(feature = "xlsx")]
pub fn to_spreadsheet(export: &YearExport) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("0.00");
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(format!("Entries {}", export.year))
        .map_err(xlsx_err)?;
    for (col, title) in EXPORT_HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *title, &bold)
            .map_err(xlsx_err)?;
    }
    for (i, row) in export.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, date_pt(row.date)).map_err(xlsx_err)?;
        sheet
            .write_string(r, 1, row.description.as_str())
            .map_err(xlsx_err)?;
        sheet.write_string(r, 2, row.kind.label()).map_err(xlsx_err)?;
        sheet
            .write_string(r, 3, row.category.as_deref().unwrap_or("Uncategorized"))
            .map_err(xlsx_err)?;
        sheet
            .write_number_with_format(r, 4, row.amount, &money)
            .map_err(xlsx_err)?;
    }
    workbook.save_to_buffer().map_err(xlsx_err)
}
