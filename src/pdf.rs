use std::io::BufWriter;

use printpdf::*;

use crate::error::{LedgerError, Result};
use crate::exporter::YearExport;
use crate::fmt::{date_pt, money};

// A4 dimensions (mm)
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 20.0;
const MARGIN_LEFT: f32 = 15.0;
const MARGIN_RIGHT: f32 = 15.0;
const ROW_H: f32 = 5.0;
const FONT_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 10.0;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.len() as f32 * size * 0.18
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| LedgerError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| LedgerError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
        })
    }

    fn pdf_y(&self) -> f32 {
        PAGE_H - self.y
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        let font = if bold {
            self.font_bold.clone()
        } else {
            self.font.clone()
        };
        let layer = self
            .doc
            .get_page(self.current_page)
            .get_layer(self.current_layer);
        layer.use_text(s, size, Mm(x), Mm(self.pdf_y()), &font);
    }

    fn hline(&self, x1: f32, x2: f32) {
        let layer = self
            .doc
            .get_page(self.current_page)
            .get_layer(self.current_layer);
        layer.set_outline_thickness(0.5);
        let line = Line {
            points: vec![
                (Point::new(Mm(x1), Mm(self.pdf_y())), false),
                (Point::new(Mm(x2), Mm(self.pdf_y())), false),
            ],
            is_closed: false,
        };
        layer.add_line(line);
    }

    fn header(&mut self, title: &str, profile: &str, period: &str) {
        self.text(title, MARGIN_LEFT, TITLE_SIZE, true);
        self.y += 7.0;
        if !profile.is_empty() {
            self.text(profile, MARGIN_LEFT, SUBTITLE_SIZE, false);
            self.y += 5.0;
        }
        self.text(period, MARGIN_LEFT, SUBTITLE_SIZE, false);
        self.y += 5.0;
        let ts = chrono::Local::now()
            .format("Generated %Y-%m-%d %H:%M")
            .to_string();
        self.text(&ts, MARGIN_LEFT, 8.0, false);
        self.y += 5.0;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 5.0;
    }

    fn table_header(&mut self, cols: &[Col], headers: &[&str]) {
        self.ensure_space(ROW_H * 2.0);
        let mut x = MARGIN_LEFT;
        for (i, col) in cols.iter().enumerate() {
            if i < headers.len() {
                match col.align {
                    Align::Left => self.text(headers[i], x, FONT_SIZE, true),
                    Align::Right => {
                        let tw = approx_text_width(headers[i], FONT_SIZE);
                        self.text(headers[i], x + col.width - tw, FONT_SIZE, true);
                    }
                }
            }
            x += col.width;
        }
        self.y += ROW_H;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 2.0;
    }

    fn table_row(&mut self, cols: &[Col], values: &[&str], bold: bool) {
        self.ensure_space(ROW_H);
        let mut x = MARGIN_LEFT;
        for (i, col) in cols.iter().enumerate() {
            if i < values.len() {
                match col.align {
                    Align::Left => self.text(values[i], x, FONT_SIZE, bold),
                    Align::Right => {
                        let tw = approx_text_width(values[i], FONT_SIZE);
                        self.text(values[i], x + col.width - tw, FONT_SIZE, bold);
                    }
                }
            }
            x += col.width;
        }
        self.y += ROW_H;
    }

    fn blank_row(&mut self) {
        self.y += ROW_H;
    }

    fn separator(&mut self) {
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 2.0;
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| LedgerError::Pdf(format!("{e:?}")))?;
        Ok(buf.into_inner().map_err(|e| LedgerError::Pdf(e.to_string()))?)
    }
}

// ---------------------------------------------------------------------------
// Render functions
// ---------------------------------------------------------------------------

/// Long descriptions would overflow into the next column.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{truncated}\u{2026}")
    }
}

pub fn render_statement(export: &YearExport, profile: &str) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new("Annual Statement")?;
    pdf.header("Annual Statement", profile, &export.year.to_string());

    let cols = &[
        Col { width: 24.0, align: Align::Left },
        Col { width: 68.0, align: Align::Left },
        Col { width: 22.0, align: Align::Left },
        Col { width: 38.0, align: Align::Left },
        Col { width: 28.0, align: Align::Right },
    ];
    pdf.table_header(cols, &["Date", "Description", "Kind", "Category", "Amount"]);

    for row in &export.rows {
        let date = date_pt(row.date);
        let description = clip(&row.description, 38);
        let category = clip(row.category.as_deref().unwrap_or("Uncategorized"), 20);
        let amount = money(row.amount);
        pdf.table_row(
            cols,
            &[&date, &description, row.kind.label(), &category, &amount],
            false,
        );
    }

    pdf.blank_row();
    pdf.separator();
    let income = money(export.total_income);
    pdf.table_row(cols, &["Total Income", "", "", "", &income], true);
    let expense = money(export.total_expense);
    pdf.table_row(cols, &["Total Expenses", "", "", "", &expense], true);
    let balance = money(export.balance());
    pdf.table_row(cols, &["Balance", "", "", "", &balance], true);

    pdf.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::exporter::year_export;
    use crate::models::{Entry, EntryKind};
    use crate::store::{add_entry, add_owner};
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, rusqlite::Connection, i64) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        let owner = add_owner(&conn, "tester").unwrap();
        (dir, conn, owner)
    }

    fn seed(conn: &rusqlite::Connection, owner: i64, count: usize) {
        for i in 0..count {
            add_entry(
                conn,
                &Entry {
                    id: None,
                    owner_id: owner,
                    description: format!("Entry {i}"),
                    amount: 10.0 + i as f64,
                    kind: if i % 2 == 0 { EntryKind::Expense } else { EntryKind::Income },
                    category_id: None,
                    date: NaiveDate::from_ymd_opt(2024, 1 + (i % 12) as u32, 5).unwrap(),
                    recurring: false,
                    frequency: None,
                    cursor_date: None,
                },
            )
            .unwrap();
        }
    }

    #[test]
    fn test_render_statement_produces_pdf() {
        let (_dir, conn, owner) = test_db();
        seed(&conn, owner, 6);
        let export = year_export(&conn, owner, 2024).unwrap();
        let bytes = render_statement(&export, "main").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_statement_paginates_long_years() {
        let (_dir, conn, owner) = test_db();
        seed(&conn, owner, 120);
        let export = year_export(&conn, owner, 2024).unwrap();
        let bytes = render_statement(&export, "main").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_clip_keeps_short_text() {
        assert_eq!(clip("Coffee", 10), "Coffee");
        assert_eq!(clip("A very long description here", 10), "A very lo\u{2026}");
    }
}
