use chrono::Local;
use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::cli::{open_ledger, parse_date, parse_frequency, parse_kind, parse_month};
use crate::error::{LedgerError, Result};
use crate::fmt::{date_pt, money, round2};
use crate::models::{Entry, EntryKind};
use crate::recurrence;
use crate::store::{self, EntryFilter};

fn resolve_category(conn: &Connection, owner: i64, name: &str, kind: EntryKind) -> Result<i64> {
    let cat = store::find_category_by_name(conn, owner, name, kind)?.ok_or_else(|| {
        LedgerError::Validation(format!("No {} category named '{name}'", kind.as_str()))
    })?;
    cat.id.ok_or(LedgerError::NotFound("category"))
}

pub fn add(
    description: &str,
    amount: f64,
    kind: &str,
    category: Option<&str>,
    date: Option<&str>,
    recurring: bool,
    frequency: Option<&str>,
) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let kind = parse_kind(kind)?;
    let date = match date {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let category_id = match category {
        Some(name) => Some(resolve_category(&conn, owner, name, kind)?),
        None => None,
    };
    let frequency = frequency.map(parse_frequency).transpose()?;
    let entry = Entry {
        id: None,
        owner_id: owner,
        description: description.to_string(),
        amount,
        kind,
        category_id,
        date,
        recurring,
        frequency,
        cursor_date: None,
    };
    let id = store::add_entry(&conn, &entry)?;
    println!("Added entry {id}: {} ({})", description.trim(), money(entry.amount));
    Ok(())
}

pub fn list(
    month: Option<String>,
    year: Option<i32>,
    kind: Option<String>,
    category: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    // Materialize any recurrences that came due before showing the list.
    recurrence::advance_recurrences(&conn, owner, Local::now().date_naive())?;

    let kind = kind.as_deref().map(parse_kind).transpose()?;
    let (filter_year, filter_month) = match (&month, year) {
        (Some(raw), _) => {
            let (y, m) = parse_month(raw)?;
            (Some(y), Some(m))
        }
        (None, y) => (y, None),
    };
    let category_id = match category.as_deref() {
        Some(name) => {
            let cat = store::find_category_named(&conn, owner, name)?
                .ok_or(LedgerError::NotFound("category"))?;
            cat.id
        }
        None => None,
    };

    let filter = EntryFilter {
        kind,
        category_id,
        year: filter_year,
        month: filter_month,
        limit,
    };
    let entries = store::list_entries(&conn, owner, &filter)?;
    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Category", "Amount", "Recurring"]);
    for e in &entries {
        let amount = match e.kind {
            EntryKind::Income => money(e.amount).green().to_string(),
            EntryKind::Expense => money(e.amount).red().to_string(),
        };
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(date_pt(e.date)),
            Cell::new(&e.description),
            Cell::new(e.category.as_deref().unwrap_or("")),
            Cell::new(amount),
            Cell::new(if e.recurring { "yes" } else { "" }),
        ]);
    }
    let net: f64 = entries
        .iter()
        .map(|e| match e.kind {
            EntryKind::Income => e.amount,
            EntryKind::Expense => -e.amount,
        })
        .sum();
    println!("Entries ({}, net: {})\n{table}", entries.len(), money(round2(net)));
    Ok(())
}

pub fn edit(
    id: i64,
    description: Option<String>,
    amount: Option<f64>,
    kind: Option<String>,
    category: Option<String>,
    date: Option<String>,
    recurring: Option<bool>,
    frequency: Option<String>,
) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let mut entry = store::get_entry(&conn, owner, id)?;
    if let Some(d) = description {
        entry.description = d;
    }
    if let Some(a) = amount {
        entry.amount = a;
    }
    if let Some(k) = kind.as_deref() {
        entry.kind = parse_kind(k)?;
    }
    if let Some(raw) = date.as_deref() {
        entry.date = parse_date(raw)?;
    }
    if let Some(r) = recurring {
        entry.recurring = r;
        if !r {
            entry.frequency = None;
            entry.cursor_date = None;
        }
    }
    if let Some(f) = frequency.as_deref() {
        entry.frequency = Some(parse_frequency(f)?);
    }
    match category.as_deref() {
        Some("none") => entry.category_id = None,
        Some(name) => entry.category_id = Some(resolve_category(&conn, owner, name, entry.kind)?),
        None => {}
    }
    store::update_entry(&conn, &entry)?;
    println!("Updated entry {id}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    store::delete_entry(&conn, owner, id)?;
    println!("Deleted entry {id}");
    Ok(())
}
