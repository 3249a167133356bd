use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{LedgerError, Result};
use crate::fmt::round2;
use crate::models::{
    Budget, Category, CategoryRow, CategoryScope, Entry, EntryKind, EntryRow, Owner,
};

pub const MAX_AMOUNT: f64 = 99_999_999.99;
pub const MAX_TEXT: usize = 255;

// ---------------------------------------------------------------------------
// Owners
// ---------------------------------------------------------------------------

pub fn find_owner(conn: &Connection, name: &str) -> Result<Option<Owner>> {
    let owner = conn
        .query_row(
            "SELECT id, name FROM owners WHERE name = ?1",
            params![name],
            |row| {
                Ok(Owner {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(owner)
}

pub fn add_owner(conn: &Connection, name: &str) -> Result<i64> {
    let name = validate_name(name)?;
    if find_owner(conn, &name)?.is_some() {
        return Err(LedgerError::Validation(format!(
            "Profile '{name}' already exists"
        )));
    }
    conn.execute("INSERT INTO owners (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

pub fn ensure_owner(conn: &Connection, name: &str) -> Result<i64> {
    match find_owner(conn, name)? {
        Some(owner) => Ok(owner.id),
        None => add_owner(conn, name),
    }
}

pub fn list_owners(conn: &Connection) -> Result<Vec<Owner>> {
    let mut stmt = conn.prepare("SELECT id, name FROM owners ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Owner {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_description(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation("Description is required".to_string()));
    }
    if trimmed.chars().count() > MAX_TEXT {
        return Err(LedgerError::Validation(format!(
            "Description must be {MAX_TEXT} characters or fewer"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation("Name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_TEXT {
        return Err(LedgerError::Validation(format!(
            "Name must be {MAX_TEXT} characters or fewer"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "Amount exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    Ok(round2(amount))
}

fn validate_color(color: &str) -> Result<()> {
    let valid = regex::Regex::new("^#[0-9A-Fa-f]{6}$")
        .map(|re| re.is_match(color))
        .unwrap_or(false);
    if !valid {
        return Err(LedgerError::Validation(
            "Color must be a hex code like #dc3545".to_string(),
        ));
    }
    Ok(())
}

fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(LedgerError::Validation(
            "Month must be between 1 and 12".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

fn category_from_row(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: Some(row.get(0)?),
        scope: CategoryScope::from_owner(row.get(1)?),
        name: row.get(2)?,
        kind: row.get(3)?,
        color: row.get(4)?,
    })
}

fn load_visible_category(conn: &Connection, owner_id: i64, id: i64) -> Result<Option<Category>> {
    let cat = conn
        .query_row(
            "SELECT id, owner_id, name, kind, color FROM categories \
             WHERE id = ?1 AND (owner_id IS NULL OR owner_id = ?2)",
            params![id, owner_id],
            category_from_row,
        )
        .optional()?;
    Ok(cat)
}

/// Category as an operand: a row the caller cannot see is reported missing.
pub fn find_category(conn: &Connection, owner_id: i64, id: i64) -> Result<Category> {
    load_visible_category(conn, owner_id, id)?.ok_or(LedgerError::NotFound("category"))
}

/// Category as a reference from an entry or budget. Same visibility scope,
/// but a miss is a referential problem on the referencing record.
fn resolve_category_ref(conn: &Connection, owner_id: i64, id: i64) -> Result<Category> {
    load_visible_category(conn, owner_id, id)?
        .ok_or_else(|| LedgerError::Referential(format!("Unknown category: {id}")))
}

/// Case-insensitive name match among the owner's visible categories of one
/// kind. Owned rows win over shared ones when both match.
pub fn find_category_by_name(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    kind: EntryKind,
) -> Result<Option<Category>> {
    let cat = conn
        .query_row(
            "SELECT id, owner_id, name, kind, color FROM categories \
             WHERE (owner_id IS NULL OR owner_id = ?1) AND kind = ?2 \
             AND lower(name) = lower(?3) \
             ORDER BY (owner_id IS NULL), id LIMIT 1",
            params![owner_id, kind, name.trim()],
            category_from_row,
        )
        .optional()?;
    Ok(cat)
}

/// Same match without the kind restriction, for CLI arguments.
pub fn find_category_named(
    conn: &Connection,
    owner_id: i64,
    name: &str,
) -> Result<Option<Category>> {
    let cat = conn
        .query_row(
            "SELECT id, owner_id, name, kind, color FROM categories \
             WHERE (owner_id IS NULL OR owner_id = ?1) AND lower(name) = lower(?2) \
             ORDER BY (owner_id IS NULL), id LIMIT 1",
            params![owner_id, name.trim()],
            category_from_row,
        )
        .optional()?;
    Ok(cat)
}

pub fn add_category(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    kind: EntryKind,
    color: Option<&str>,
) -> Result<i64> {
    let name = validate_name(name)?;
    let color = color.unwrap_or("#6c757d");
    validate_color(color)?;
    conn.execute(
        "INSERT INTO categories (owner_id, name, kind, color) VALUES (?1, ?2, ?3, ?4)",
        params![owner_id, name, kind, color],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_category(
    conn: &Connection,
    owner_id: i64,
    id: i64,
    name: Option<&str>,
    color: Option<&str>,
) -> Result<()> {
    let cat = find_category(conn, owner_id, id)?;
    if cat.scope.is_shared() {
        return Err(LedgerError::Validation(
            "Shared categories cannot be modified".to_string(),
        ));
    }
    let name = match name {
        Some(n) => validate_name(n)?,
        None => cat.name,
    };
    let color = match color {
        Some(c) => {
            validate_color(c)?;
            c.to_string()
        }
        None => cat.color,
    };
    conn.execute(
        "UPDATE categories SET name = ?1, color = ?2 WHERE id = ?3 AND owner_id = ?4",
        params![name, color, id, owner_id],
    )?;
    Ok(())
}

pub fn delete_category(conn: &Connection, owner_id: i64, id: i64) -> Result<()> {
    let cat = find_category(conn, owner_id, id)?;
    if cat.scope.is_shared() {
        return Err(LedgerError::Validation(
            "Shared categories cannot be deleted".to_string(),
        ));
    }
    let referencing: i64 = conn.query_row(
        "SELECT count(*) FROM entries WHERE category_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if referencing > 0 {
        let noun = if referencing == 1 { "entry references" } else { "entries reference" };
        return Err(LedgerError::Referential(format!(
            "Cannot delete category '{}': {referencing} {noun} it",
            cat.name
        )));
    }
    conn.execute(
        "DELETE FROM categories WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    Ok(())
}

/// Listing with per-owner usage counts, shared rows included.
pub fn list_categories(conn: &Connection, owner_id: i64) -> Result<Vec<CategoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.kind, c.color, c.owner_id IS NULL, count(e.id) \
         FROM categories c \
         LEFT JOIN entries e ON e.category_id = c.id AND e.owner_id = ?1 \
         WHERE c.owner_id IS NULL OR c.owner_id = ?1 \
         GROUP BY c.id ORDER BY c.kind, c.name",
    )?;
    let rows = stmt.query_map(params![owner_id], |row| {
        Ok(CategoryRow {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            color: row.get(3)?,
            shared: row.get(4)?,
            entry_count: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: Some(row.get(0)?),
        owner_id: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        kind: row.get(4)?,
        category_id: row.get(5)?,
        date: row.get(6)?,
        recurring: row.get(7)?,
        frequency: row.get(8)?,
        cursor_date: row.get(9)?,
    })
}

const ENTRY_COLS: &str =
    "id, owner_id, description, amount, kind, category_id, date, recurring, frequency, cursor_date";

/// Validates an entry and returns the cleaned (description, amount) pair.
/// The category reference, when present, must be visible to the owner and
/// share the entry's kind.
fn validate_entry(conn: &Connection, entry: &Entry) -> Result<(String, f64)> {
    let description = validate_description(&entry.description)?;
    let amount = validate_amount(entry.amount)?;
    if let Some(category_id) = entry.category_id {
        let cat = resolve_category_ref(conn, entry.owner_id, category_id)?;
        if cat.kind != entry.kind {
            return Err(LedgerError::Validation(format!(
                "Category '{}' is for {} entries",
                cat.name,
                cat.kind.as_str()
            )));
        }
    }
    if entry.recurring && entry.frequency.is_none() {
        return Err(LedgerError::Validation(
            "Recurring entries need a frequency".to_string(),
        ));
    }
    if !entry.recurring && entry.frequency.is_some() {
        return Err(LedgerError::Validation(
            "Frequency only applies to recurring entries".to_string(),
        ));
    }
    Ok((description, amount))
}

pub fn add_entry(conn: &Connection, entry: &Entry) -> Result<i64> {
    let (description, amount) = validate_entry(conn, entry)?;
    // A recurring entry starts its cursor at its own date.
    let cursor: Option<NaiveDate> = if entry.recurring {
        Some(entry.cursor_date.unwrap_or(entry.date))
    } else {
        None
    };
    conn.execute(
        "INSERT INTO entries (owner_id, description, amount, kind, category_id, date, recurring, frequency, cursor_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.owner_id,
            description,
            amount,
            entry.kind,
            entry.category_id,
            entry.date,
            entry.recurring,
            entry.frequency,
            cursor
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_entry(conn: &Connection, owner_id: i64, id: i64) -> Result<Entry> {
    let sql = format!("SELECT {ENTRY_COLS} FROM entries WHERE id = ?1 AND owner_id = ?2");
    conn.query_row(&sql, params![id, owner_id], entry_from_row)
        .optional()?
        .ok_or(LedgerError::NotFound("entry"))
}

pub fn update_entry(conn: &Connection, entry: &Entry) -> Result<()> {
    let id = entry
        .id
        .ok_or_else(|| LedgerError::Validation("Entry has no id".to_string()))?;
    let (description, amount) = validate_entry(conn, entry)?;
    let cursor: Option<NaiveDate> = if entry.recurring {
        Some(entry.cursor_date.unwrap_or(entry.date))
    } else {
        None
    };
    let changed = conn.execute(
        "UPDATE entries SET description = ?1, amount = ?2, kind = ?3, category_id = ?4, \
         date = ?5, recurring = ?6, frequency = ?7, cursor_date = ?8 \
         WHERE id = ?9 AND owner_id = ?10",
        params![
            description,
            amount,
            entry.kind,
            entry.category_id,
            entry.date,
            entry.recurring,
            entry.frequency,
            cursor,
            id,
            entry.owner_id
        ],
    )?;
    if changed == 0 {
        return Err(LedgerError::NotFound("entry"));
    }
    Ok(())
}

pub fn delete_entry(conn: &Connection, owner_id: i64, id: i64) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM entries WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::NotFound("entry"));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct EntryFilter {
    pub kind: Option<EntryKind>,
    pub category_id: Option<i64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub limit: Option<usize>,
}

pub fn list_entries(conn: &Connection, owner_id: i64, filter: &EntryFilter) -> Result<Vec<EntryRow>> {
    let mut sql = String::from(
        "SELECT e.id, e.date, e.description, e.amount, e.kind, c.name, e.recurring \
         FROM entries e LEFT JOIN categories c ON e.category_id = c.id \
         WHERE e.owner_id = ?1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(owner_id)];
    if let Some(kind) = filter.kind {
        params_vec.push(Box::new(kind));
        sql.push_str(&format!(" AND e.kind = ?{}", params_vec.len()));
    }
    if let Some(category_id) = filter.category_id {
        params_vec.push(Box::new(category_id));
        sql.push_str(&format!(" AND e.category_id = ?{}", params_vec.len()));
    }
    match (filter.year, filter.month) {
        (Some(year), Some(month)) => {
            params_vec.push(Box::new(format!("{year:04}-{month:02}%")));
            sql.push_str(&format!(" AND e.date LIKE ?{}", params_vec.len()));
        }
        (Some(year), None) => {
            params_vec.push(Box::new(format!("{year:04}-%")));
            sql.push_str(&format!(" AND e.date LIKE ?{}", params_vec.len()));
        }
        _ => {}
    }
    sql.push_str(" ORDER BY e.date DESC, e.id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(EntryRow {
            id: row.get(0)?,
            date: row.get(1)?,
            description: row.get(2)?,
            amount: row.get(3)?,
            kind: row.get(4)?,
            category: row.get(5)?,
            recurring: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Recurring entries with a live cursor, the generator's work list.
pub fn recurring_entries(conn: &Connection, owner_id: i64) -> Result<Vec<Entry>> {
    let sql = format!(
        "SELECT {ENTRY_COLS} FROM entries \
         WHERE owner_id = ?1 AND recurring = 1 AND cursor_date IS NOT NULL ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], entry_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Duplicate guard for the generator: does a plain entry with these exact
/// fields already exist? Recurring origins never match (recurring = 0).
pub fn plain_entry_exists(
    conn: &Connection,
    owner_id: i64,
    description: &str,
    amount: f64,
    kind: EntryKind,
    date: NaiveDate,
) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM entries \
         WHERE owner_id = ?1 AND description = ?2 AND amount = ?3 AND kind = ?4 \
         AND date = ?5 AND recurring = 0 LIMIT 1",
    )?;
    Ok(stmt.exists(params![owner_id, description, amount, kind, date])?)
}

pub fn set_cursor(conn: &Connection, owner_id: i64, entry_id: i64, cursor: NaiveDate) -> Result<()> {
    let changed = conn.execute(
        "UPDATE entries SET cursor_date = ?1 WHERE id = ?2 AND owner_id = ?3 AND recurring = 1",
        params![cursor, entry_id, owner_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::NotFound("entry"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

pub fn set_budget(
    conn: &Connection,
    owner_id: i64,
    category_id: i64,
    month: u32,
    year: i32,
    limit: f64,
) -> Result<i64> {
    validate_month(month)?;
    let limit = validate_amount(limit)?;
    let cat = resolve_category_ref(conn, owner_id, category_id)?;
    if cat.kind != EntryKind::Expense {
        return Err(LedgerError::Validation(
            "Budgets can only target expense categories".to_string(),
        ));
    }
    conn.execute(
        "INSERT INTO budgets (owner_id, category_id, \"limit\", month, year) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (owner_id, category_id, month, year) \
         DO UPDATE SET \"limit\" = excluded.\"limit\"",
        params![owner_id, category_id, limit, month, year],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM budgets WHERE owner_id = ?1 AND category_id = ?2 AND month = ?3 AND year = ?4",
        params![owner_id, category_id, month, year],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn delete_budget(conn: &Connection, owner_id: i64, id: i64) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM budgets WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::NotFound("budget"));
    }
    Ok(())
}

pub fn list_budgets(conn: &Connection, owner_id: i64, month: u32, year: i32) -> Result<Vec<Budget>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, category_id, \"limit\", month, year FROM budgets \
         WHERE owner_id = ?1 AND month = ?2 AND year = ?3 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![owner_id, month, year], |row| {
        Ok(Budget {
            id: Some(row.get(0)?),
            owner_id: row.get(1)?,
            category_id: row.get(2)?,
            limit: row.get(3)?,
            month: row.get(4)?,
            year: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
