use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Option<EntryKind> {
        match s {
            "income" => Some(EntryKind::Income),
            "expense" => Some(EntryKind::Expense),
            _ => None,
        }
    }

    /// Capitalized form for exports and table output.
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Income => "Income",
            EntryKind::Expense => "Expense",
        }
    }
}

impl ToSql for EntryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for EntryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| EntryKind::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Frequency> {
        match s {
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            "yearly" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| Frequency::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

/// Who a category belongs to. Shared rows (no owner) are system defaults
/// visible to every profile and cannot be edited or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryScope {
    Shared,
    Owned(i64),
}

impl CategoryScope {
    pub fn from_owner(owner_id: Option<i64>) -> CategoryScope {
        match owner_id {
            None => CategoryScope::Shared,
            Some(id) => CategoryScope::Owned(id),
        }
    }

    pub fn owner_id(self) -> Option<i64> {
        match self {
            CategoryScope::Shared => None,
            CategoryScope::Owned(id) => Some(id),
        }
    }

    pub fn is_shared(self) -> bool {
        matches!(self, CategoryScope::Shared)
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Owner {
    pub id: i64,
    pub name: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: Option<i64>,
    pub owner_id: i64,
    pub description: String,
    pub amount: f64,
    pub kind: EntryKind,
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub recurring: bool,
    pub frequency: Option<Frequency>,
    pub cursor_date: Option<NaiveDate>,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Category {
    pub id: Option<i64>,
    pub scope: CategoryScope,
    pub name: String,
    pub kind: EntryKind,
    pub color: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Budget {
    pub id: Option<i64>,
    pub owner_id: i64,
    pub category_id: i64,
    pub limit: f64,
    pub month: u32,
    pub year: i32,
}

/// Entry joined with its category name for listings and exports.
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub kind: EntryKind,
    pub category: Option<String>,
    pub recurring: bool,
}

/// Category with usage count as shown by `category list`.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub kind: EntryKind,
    pub color: String,
    pub shared: bool,
    pub entry_count: i64,
}

/// Intermediate representation from a CSV/XLSX parser before DB insert.
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub description: String,
    pub amount: f64,
    pub kind: EntryKind,
    pub category_id: Option<i64>,
    pub date: NaiveDate,
}
