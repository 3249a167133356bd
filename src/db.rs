use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS owners (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    owner_id INTEGER,
    name TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
    color TEXT NOT NULL DEFAULT '#6c757d',
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (owner_id) REFERENCES owners(id)
);

CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY,
    owner_id INTEGER NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
    category_id INTEGER,
    date TEXT NOT NULL,
    recurring INTEGER NOT NULL DEFAULT 0,
    frequency TEXT CHECK (frequency IN ('weekly', 'monthly', 'yearly')),
    cursor_date TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (owner_id) REFERENCES owners(id),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS budgets (
    id INTEGER PRIMARY KEY,
    owner_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    "limit" REAL NOT NULL,
    month INTEGER NOT NULL,
    year INTEGER NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (owner_id, category_id, month, year),
    FOREIGN KEY (owner_id) REFERENCES owners(id),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    owner_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    imported_at TEXT DEFAULT (datetime('now')),
    succeeded INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    checksum TEXT,
    FOREIGN KEY (owner_id) REFERENCES owners(id)
);

CREATE INDEX IF NOT EXISTS idx_entries_owner_date ON entries(owner_id, date);
CREATE INDEX IF NOT EXISTS idx_entries_owner_kind ON entries(owner_id, kind);
CREATE INDEX IF NOT EXISTS idx_categories_owner ON categories(owner_id);
CREATE INDEX IF NOT EXISTS idx_budgets_owner_period ON budgets(owner_id, year, month);
"#;

// (name, kind, color): shared rows, owner_id stays NULL
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    // Income
    ("Salary", "income", "#28a745"),
    ("Freelance", "income", "#20c997"),
    ("Investments", "income", "#17a2b8"),
    ("Other", "income", "#6c757d"),
    // Expenses
    ("Groceries", "expense", "#dc3545"),
    ("Transport", "expense", "#fd7e14"),
    ("Housing", "expense", "#ffc107"),
    ("Leisure", "expense", "#e83e8c"),
    ("Health", "expense", "#6f42c1"),
    ("Education", "expense", "#007bff"),
    ("Other", "expense", "#6c757d"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row(
        "SELECT count(*) FROM categories WHERE owner_id IS NULL",
        [],
        |row| row.get(0),
    )?;
    if count == 0 {
        for cat in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (owner_id, name, kind, color) VALUES (NULL, ?1, ?2, ?3)",
                rusqlite::params![cat.0, cat.1, cat.2],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["owners", "categories", "entries", "budgets", "imports"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM categories WHERE owner_id IS NULL", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, DEFAULT_CATEGORIES.len() as i64);
    }

    #[test]
    fn test_init_db_seeds_shared_categories() {
        let (_dir, conn) = test_db();
        let income: i64 = conn
            .query_row(
                "SELECT count(*) FROM categories WHERE owner_id IS NULL AND kind = 'income'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        let expense: i64 = conn
            .query_row(
                "SELECT count(*) FROM categories WHERE owner_id IS NULL AND kind = 'expense'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(income, 4);
        assert_eq!(expense, 7);
    }

    #[test]
    fn test_default_category_color() {
        let (_dir, conn) = test_db();
        let color: String = conn
            .query_row(
                "SELECT color FROM categories WHERE name = 'Groceries' AND kind = 'expense'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(color, "#dc3545");
    }

    #[test]
    fn test_entry_kind_is_checked() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO owners (name) VALUES ('t')", []).unwrap();
        let err = conn.execute(
            "INSERT INTO entries (owner_id, description, amount, kind, date) VALUES (1, 'x', 1.0, 'transfer', '2024-01-01')",
            [],
        );
        assert!(err.is_err());
    }
}
