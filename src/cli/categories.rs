use comfy_table::{Cell, Table};

use crate::cli::{open_ledger, parse_kind};
use crate::error::Result;
use crate::store;

pub fn add(name: &str, kind: &str, color: Option<&str>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let kind = parse_kind(kind)?;
    let id = store::add_category(&conn, owner, name, kind, color)?;
    println!("Added category {id}: {}", name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let categories = store::list_categories(&conn, owner)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Kind", "Color", "Shared", "Entries"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(cat.kind.as_str()),
            Cell::new(cat.color),
            Cell::new(if cat.shared { "yes" } else { "" }),
            Cell::new(cat.entry_count),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn edit(id: i64, name: Option<&str>, color: Option<&str>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    store::update_category(&conn, owner, id, name, color)?;
    println!("Updated category {id}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    store::delete_category(&conn, owner, id)?;
    println!("Deleted category {id}");
    Ok(())
}
