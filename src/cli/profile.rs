use comfy_table::{Cell, Table};

use crate::cli::open_ledger;
use crate::error::{LedgerError, Result};
use crate::settings::{load_settings, save_settings};
use crate::store;

pub fn add(name: &str) -> Result<()> {
    let (conn, _) = open_ledger()?;
    store::add_owner(&conn, name)?;
    println!("Added profile: {}", name.trim());
    println!("Switch to it with `saldo profile use {}`", name.trim());
    Ok(())
}

pub fn switch(name: &str) -> Result<()> {
    let (conn, _) = open_ledger()?;
    let owner = store::find_owner(&conn, name.trim())?
        .ok_or_else(|| LedgerError::UnknownProfile(name.trim().to_string()))?;
    let mut settings = load_settings();
    settings.profile = owner.name.clone();
    save_settings(&settings)?;
    println!("Switched to profile: {}", owner.name);
    Ok(())
}

pub fn list() -> Result<()> {
    let (conn, _) = open_ledger()?;
    let active = load_settings().profile;
    let mut table = Table::new();
    table.set_header(vec!["Name", "Active"]);
    for owner in store::list_owners(&conn)? {
        let marker = if owner.name == active { "*" } else { "" };
        table.add_row(vec![Cell::new(&owner.name), Cell::new(marker)]);
    }
    println!("Profiles\n{table}");
    Ok(())
}
