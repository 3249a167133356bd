use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{get_data_dir, load_settings};
use crate::store;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = get_data_dir();
    let db_path = data_dir.join("saldo.db");

    println!("Profile:  {}", settings.profile);
    println!("Data dir: {}", data_dir.display());
    println!("Database: {}", db_path.display());

    if !db_path.exists() {
        println!("\nDatabase not found. Run `saldo init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let owner = store::ensure_owner(&conn, &settings.profile)?;
    let entries: i64 = conn.query_row(
        "SELECT count(*) FROM entries WHERE owner_id = ?1",
        [owner],
        |row| row.get(0),
    )?;
    let recurring: i64 = conn.query_row(
        "SELECT count(*) FROM entries WHERE owner_id = ?1 AND recurring = 1",
        [owner],
        |row| row.get(0),
    )?;
    let categories: i64 = conn.query_row(
        "SELECT count(*) FROM categories WHERE owner_id IS NULL OR owner_id = ?1",
        [owner],
        |row| row.get(0),
    )?;
    let budgets: i64 = conn.query_row(
        "SELECT count(*) FROM budgets WHERE owner_id = ?1",
        [owner],
        |row| row.get(0),
    )?;
    let imports: i64 = conn.query_row(
        "SELECT count(*) FROM imports WHERE owner_id = ?1",
        [owner],
        |row| row.get(0),
    )?;

    println!("\nEntries:    {entries} ({recurring} recurring)");
    println!("Categories: {categories}");
    println!("Budgets:    {budgets}");
    println!("Imports:    {imports}");
    Ok(())
}
