use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};
use crate::store;

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    let data_dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let conn = get_connection(&data_dir.join("saldo.db"))?;
    init_db(&conn)?;
    store::ensure_owner(&conn, &settings.profile)?;
    save_settings(&settings)?;

    println!("Initialized ledger at {}", data_dir.display());
    println!("Active profile: {}", settings.profile);
    println!("\nTry these next:");
    println!("  saldo demo                        # load a year of sample data");
    println!("  saldo entry add 'Coffee' 1.20");
    println!("  saldo dashboard");
    Ok(())
}
