use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::budget::{self, BudgetState};
use crate::cli::{month_or_now, open_ledger, parse_month};
use crate::error::{LedgerError, Result};
use crate::fmt::money;
use crate::models::EntryKind;
use crate::store;

pub fn set(category: &str, limit: f64, month: &Option<String>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let (year, m) = month_or_now(month)?;
    let cat = store::find_category_by_name(&conn, owner, category, EntryKind::Expense)?
        .ok_or_else(|| {
            LedgerError::Validation(format!("No expense category named '{category}'"))
        })?;
    let cat_id = cat.id.ok_or(LedgerError::NotFound("category"))?;
    store::set_budget(&conn, owner, cat_id, m, year, limit)?;
    println!("Budget for {} set to {} ({m:02}/{year})", cat.name, money(limit));
    Ok(())
}

pub fn list(month: &Option<String>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let (year, m) = month_or_now(month)?;
    let statuses = budget::evaluate_budgets(&conn, owner, m, year)?;
    if statuses.is_empty() {
        println!("No budgets set for {m:02}/{year}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Category", "Limit", "Spent", "Remaining", "Used", "State"]);
    for b in &statuses {
        let state = match b.state {
            BudgetState::Exceeded => b.state.as_str().red().bold().to_string(),
            BudgetState::Warning => b.state.as_str().yellow().to_string(),
            BudgetState::Normal => b.state.as_str().to_string(),
        };
        table.add_row(vec![
            Cell::new(b.budget_id),
            Cell::new(&b.category),
            Cell::new(money(b.limit)),
            Cell::new(money(b.spent)),
            Cell::new(money(b.remaining)),
            Cell::new(format!("{}%", b.percent)),
            Cell::new(state),
        ]);
    }
    println!("Budgets {m:02}/{year}\n{table}");
    Ok(())
}

pub fn copy(from: &str, to: &str) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let (from_year, from_month) = parse_month(from)?;
    let (to_year, to_month) = parse_month(to)?;
    let copied = budget::copy_budgets(
        &conn,
        owner,
        (from_month, from_year),
        (to_month, to_year),
    )?;
    let noun = if copied == 1 { "budget" } else { "budgets" };
    println!("Copied {copied} {noun} from {from_month:02}/{from_year} to {to_month:02}/{to_year}");
    Ok(())
}

pub fn remove(id: i64) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    store::delete_budget(&conn, owner, id)?;
    println!("Removed budget {id}");
    Ok(())
}
