use chrono::Local;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::budget::{self, BudgetState};
use crate::cli::open_ledger;
use crate::error::Result;
use crate::fmt::{date_pt, money};
use crate::models::EntryKind;
use crate::recurrence;
use crate::reports;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let today = Local::now().date_naive();

    // Bring recurring entries up to date before summarizing the month.
    let advanced = recurrence::advance_recurrences(&conn, owner, today)?;
    if advanced.generated > 0 {
        let noun = if advanced.generated == 1 { "entry" } else { "entries" };
        println!("Generated {} recurring {noun}.\n", advanced.generated);
    }
    for error in &advanced.errors {
        eprintln!("{}", format!("Recurrence failed for {error}").yellow());
    }

    let summary = reports::dashboard_summary(&conn, owner, today)?;
    let profile = load_settings().profile;

    let mut totals = Table::new();
    totals.set_header(vec!["This Month", "Amount"]);
    totals.add_row(vec![
        Cell::new("Income"),
        Cell::new(money(summary.income).green().to_string()),
    ]);
    totals.add_row(vec![
        Cell::new("Expenses"),
        Cell::new(money(summary.expense).red().to_string()),
    ]);
    totals.add_row(vec![
        Cell::new("Balance".bold()),
        Cell::new(money(summary.balance)),
    ]);
    println!(
        "Dashboard {:02}/{} (profile: {profile})\n{totals}",
        summary.month, summary.year
    );

    if !summary.expenses_by_category.is_empty() {
        let mut breakdown = Table::new();
        breakdown.set_header(vec!["Category", "Amount", "%"]);
        for cat in &summary.expenses_by_category {
            let pct = if summary.expense > 0.0 {
                cat.total / summary.expense * 100.0
            } else {
                0.0
            };
            breakdown.add_row(vec![
                Cell::new(&cat.name),
                Cell::new(money(cat.total)),
                Cell::new(format!("{pct:.1}%")),
            ]);
        }
        println!("\nExpenses by Category\n{breakdown}");
    }

    if !summary.recent.is_empty() {
        let mut recent = Table::new();
        recent.set_header(vec!["Date", "Description", "Category", "Amount"]);
        for e in &summary.recent {
            let amount = match e.kind {
                EntryKind::Income => money(e.amount).green().to_string(),
                EntryKind::Expense => money(e.amount).red().to_string(),
            };
            recent.add_row(vec![
                Cell::new(date_pt(e.date)),
                Cell::new(&e.description),
                Cell::new(e.category.as_deref().unwrap_or("")),
                Cell::new(amount),
            ]);
        }
        println!("\nRecent Entries\n{recent}");
    }

    let alerts = budget::budget_alerts(&conn, owner, summary.month, summary.year)?;
    if !alerts.is_empty() {
        println!("\nBudget Alerts");
        for b in &alerts {
            let line = format!(
                "{}: {} of {} ({}%)",
                b.category,
                money(b.spent),
                money(b.limit),
                b.percent
            );
            match b.state {
                BudgetState::Exceeded => println!("  {}", line.red().bold()),
                _ => println!("  {}", line.yellow()),
            }
        }
    }
    Ok(())
}
