use chrono::{Datelike, Local};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{month_or_now, open_ledger};
use crate::error::Result;
use crate::fmt::money;
use crate::reports;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn signed_money(val: f64) -> String {
    if val >= 0.0 {
        money(val).green().to_string()
    } else {
        money(val).red().to_string()
    }
}

pub fn annual(year: Option<i32>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let year = year.unwrap_or_else(|| Local::now().date_naive().year());
    let report = reports::annual_report(&conn, owner, year)?;

    let mut table = Table::new();
    table.set_header(vec!["Month", "Income", "Expenses", "Balance"]);
    for m in &report.months {
        table.add_row(vec![
            Cell::new(MONTHS[(m.month - 1) as usize]),
            Cell::new(money(m.income)),
            Cell::new(money(m.expense)),
            Cell::new(signed_money(m.balance)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(report.total_income)),
        Cell::new(money(report.total_expense)),
        Cell::new(signed_money(report.balance)),
    ]);
    println!("Annual Report {year}\n{table}");

    if !report.top_expense_categories.is_empty() {
        let mut top = Table::new();
        top.set_header(vec!["Category", "Amount"]);
        for cat in &report.top_expense_categories {
            top.add_row(vec![Cell::new(&cat.name), Cell::new(money(cat.total))]);
        }
        println!("\nTop Expense Categories\n{top}");
    }

    if report.available_years.len() > 1 {
        let years: Vec<String> = report.available_years.iter().map(|y| y.to_string()).collect();
        println!("\nYears with data: {}", years.join(", "));
    }
    Ok(())
}

pub fn evolution(month: &Option<String>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let (year, m) = month_or_now(month)?;
    let evolution = reports::daily_evolution(&conn, owner, m, year)?;

    let mut table = Table::new();
    table.set_header(vec!["Day", "Income", "Expenses", "Net", "Balance"]);
    for d in &evolution.days {
        table.add_row(vec![
            Cell::new(format!("{:02}", d.day)),
            Cell::new(money(d.income)),
            Cell::new(money(d.expense)),
            Cell::new(signed_money(d.net)),
            Cell::new(money(d.running_balance)),
        ]);
    }
    println!(
        "Daily Evolution {m:02}/{year} (starting balance: {})\n{table}",
        money(evolution.starting_balance)
    );
    Ok(())
}

fn change_cell(pct: f64, up_is_good: bool) -> String {
    let text = format!("{pct:+.1}%");
    if pct == 0.0 {
        text
    } else if (pct > 0.0) == up_is_good {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

pub fn compare(month: &Option<String>) -> Result<()> {
    let (conn, owner) = open_ledger()?;
    let (year, m) = month_or_now(month)?;
    let comparison = reports::month_comparison(&conn, owner, m, year)?;
    let current = &comparison.current;
    let previous = &comparison.previous;

    let mut table = Table::new();
    table.set_header(vec![
        String::new(),
        format!("{:02}/{}", current.month, current.year),
        format!("{:02}/{}", previous.month, previous.year),
        "Change".to_string(),
    ]);
    table.add_row(vec![
        Cell::new("Income"),
        Cell::new(money(current.income)),
        Cell::new(money(previous.income)),
        Cell::new(change_cell(comparison.income_change_pct, true)),
    ]);
    table.add_row(vec![
        Cell::new("Expenses"),
        Cell::new(money(current.expense)),
        Cell::new(money(previous.expense)),
        Cell::new(change_cell(comparison.expense_change_pct, false)),
    ]);
    table.add_row(vec![
        Cell::new("Balance".bold()),
        Cell::new(signed_money(current.balance)),
        Cell::new(signed_money(previous.balance)),
        Cell::new(""),
    ]);
    println!("Month Comparison\n{table}");

    for summary in [current, previous] {
        if summary.top_expenses.is_empty() {
            continue;
        }
        let mut top = Table::new();
        top.set_header(vec!["Category", "Amount"]);
        for cat in &summary.top_expenses {
            top.add_row(vec![Cell::new(&cat.name), Cell::new(money(cat.total))]);
        }
        println!("\nTop Expenses {:02}/{}\n{top}", summary.month, summary.year);
    }
    Ok(())
}
