use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use rusqlite::{params, Connection};

use crate::error::{LedgerError, Result};
use crate::fmt::round2;
use crate::models::EntryRow;
use crate::store::{self, EntryFilter};

fn month_prefix(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}%")
}

fn year_prefix(year: i32) -> String {
    format!("{year:04}-%")
}

fn month_span(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| LedgerError::Validation("Month must be between 1 and 12".to_string()))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| LedgerError::Validation("Month out of range".to_string()))?;
    Ok((first, last))
}

// ---------------------------------------------------------------------------
// Monthly totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MonthTotal {
    pub month: u32,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

/// Always 12 rows, one per calendar month; months without entries carry
/// zeros so chart series stay complete.
pub fn monthly_totals(conn: &Connection, owner_id: i64, year: i32) -> Result<Vec<MonthTotal>> {
    let mut totals: Vec<MonthTotal> = (1..=12)
        .map(|month| MonthTotal { month, income: 0.0, expense: 0.0, balance: 0.0 })
        .collect();

    let mut stmt = conn.prepare(
        "SELECT CAST(substr(date, 6, 2) AS INTEGER) AS m, \
         SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), \
         SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END) \
         FROM entries WHERE owner_id = ?1 AND date LIKE ?2 \
         GROUP BY m",
    )?;
    let rows = stmt.query_map(params![owner_id, year_prefix(year)], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?, row.get::<_, f64>(2)?))
    })?;
    for row in rows {
        let (month, income, expense) = row?;
        if (1..=12).contains(&month) {
            let slot = &mut totals[(month - 1) as usize];
            slot.income = round2(income);
            slot.expense = round2(expense);
            slot.balance = round2(income - expense);
        }
    }
    Ok(totals)
}

fn year_totals(conn: &Connection, owner_id: i64, year: i32) -> Result<(f64, f64)> {
    let (income, expense): (f64, f64) = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0), \
         COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0) \
         FROM entries WHERE owner_id = ?1 AND date LIKE ?2",
        params![owner_id, year_prefix(year)],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((round2(income), round2(expense)))
}

fn month_totals(conn: &Connection, owner_id: i64, month: u32, year: i32) -> Result<(f64, f64)> {
    let (income, expense): (f64, f64) = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0), \
         COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0) \
         FROM entries WHERE owner_id = ?1 AND date LIKE ?2",
        params![owner_id, month_prefix(year, month)],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((round2(income), round2(expense)))
}

// ---------------------------------------------------------------------------
// Running balance
// ---------------------------------------------------------------------------

/// Income minus expense over the full history up to and including `as_of`.
/// This is the account's running balance, not a month net.
pub fn cumulative_balance(conn: &Connection, owner_id: i64, as_of: NaiveDate) -> Result<f64> {
    let balance: f64 = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE -amount END), 0) \
         FROM entries WHERE owner_id = ?1 AND date <= ?2",
        params![owner_id, as_of],
        |row| row.get(0),
    )?;
    Ok(round2(balance))
}

fn balance_before(conn: &Connection, owner_id: i64, date: NaiveDate) -> Result<f64> {
    let balance: f64 = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE -amount END), 0) \
         FROM entries WHERE owner_id = ?1 AND date < ?2",
        params![owner_id, date],
        |row| row.get(0),
    )?;
    Ok(round2(balance))
}

// ---------------------------------------------------------------------------
// Daily evolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DayPoint {
    pub day: u32,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
    pub running_balance: f64,
}

#[derive(Debug, Clone)]
pub struct DailyEvolution {
    pub month: u32,
    pub year: i32,
    pub starting_balance: f64,
    pub days: Vec<DayPoint>,
}

/// Balance trajectory through one month, seeded with the balance carried in
/// from all prior history. The running balance is re-rounded at every step so
/// float drift cannot accumulate across a long month.
pub fn daily_evolution(conn: &Connection, owner_id: i64, month: u32, year: i32) -> Result<DailyEvolution> {
    let (first, last) = month_span(year, month)?;
    let starting_balance = balance_before(conn, owner_id, first)?;

    let mut stmt = conn.prepare(
        "SELECT date, \
         SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), \
         SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END) \
         FROM entries WHERE owner_id = ?1 AND date LIKE ?2 \
         GROUP BY date",
    )?;
    let rows = stmt.query_map(params![owner_id, month_prefix(year, month)], |row| {
        Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, f64>(1)?, row.get::<_, f64>(2)?))
    })?;
    let mut by_day: HashMap<NaiveDate, (f64, f64)> = HashMap::new();
    for row in rows {
        let (date, income, expense) = row?;
        by_day.insert(date, (income, expense));
    }

    let mut days = Vec::with_capacity(last.day() as usize);
    let mut running = starting_balance;
    for date in first.iter_days() {
        if date > last {
            break;
        }
        let (income, expense) = by_day.get(&date).copied().unwrap_or((0.0, 0.0));
        let net = round2(income - expense);
        running = round2(running + net);
        days.push(DayPoint {
            day: date.day(),
            income: round2(income),
            expense: round2(expense),
            net,
            running_balance: running,
        });
    }

    Ok(DailyEvolution { month, year, starting_balance, days })
}

// ---------------------------------------------------------------------------
// Category rankings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CategoryTotal {
    pub name: String,
    pub color: String,
    pub total: f64,
}

fn expense_by_category(
    conn: &Connection,
    owner_id: i64,
    date_like: &str,
    limit: Option<usize>,
) -> Result<Vec<CategoryTotal>> {
    let mut sql = String::from(
        "SELECT c.name, c.color, SUM(e.amount) AS total \
         FROM entries e JOIN categories c ON e.category_id = c.id \
         WHERE e.owner_id = ?1 AND e.kind = 'expense' AND e.date LIKE ?2 \
         GROUP BY c.id ORDER BY total DESC",
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id, date_like], |row| {
        Ok(CategoryTotal {
            name: row.get(0)?,
            color: row.get(1)?,
            total: row.get(2)?,
        })
    })?;
    let mut totals = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    for t in &mut totals {
        t.total = round2(t.total);
    }
    Ok(totals)
}

/// Categories ranked by annual expense volume. Uncategorized spending has no
/// category row and is not ranked.
pub fn top_expense_categories(
    conn: &Connection,
    owner_id: i64,
    year: i32,
    limit: usize,
) -> Result<Vec<CategoryTotal>> {
    expense_by_category(conn, owner_id, &year_prefix(year), Some(limit))
}

// ---------------------------------------------------------------------------
// Month comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MonthSummary {
    pub month: u32,
    pub year: i32,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub top_expenses: Vec<CategoryTotal>,
}

#[derive(Debug, Clone)]
pub struct MonthComparison {
    pub current: MonthSummary,
    pub previous: MonthSummary,
    pub income_change_pct: f64,
    pub expense_change_pct: f64,
}

fn month_summary(conn: &Connection, owner_id: i64, month: u32, year: i32) -> Result<MonthSummary> {
    let (income, expense) = month_totals(conn, owner_id, month, year)?;
    let top_expenses = expense_by_category(conn, owner_id, &month_prefix(year, month), Some(5))?;
    Ok(MonthSummary {
        month,
        year,
        income,
        expense,
        balance: round2(income - expense),
        top_expenses,
    })
}

fn pct_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        round2((current - previous) / previous * 100.0)
    }
}

/// One month against the preceding calendar month; January compares against
/// December of the prior year.
pub fn month_comparison(conn: &Connection, owner_id: i64, month: u32, year: i32) -> Result<MonthComparison> {
    month_span(year, month)?;
    let (prev_month, prev_year) = if month == 1 { (12, year - 1) } else { (month - 1, year) };
    let current = month_summary(conn, owner_id, month, year)?;
    let previous = month_summary(conn, owner_id, prev_month, prev_year)?;
    let income_change_pct = pct_change(previous.income, current.income);
    let expense_change_pct = pct_change(previous.expense, current.expense);
    Ok(MonthComparison { current, previous, income_change_pct, expense_change_pct })
}

// ---------------------------------------------------------------------------
// Annual report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnnualReport {
    pub year: i32,
    pub months: Vec<MonthTotal>,
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub top_expense_categories: Vec<CategoryTotal>,
    pub available_years: Vec<i32>,
}

pub fn available_years(conn: &Connection, owner_id: i64, ensure: i32) -> Result<Vec<i32>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT CAST(substr(date, 1, 4) AS INTEGER) AS y \
         FROM entries WHERE owner_id = ?1 ORDER BY y DESC",
    )?;
    let rows = stmt.query_map(params![owner_id], |row| row.get::<_, i32>(0))?;
    let mut years = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    if !years.contains(&ensure) {
        years.push(ensure);
        years.sort_unstable_by(|a, b| b.cmp(a));
    }
    Ok(years)
}

pub fn annual_report(conn: &Connection, owner_id: i64, year: i32) -> Result<AnnualReport> {
    let months = monthly_totals(conn, owner_id, year)?;
    let (total_income, total_expense) = year_totals(conn, owner_id, year)?;
    Ok(AnnualReport {
        year,
        months,
        total_income,
        total_expense,
        balance: round2(total_income - total_expense),
        top_expense_categories: top_expense_categories(conn, owner_id, year, 5)?,
        available_years: available_years(conn, owner_id, year)?,
    })
}

// ---------------------------------------------------------------------------
// Dashboard summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub month: u32,
    pub year: i32,
    pub income: f64,
    pub expense: f64,
    /// Running balance through the end of the current month.
    pub balance: f64,
    pub recent: Vec<EntryRow>,
    pub expenses_by_category: Vec<CategoryTotal>,
}

pub fn dashboard_summary(conn: &Connection, owner_id: i64, today: NaiveDate) -> Result<DashboardSummary> {
    let month = today.month();
    let year = today.year();
    let (_, last) = month_span(year, month)?;
    let (income, expense) = month_totals(conn, owner_id, month, year)?;
    let balance = cumulative_balance(conn, owner_id, last)?;
    let recent = store::list_entries(
        conn,
        owner_id,
        &EntryFilter { limit: Some(10), ..Default::default() },
    )?;
    let expenses_by_category = expense_by_category(conn, owner_id, &month_prefix(year, month), None)?;
    Ok(DashboardSummary {
        month,
        year,
        income,
        expense,
        balance,
        recent,
        expenses_by_category,
    })
}
