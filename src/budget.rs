use rusqlite::{params, Connection};

use crate::error::Result;
use crate::fmt::round2;
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    Normal,
    Warning,
    Exceeded,
}

impl BudgetState {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetState::Normal => "normal",
            BudgetState::Warning => "warning",
            BudgetState::Exceeded => "exceeded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BudgetStatus {
    pub budget_id: i64,
    pub category_id: i64,
    pub category: String,
    pub color: String,
    pub month: u32,
    pub year: i32,
    pub limit: f64,
    pub spent: f64,
    pub remaining: f64,
    /// Raw spend-to-limit ratio; classification happens on this value.
    pub ratio: f64,
    /// Capped at 1.0 for progress-bar rendering.
    pub display_ratio: f64,
    /// Integer percentage for display, uncapped (e.g. 150).
    pub percent: i64,
    pub state: BudgetState,
}

fn spent_for(conn: &Connection, owner_id: i64, category_id: i64, month: u32, year: i32) -> Result<f64> {
    let prefix = format!("{year:04}-{month:02}%");
    let spent: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM entries \
         WHERE owner_id = ?1 AND category_id = ?2 AND kind = 'expense' AND date LIKE ?3",
        params![owner_id, category_id, prefix],
        |row| row.get(0),
    )?;
    Ok(round2(spent))
}

/// Consumption of every budget the owner set for (month, year).
pub fn evaluate_budgets(
    conn: &Connection,
    owner_id: i64,
    month: u32,
    year: i32,
) -> Result<Vec<BudgetStatus>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.category_id, c.name, c.color, b.\"limit\" \
         FROM budgets b JOIN categories c ON b.category_id = c.id \
         WHERE b.owner_id = ?1 AND b.month = ?2 AND b.year = ?3 \
         ORDER BY c.name",
    )?;
    let rows = stmt.query_map(params![owner_id, month, year], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, f64>(4)?,
        ))
    })?;

    let mut statuses = Vec::new();
    for row in rows {
        let (budget_id, category_id, category, color, limit) = row?;
        let spent = spent_for(conn, owner_id, category_id, month, year)?;
        // Limits are validated positive; the zero guard covers rows written
        // before that rule existed.
        let ratio = if limit > 0.0 { spent / limit } else { 0.0 };
        let state = if ratio >= 1.0 {
            BudgetState::Exceeded
        } else if ratio >= 0.8 {
            BudgetState::Warning
        } else {
            BudgetState::Normal
        };
        statuses.push(BudgetStatus {
            budget_id,
            category_id,
            category,
            color,
            month,
            year,
            limit,
            spent,
            remaining: round2(limit - spent),
            ratio,
            display_ratio: ratio.min(1.0),
            percent: (ratio * 100.0).round() as i64,
            state,
        });
    }
    Ok(statuses)
}

/// Budgets worth flagging on a dashboard: warning and exceeded only.
pub fn budget_alerts(
    conn: &Connection,
    owner_id: i64,
    month: u32,
    year: i32,
) -> Result<Vec<BudgetStatus>> {
    Ok(evaluate_budgets(conn, owner_id, month, year)?
        .into_iter()
        .filter(|b| b.state != BudgetState::Normal)
        .collect())
}

/// Replicates one month's limits into another month, upserting per category.
pub fn copy_budgets(
    conn: &Connection,
    owner_id: i64,
    from: (u32, i32),
    to: (u32, i32),
) -> Result<usize> {
    let source = store::list_budgets(conn, owner_id, from.0, from.1)?;
    let mut copied = 0;
    for budget in &source {
        store::set_budget(conn, owner_id, budget.category_id, to.0, to.1, budget.limit)?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::{Entry, EntryKind};
    use crate::store::{add_entry, add_owner, find_category_by_name, set_budget};
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection, i64) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        let owner = add_owner(&conn, "tester").unwrap();
        (dir, conn, owner)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn category(conn: &Connection, owner: i64, name: &str) -> i64 {
        find_category_by_name(conn, owner, name, EntryKind::Expense)
            .unwrap()
            .unwrap()
            .id
            .unwrap()
    }

    fn spend(conn: &Connection, owner: i64, category_id: i64, amount: f64, on: NaiveDate) {
        add_entry(
            conn,
            &Entry {
                id: None,
                owner_id: owner,
                description: "spend".to_string(),
                amount,
                kind: EntryKind::Expense,
                category_id: Some(category_id),
                date: on,
                recurring: false,
                frequency: None,
                cursor_date: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_status_thresholds() {
        let (_dir, conn, owner) = test_db();
        let groceries = category(&conn, owner, "Groceries");
        let transport = category(&conn, owner, "Transport");
        let leisure = category(&conn, owner, "Leisure");
        set_budget(&conn, owner, groceries, 3, 2024, 100.0).unwrap();
        set_budget(&conn, owner, transport, 3, 2024, 100.0).unwrap();
        set_budget(&conn, owner, leisure, 3, 2024, 100.0).unwrap();

        spend(&conn, owner, groceries, 79.0, date(2024, 3, 10));
        spend(&conn, owner, transport, 80.0, date(2024, 3, 10));
        spend(&conn, owner, leisure, 100.0, date(2024, 3, 10));

        let statuses = evaluate_budgets(&conn, owner, 3, 2024).unwrap();
        let by_name = |n: &str| statuses.iter().find(|s| s.category == n).unwrap();
        assert_eq!(by_name("Groceries").state, BudgetState::Normal);
        assert_eq!(by_name("Transport").state, BudgetState::Warning);
        assert_eq!(by_name("Leisure").state, BudgetState::Exceeded);
    }

    #[test]
    fn test_spent_scoped_to_month_category_and_kind() {
        let (_dir, conn, owner) = test_db();
        let groceries = category(&conn, owner, "Groceries");
        let transport = category(&conn, owner, "Transport");
        set_budget(&conn, owner, groceries, 3, 2024, 200.0).unwrap();

        spend(&conn, owner, groceries, 50.0, date(2024, 3, 1));
        spend(&conn, owner, groceries, 25.0, date(2024, 3, 31));
        spend(&conn, owner, groceries, 99.0, date(2024, 2, 29)); // wrong month
        spend(&conn, owner, transport, 99.0, date(2024, 3, 5)); // wrong category

        let statuses = evaluate_budgets(&conn, owner, 3, 2024).unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].spent, 75.0);
        assert_eq!(statuses[0].remaining, 125.0);
        assert_eq!(statuses[0].percent, 38);
        assert_eq!(statuses[0].state, BudgetState::Normal);
    }

    #[test]
    fn test_overspend_caps_display_ratio_not_percent() {
        let (_dir, conn, owner) = test_db();
        let groceries = category(&conn, owner, "Groceries");
        set_budget(&conn, owner, groceries, 3, 2024, 100.0).unwrap();
        spend(&conn, owner, groceries, 150.0, date(2024, 3, 15));

        let statuses = evaluate_budgets(&conn, owner, 3, 2024).unwrap();
        let s = &statuses[0];
        assert_eq!(s.state, BudgetState::Exceeded);
        assert_eq!(s.display_ratio, 1.0);
        assert_eq!(s.percent, 150);
        assert_eq!(s.remaining, -50.0);
    }

    #[test]
    fn test_zero_limit_guard() {
        let (_dir, conn, owner) = test_db();
        let groceries = category(&conn, owner, "Groceries");
        conn.execute(
            "INSERT INTO budgets (owner_id, category_id, \"limit\", month, year) VALUES (?1, ?2, 0, 3, 2024)",
            params![owner, groceries],
        )
        .unwrap();
        spend(&conn, owner, groceries, 10.0, date(2024, 3, 1));

        let statuses = evaluate_budgets(&conn, owner, 3, 2024).unwrap();
        assert_eq!(statuses[0].ratio, 0.0);
        assert_eq!(statuses[0].state, BudgetState::Normal);
    }

    #[test]
    fn test_alerts_keep_warning_and_exceeded_only() {
        let (_dir, conn, owner) = test_db();
        let groceries = category(&conn, owner, "Groceries");
        let transport = category(&conn, owner, "Transport");
        let leisure = category(&conn, owner, "Leisure");
        set_budget(&conn, owner, groceries, 3, 2024, 100.0).unwrap();
        set_budget(&conn, owner, transport, 3, 2024, 100.0).unwrap();
        set_budget(&conn, owner, leisure, 3, 2024, 100.0).unwrap();
        spend(&conn, owner, groceries, 10.0, date(2024, 3, 10));
        spend(&conn, owner, transport, 85.0, date(2024, 3, 10));
        spend(&conn, owner, leisure, 120.0, date(2024, 3, 10));

        let alerts = budget_alerts(&conn, owner, 3, 2024).unwrap();
        let names: Vec<&str> = alerts.iter().map(|a| a.category.as_str()).collect();
        assert_eq!(names, vec!["Leisure", "Transport"]);
    }

    #[test]
    fn test_copy_budgets_upserts_target_month() {
        let (_dir, conn, owner) = test_db();
        let groceries = category(&conn, owner, "Groceries");
        let transport = category(&conn, owner, "Transport");
        set_budget(&conn, owner, groceries, 3, 2024, 200.0).unwrap();
        set_budget(&conn, owner, transport, 3, 2024, 80.0).unwrap();
        // Pre-existing target budget gets overwritten by the copy.
        set_budget(&conn, owner, groceries, 4, 2024, 999.0).unwrap();

        let copied = copy_budgets(&conn, owner, (3, 2024), (4, 2024)).unwrap();
        assert_eq!(copied, 2);

        let april = evaluate_budgets(&conn, owner, 4, 2024).unwrap();
        assert_eq!(april.len(), 2);
        let g = april.iter().find(|s| s.category == "Groceries").unwrap();
        assert_eq!(g.limit, 200.0);
    }

    #[test]
    fn test_december_copy_to_january() {
        let (_dir, conn, owner) = test_db();
        let groceries = category(&conn, owner, "Groceries");
        set_budget(&conn, owner, groceries, 12, 2024, 150.0).unwrap();
        let copied = copy_budgets(&conn, owner, (12, 2024), (1, 2025)).unwrap();
        assert_eq!(copied, 1);
        let january = evaluate_budgets(&conn, owner, 1, 2025).unwrap();
        assert_eq!(january[0].limit, 150.0);
    }
}
