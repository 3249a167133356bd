use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Months, NaiveDate};
use once_cell::sync::Lazy;
use rusqlite::Connection;

use crate::error::Result;
use crate::models::{Entry, Frequency};
use crate::store;

// One lock per owner: a catch-up pass must never race itself for the same
// owner (the duplicate-guard read and the insert would interleave). Passes
// for different owners are independent.
static OWNER_LOCKS: Lazy<Mutex<HashMap<i64, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn owner_lock(owner_id: i64) -> Arc<Mutex<()>> {
    let mut locks = OWNER_LOCKS.lock().expect("owner lock registry poisoned");
    locks
        .entry(owner_id)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Next occurrence after `cursor`. Monthly and yearly steps clamp the day to
/// the target month's length (Jan 31 -> Feb 29/28, Feb 29 -> Feb 28).
pub fn step(cursor: NaiveDate, frequency: Frequency) -> NaiveDate {
    match frequency {
        Frequency::Weekly => cursor + Duration::days(7),
        Frequency::Monthly => cursor + Months::new(1),
        Frequency::Yearly => cursor + Months::new(12),
    }
}

#[derive(Debug, Default)]
pub struct RecurrenceReport {
    pub generated: usize,
    pub errors: Vec<String>,
}

/// Catch-up pass for one owner: materializes every missed occurrence of each
/// recurring entry up to `now` and advances the origin cursors. Failures on
/// one origin are collected and do not stop the others. Safe to call
/// arbitrarily often; a retry after a partial failure resumes where the
/// persisted cursor stopped and the duplicate guard skips what already landed.
pub fn advance_recurrences(
    conn: &Connection,
    owner_id: i64,
    now: NaiveDate,
) -> Result<RecurrenceReport> {
    let lock = owner_lock(owner_id);
    let _guard = lock.lock().expect("owner lock poisoned");

    let mut report = RecurrenceReport::default();
    for origin in store::recurring_entries(conn, owner_id)? {
        match advance_one(conn, &origin, now) {
            Ok(generated) => report.generated += generated,
            Err(e) => report.errors.push(format!("'{}': {e}", origin.description)),
        }
    }
    Ok(report)
}

fn advance_one(conn: &Connection, origin: &Entry, now: NaiveDate) -> Result<usize> {
    let (Some(id), Some(frequency), Some(mut cursor)) =
        (origin.id, origin.frequency, origin.cursor_date)
    else {
        return Ok(0);
    };
    let mut generated = 0;
    loop {
        let next = step(cursor, frequency);
        if next > now {
            break;
        }
        if !store::plain_entry_exists(
            conn,
            origin.owner_id,
            &origin.description,
            origin.amount,
            origin.kind,
            next,
        )? {
            let occurrence = Entry {
                id: None,
                owner_id: origin.owner_id,
                description: origin.description.clone(),
                amount: origin.amount,
                kind: origin.kind,
                category_id: origin.category_id,
                date: next,
                recurring: false,
                frequency: None,
                cursor_date: None,
            };
            store::add_entry(conn, &occurrence)?;
            generated += 1;
        }
        // Persisted per step, not batched: a crash between insert and cursor
        // update is healed on retry by the duplicate guard.
        store::set_cursor(conn, origin.owner_id, id, next)?;
        cursor = next;
    }
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::EntryKind;
    use crate::store::{add_entry, add_owner, get_entry, list_entries, EntryFilter};

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

    fn recurring(owner_id: i64, description: &str, amount: f64, on: NaiveDate, frequency: Frequency) -> Entry {
        Entry {
            id: None,
            owner_id,
            description: description.to_string(),
            amount,
            kind: EntryKind::Expense,
            category_id: None,
            date: on,
            recurring: true,
            frequency: Some(frequency),
            cursor_date: None,
        }
    }

    #[test]
    fn test_step_weekly() {
        assert_eq!(step(date(2024, 1, 1), Frequency::Weekly), date(2024, 1, 8));
        assert_eq!(step(date(2024, 2, 26), Frequency::Weekly), date(2024, 3, 4));
    }

    #[test]
    fn test_step_monthly_clamps_short_months() {
        assert_eq!(step(date(2024, 1, 31), Frequency::Monthly), date(2024, 2, 29));
        assert_eq!(step(date(2023, 1, 31), Frequency::Monthly), date(2023, 2, 28));
        assert_eq!(step(date(2024, 3, 31), Frequency::Monthly), date(2024, 4, 30));
        assert_eq!(step(date(2024, 1, 15), Frequency::Monthly), date(2024, 2, 15));
    }

    #[test]
    fn test_step_yearly_clamps_leap_day() {
        assert_eq!(step(date(2024, 2, 29), Frequency::Yearly), date(2025, 2, 28));
        assert_eq!(step(date(2024, 7, 4), Frequency::Yearly), date(2025, 7, 4));
    }

    #[test]
    fn test_monthly_catch_up_generates_missed_occurrences() {
        let (_dir, conn, owner) = test_db();
        let id = add_entry(&conn, &recurring(owner, "Rent", 800.0, date(2024, 1, 15), Frequency::Monthly)).unwrap();

        let report = advance_recurrences(&conn, owner, date(2024, 4, 20)).unwrap();
        assert_eq!(report.generated, 3);
        assert!(report.errors.is_empty());

        let generated = list_entries(&conn, owner, &EntryFilter { kind: Some(EntryKind::Expense), ..Default::default() })
            .unwrap()
            .into_iter()
            .filter(|e| !e.recurring)
            .map(|e| e.date)
            .collect::<Vec<_>>();
        assert_eq!(generated, vec![date(2024, 4, 15), date(2024, 3, 15), date(2024, 2, 15)]);

        let origin = get_entry(&conn, owner, id).unwrap();
        assert_eq!(origin.cursor_date, Some(date(2024, 4, 15)));
        assert_eq!(origin.date, date(2024, 1, 15));
    }

    #[test]
    fn test_repeated_advance_is_idempotent() {
        let (_dir, conn, owner) = test_db();
        add_entry(&conn, &recurring(owner, "Rent", 800.0, date(2024, 1, 15), Frequency::Monthly)).unwrap();

        let first = advance_recurrences(&conn, owner, date(2024, 4, 20)).unwrap();
        assert_eq!(first.generated, 3);
        let second = advance_recurrences(&conn, owner, date(2024, 4, 20)).unwrap();
        assert_eq!(second.generated, 0);

        let count: i64 = conn
            .query_row("SELECT count(*) FROM entries WHERE recurring = 0", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_weekly_catch_up() {
        let (_dir, conn, owner) = test_db();
        let id = add_entry(&conn, &recurring(owner, "Groceries run", 60.0, date(2024, 1, 1), Frequency::Weekly)).unwrap();

        let report = advance_recurrences(&conn, owner, date(2024, 1, 31)).unwrap();
        assert_eq!(report.generated, 4);
        let origin = get_entry(&conn, owner, id).unwrap();
        assert_eq!(origin.cursor_date, Some(date(2024, 1, 29)));
    }

    #[test]
    fn test_boundary_now_equal_to_next_generates() {
        let (_dir, conn, owner) = test_db();
        add_entry(&conn, &recurring(owner, "Rent", 800.0, date(2024, 1, 15), Frequency::Monthly)).unwrap();

        let report = advance_recurrences(&conn, owner, date(2024, 2, 15)).unwrap();
        assert_eq!(report.generated, 1);

        let before = advance_recurrences(&conn, owner, date(2024, 3, 14)).unwrap();
        assert_eq!(before.generated, 0);
    }

    #[test]
    fn test_retry_after_partial_failure_skips_existing() {
        let (_dir, conn, owner) = test_db();
        let id = add_entry(&conn, &recurring(owner, "Rent", 800.0, date(2024, 1, 15), Frequency::Monthly)).unwrap();

        // Simulate a crash that inserted February's occurrence but never
        // advanced the cursor.
        let mut stranded = recurring(owner, "Rent", 800.0, date(2024, 2, 15), Frequency::Monthly);
        stranded.recurring = false;
        stranded.frequency = None;
        add_entry(&conn, &stranded).unwrap();

        let report = advance_recurrences(&conn, owner, date(2024, 4, 20)).unwrap();
        assert_eq!(report.generated, 2); // March and April; February already present

        let count: i64 = conn
            .query_row("SELECT count(*) FROM entries WHERE recurring = 0", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 3);
        let origin = get_entry(&conn, owner, id).unwrap();
        assert_eq!(origin.cursor_date, Some(date(2024, 4, 15)));
    }

    #[test]
    fn test_generated_occurrences_keep_category_and_kind() {
        let (_dir, conn, owner) = test_db();
        let cat = crate::store::find_category_by_name(&conn, owner, "Housing", EntryKind::Expense)
            .unwrap()
            .unwrap()
            .id
            .unwrap();
        let mut origin = recurring(owner, "Rent", 800.0, date(2024, 1, 15), Frequency::Monthly);
        origin.category_id = Some(cat);
        add_entry(&conn, &origin).unwrap();

        advance_recurrences(&conn, owner, date(2024, 2, 20)).unwrap();
        let (category_id, recurring_flag): (Option<i64>, bool) = conn
            .query_row(
                "SELECT category_id, recurring FROM entries WHERE recurring = 0",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(category_id, Some(cat));
        assert!(!recurring_flag);
    }

    #[test]
    fn test_owners_are_independent() {
        let (_dir, conn, owner) = test_db();
        let other = add_owner(&conn, "other").unwrap();
        add_entry(&conn, &recurring(owner, "Rent", 800.0, date(2024, 1, 15), Frequency::Monthly)).unwrap();
        add_entry(&conn, &recurring(other, "Lease", 950.0, date(2024, 1, 10), Frequency::Monthly)).unwrap();

        let report = advance_recurrences(&conn, owner, date(2024, 3, 1)).unwrap();
        assert_eq!(report.generated, 1);

        let other_plain: i64 = conn
            .query_row(
                "SELECT count(*) FROM entries WHERE owner_id = ?1 AND recurring = 0",
                [other],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(other_plain, 0);
    }
}
