// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cashplan::db;
use cashplan::engine::events::{self, NewEvent};
use cashplan::engine::ledger::{self, NewTransaction, Overdraft};
use cashplan::engine::recurrence::Window;
use cashplan::engine::timeline::{self, EntryKind, DAY_ENTRY_CAP};
use cashplan::models::{EventKind, Frequency, Provenance, TxKind};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn seed_source(conn: &Connection, owner: &str, name: &str, balance: &str) -> i64 {
    conn.execute(
        "INSERT INTO sources(owner, name, balance, opening_balance) VALUES (?1, ?2, ?3, ?3)",
        params![owner, name, balance],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn plain_event(kind: EventKind, title: &str, date: &str, amount: Option<&str>) -> NewEvent {
    NewEvent {
        title: title.into(),
        description: None,
        kind,
        amount: amount.map(dec),
        start_date: d(date),
        is_recurring: false,
        frequency: None,
        recurrence_count: None,
        end_date: None,
        category_id: None,
        source_id: None,
        confidence: None,
        pattern: None,
        generator: None,
    }
}

fn prediction_event(title: &str, date: &str, amount: &str, source_id: Option<i64>) -> NewEvent {
    NewEvent {
        source_id,
        confidence: Some(dec("0.8")),
        pattern: Some("monthly-bill".into()),
        generator: Some("pattern-detector".into()),
        ..plain_event(EventKind::Prediction, title, date, Some(amount))
    }
}

fn post(conn: &mut Connection, owner: &str, kind: TxKind, amount: &str, date: &str, source: i64) {
    ledger::post_transaction(
        conn,
        owner,
        NewTransaction {
            date: d(date),
            amount: dec(amount),
            kind,
            description: "posted".into(),
            category_id: None,
            source_id: source,
            provenance: Provenance::Manual,
        },
        Overdraft::Allow,
    )
    .unwrap();
}

#[test]
fn merges_all_entry_kinds_with_same_day_precedence() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "1000");
    events::create_event(
        &conn,
        "ada",
        plain_event(EventKind::Income, "payday", "2024-03-05", Some("100")),
    )
    .unwrap();
    events::create_event(
        &conn,
        "ada",
        plain_event(EventKind::Reminder, "file taxes", "2024-03-05", None),
    )
    .unwrap();
    events::create_event(
        &conn,
        "ada",
        prediction_event("electricity", "2024-03-05", "75", None),
    )
    .unwrap();
    post(&mut conn, "ada", TxKind::Expense, "40", "2024-03-05", wallet);

    let days =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-03-01"), d("2024-04-01")))
            .unwrap();
    assert_eq!(days.len(), 1);
    let day = &days[0];
    assert_eq!(day.date, d("2024-03-05"));
    let kinds: Vec<EventKind> = day.entries.iter().map(|e| e.display).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Income,
            EventKind::Expense,
            EventKind::Reminder,
            EventKind::Prediction
        ]
    );

    // Reminders and unaccepted predictions stay out of the aggregates.
    assert_eq!(day.income, dec("100"));
    assert_eq!(day.expenses, dec("40"));
    assert_eq!(day.net, dec("60"));
}

#[test]
fn occurrences_expand_in_window_with_stable_synthetic_ids() {
    let conn = setup();
    let event = events::create_event(
        &conn,
        "ada",
        NewEvent {
            is_recurring: true,
            frequency: Some(Frequency::Monthly),
            recurrence_count: Some(3),
            ..plain_event(EventKind::Expense, "rent", "2024-01-15", Some("50"))
        },
    )
    .unwrap();

    let days =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-01-01"), d("2024-06-01")))
            .unwrap();
    let ids: Vec<String> = days
        .iter()
        .flat_map(|day| day.entries.iter().map(|e| e.id.clone()))
        .collect();
    assert_eq!(
        ids,
        vec![
            format!("evt:{}@2024-01-15", event.id),
            format!("evt:{}@2024-02-15", event.id),
            format!("evt:{}@2024-03-15", event.id),
        ]
    );
    assert!(days
        .iter()
        .all(|day| day.entries.iter().all(|e| e.kind == EntryKind::Occurrence)));

    // Same query again: same ids, no accumulated state.
    let again =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-01-01"), d("2024-06-01")))
            .unwrap();
    let again_ids: Vec<String> = again
        .iter()
        .flat_map(|day| day.entries.iter().map(|e| e.id.clone()))
        .collect();
    assert_eq!(ids, again_ids);
}

#[test]
fn matching_occurrence_and_transaction_are_not_deduplicated() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "1000");
    events::create_event(
        &conn,
        "ada",
        NewEvent {
            is_recurring: true,
            frequency: Some(Frequency::Monthly),
            ..plain_event(EventKind::Expense, "rent", "2024-01-15", Some("50"))
        },
    )
    .unwrap();
    // The user actually paid the rent: planned vs happened both stay
    // visible, telling them apart is presentation, not reconciliation.
    post(&mut conn, "ada", TxKind::Expense, "50", "2024-01-15", wallet);

    let days =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-01-01"), d("2024-02-01")))
            .unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].entries.len(), 2);
    assert_eq!(days[0].expenses, dec("100"));
}

#[test]
fn empty_window_and_unknown_owner_yield_empty_timelines() {
    let conn = setup();
    events::create_event(
        &conn,
        "ada",
        plain_event(EventKind::Reminder, "ping", "2024-03-05", None),
    )
    .unwrap();

    let days =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-03-10"), d("2024-03-10")))
            .unwrap();
    assert!(days.is_empty());

    let days =
        timeline::get_timeline(&conn, "nobody", Window::new(d("2024-01-01"), d("2025-01-01")))
            .unwrap();
    assert!(days.is_empty());
}

#[test]
fn day_entries_are_capped_with_an_overflow_count() {
    let conn = setup();
    let total = DAY_ENTRY_CAP + 3;
    for i in 0..total {
        events::create_event(
            &conn,
            "ada",
            plain_event(EventKind::Reminder, &format!("todo {}", i), "2024-03-05", None),
        )
        .unwrap();
    }

    let days =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-03-01"), d("2024-04-01")))
            .unwrap();
    assert_eq!(days[0].entries.len(), DAY_ENTRY_CAP);
    assert_eq!(days[0].overflow, 3);
}

#[test]
fn buckets_come_back_in_ascending_date_order() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "1000");
    post(&mut conn, "ada", TxKind::Expense, "10", "2024-03-20", wallet);
    post(&mut conn, "ada", TxKind::Expense, "10", "2024-03-02", wallet);
    post(&mut conn, "ada", TxKind::Income, "10", "2024-03-11", wallet);

    let days =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-03-01"), d("2024-04-01")))
            .unwrap();
    let dates: Vec<NaiveDate> = days.iter().map(|day| day.date).collect();
    assert_eq!(dates, vec![d("2024-03-02"), d("2024-03-11"), d("2024-03-20")]);
}
