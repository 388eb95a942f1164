// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cashplan::db;
use cashplan::engine::events::{self, NewEvent};
use cashplan::engine::ledger::Overdraft;
use cashplan::engine::predictions;
use cashplan::engine::recurrence::Window;
use cashplan::engine::timeline;
use cashplan::engine::EngineError;
use cashplan::models::{EventKind, Provenance};
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

fn balance_of(conn: &Connection, source_id: i64) -> Decimal {
    let s: String = conn
        .query_row(
            "SELECT balance FROM sources WHERE id=?1",
            params![source_id],
            |r| r.get(0),
        )
        .unwrap();
    s.parse().unwrap()
}

fn tx_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap()
}

fn propose_bill(conn: &Connection, owner: &str, source_id: i64, amount: &str, date: &str) -> i64 {
    events::create_event(
        conn,
        owner,
        NewEvent {
            title: "electricity".into(),
            description: None,
            kind: EventKind::Prediction,
            amount: Some(dec(amount)),
            start_date: d(date),
            is_recurring: false,
            frequency: None,
            recurrence_count: None,
            end_date: None,
            category_id: None,
            source_id: Some(source_id),
            confidence: Some(dec("0.8")),
            pattern: Some("monthly-bill".into()),
            generator: Some("pattern-detector".into()),
        },
    )
    .unwrap()
    .id
}

#[test]
fn accept_materializes_a_confirmed_transaction_and_retires_the_proposal() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "500");
    let prediction = propose_bill(&conn, "ada", wallet, "75", "2024-03-01");

    let tx = predictions::accept(&mut conn, "ada", prediction, Overdraft::Deny)
        .expect("accept succeeds");
    assert_eq!(tx.provenance, Provenance::PredictionConfirmed);
    assert_eq!(tx.amount, dec("75"));
    assert_eq!(tx.date, d("2024-03-01"));
    assert_eq!(balance_of(&conn, wallet), dec("425"));

    // The proposal is gone from every read path.
    assert!(predictions::list_proposed(&conn, "ada").unwrap().is_empty());
    let days =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-03-01"), d("2024-04-01")))
            .unwrap();
    let prediction_entries: Vec<_> = days
        .iter()
        .flat_map(|day| day.entries.iter())
        .filter(|e| e.display == EventKind::Prediction)
        .collect();
    assert!(prediction_entries.is_empty());
    // The confirmed transaction took its place on that date.
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].expenses, dec("75"));
}

#[test]
fn accepting_twice_returns_already_resolved_and_posts_exactly_once() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "500");
    let prediction = propose_bill(&conn, "ada", wallet, "75", "2024-03-01");

    predictions::accept(&mut conn, "ada", prediction, Overdraft::Deny).unwrap();
    let err = predictions::accept(&mut conn, "ada", prediction, Overdraft::Deny)
        .expect_err("second accept must fail");
    assert!(matches!(err, EngineError::AlreadyResolved(_)));
    assert_eq!(tx_count(&conn), 1);
    assert_eq!(balance_of(&conn, wallet), dec("425"));
}

#[test]
fn dismiss_removes_from_timeline_without_touching_the_ledger() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "500");
    let prediction = propose_bill(&conn, "ada", wallet, "75", "2024-03-01");

    predictions::dismiss(&mut conn, "ada", prediction).expect("dismiss succeeds");
    assert_eq!(balance_of(&conn, wallet), dec("500"));
    assert_eq!(tx_count(&conn), 0);

    let days =
        timeline::get_timeline(&conn, "ada", Window::new(d("2024-03-01"), d("2024-04-01")))
            .unwrap();
    assert!(days.is_empty());

    // Terminal: neither dismiss nor accept may run again.
    let err = predictions::dismiss(&mut conn, "ada", prediction).expect_err("already resolved");
    assert!(matches!(err, EngineError::AlreadyResolved(_)));
    let err = predictions::accept(&mut conn, "ada", prediction, Overdraft::Deny)
        .expect_err("already resolved");
    assert!(matches!(err, EngineError::AlreadyResolved(_)));
}

#[test]
fn failed_ledger_posting_leaves_the_proposal_proposed() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "500");
    let prediction = propose_bill(&conn, "ada", wallet, "75", "2024-03-01");
    conn.execute("UPDATE sources SET status='locked' WHERE id=?1", params![wallet])
        .unwrap();

    let err = predictions::accept(&mut conn, "ada", prediction, Overdraft::Deny)
        .expect_err("locked source blocks acceptance");
    assert!(matches!(err, EngineError::SourceLocked { .. }));
    assert_eq!(tx_count(&conn), 0);
    assert_eq!(balance_of(&conn, wallet), dec("500"));
    assert_eq!(predictions::list_proposed(&conn, "ada").unwrap().len(), 1);

    // Unlock and the same proposal is still acceptable.
    conn.execute(
        "UPDATE sources SET status='available' WHERE id=?1",
        params![wallet],
    )
    .unwrap();
    predictions::accept(&mut conn, "ada", prediction, Overdraft::Deny).unwrap();
    assert_eq!(balance_of(&conn, wallet), dec("425"));
}

#[test]
fn insufficient_funds_blocks_acceptance_until_overdraft_is_allowed() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "50");
    let prediction = propose_bill(&conn, "ada", wallet, "75", "2024-03-01");

    let err = predictions::accept(&mut conn, "ada", prediction, Overdraft::Deny)
        .expect_err("cannot cover the bill");
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));
    assert_eq!(predictions::list_proposed(&conn, "ada").unwrap().len(), 1);

    predictions::accept(&mut conn, "ada", prediction, Overdraft::Allow).unwrap();
    assert_eq!(balance_of(&conn, wallet), dec("-25"));
}

#[test]
fn accepting_a_non_prediction_event_is_a_validation_error() {
    let mut conn = setup();
    let event = events::create_event(
        &conn,
        "ada",
        NewEvent {
            title: "payday".into(),
            description: None,
            kind: EventKind::Income,
            amount: Some(dec("100")),
            start_date: d("2024-03-01"),
            is_recurring: false,
            frequency: None,
            recurrence_count: None,
            end_date: None,
            category_id: None,
            source_id: None,
            confidence: None,
            pattern: None,
            generator: None,
        },
    )
    .unwrap();

    let err = predictions::accept(&mut conn, "ada", event.id, Overdraft::Deny)
        .expect_err("not a prediction");
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn confidence_is_advisory_and_never_filters() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "500");
    let event = events::create_event(
        &conn,
        "ada",
        NewEvent {
            title: "long shot".into(),
            description: None,
            kind: EventKind::Prediction,
            amount: Some(dec("10")),
            start_date: d("2024-03-01"),
            is_recurring: false,
            frequency: None,
            recurrence_count: None,
            end_date: None,
            category_id: None,
            source_id: Some(wallet),
            confidence: Some(dec("0.01")),
            pattern: None,
            generator: Some("pattern-detector".into()),
        },
    )
    .unwrap();
    assert_eq!(predictions::list_proposed(&conn, "ada").unwrap().len(), 1);
    predictions::accept(&mut conn, "ada", event.id, Overdraft::Deny).unwrap();
}
