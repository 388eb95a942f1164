// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cashplan::db;
use cashplan::engine::ledger::{
    self, NewTransaction, Overdraft, TransactionPatch,
};
use cashplan::engine::EngineError;
use cashplan::models::{Provenance, TxKind};
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

fn seed_category(conn: &Connection, owner: &str, name: &str, kind: &str) -> i64 {
    conn.execute(
        "INSERT INTO categories(owner, name, kind) VALUES (?1, ?2, ?3)",
        params![owner, name, kind],
    )
    .unwrap();
    conn.last_insert_rowid()
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

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn new_tx(kind: TxKind, amount: &str, category_id: Option<i64>, source_id: i64) -> NewTransaction {
    NewTransaction {
        date: date("2024-03-01"),
        amount: dec(amount),
        kind,
        description: "test".into(),
        category_id,
        source_id,
        provenance: Provenance::Manual,
    }
}

#[test]
fn expense_post_then_delete_restores_balance() {
    let mut conn = setup();
    let checking = seed_source(&conn, "ada", "Checking", "1000");
    let groceries = seed_category(&conn, "ada", "Groceries", "expense");

    let tx = ledger::post_transaction(
        &mut conn,
        "ada",
        NewTransaction {
            date: date("2024-02-10"),
            amount: dec("200"),
            kind: TxKind::Expense,
            description: "weekly shop".into(),
            category_id: Some(groceries),
            source_id: checking,
            provenance: Provenance::Manual,
        },
        Overdraft::Deny,
    )
    .expect("post succeeds");
    assert_eq!(balance_of(&conn, checking), dec("800"));

    ledger::delete_transaction(&mut conn, "ada", tx.id).expect("delete succeeds");
    assert_eq!(balance_of(&conn, checking), dec("1000"));

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn expense_exceeding_balance_is_rejected_before_any_write() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "100");

    let err = ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Expense, "150", None, wallet),
        Overdraft::Deny,
    )
    .expect_err("must be rejected");
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));
    assert_eq!(balance_of(&conn, wallet), dec("100"));
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn explicit_overdraft_lets_an_expense_go_negative() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "100");

    ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Expense, "150", None, wallet),
        Overdraft::Allow,
    )
    .expect("overdraft permitted");
    assert_eq!(balance_of(&conn, wallet), dec("-50"));
}

#[test]
fn income_never_consults_the_overdraft_policy() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "-25");

    ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Income, "10", None, wallet),
        Overdraft::Deny,
    )
    .expect("income always lands");
    assert_eq!(balance_of(&conn, wallet), dec("-15"));
}

#[test]
fn locked_source_rejects_postings() {
    let mut conn = setup();
    let frozen = seed_source(&conn, "ada", "Frozen", "500");
    conn.execute("UPDATE sources SET status='locked' WHERE id=?1", params![frozen])
        .unwrap();

    let err = ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Income, "10", None, frozen),
        Overdraft::Deny,
    )
    .expect_err("locked source must refuse");
    assert!(matches!(err, EngineError::SourceLocked { .. }));
    assert_eq!(balance_of(&conn, frozen), dec("500"));
}

#[test]
fn kind_must_match_category_kind() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "100");
    let salary = seed_category(&conn, "ada", "Salary", "income");

    let err = ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Expense, "10", Some(salary), wallet),
        Overdraft::Deny,
    )
    .expect_err("expense against income category");
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(balance_of(&conn, wallet), dec("100"));
}

#[test]
fn nonpositive_amounts_are_rejected() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "100");
    for amount in ["0", "-5"] {
        let err = ledger::post_transaction(
            &mut conn,
            "ada",
            new_tx(TxKind::Expense, amount, None, wallet),
            Overdraft::Allow,
        )
        .expect_err("nonpositive amount");
        assert!(matches!(err, EngineError::Validation(_)));
    }
}

#[test]
fn owner_scoping_hides_foreign_rows() {
    let mut conn = setup();
    let wallet = seed_source(&conn, "ada", "Wallet", "100");
    let tx = ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Expense, "10", None, wallet),
        Overdraft::Deny,
    )
    .unwrap();

    let err = ledger::delete_transaction(&mut conn, "grace", tx.id).expect_err("not grace's row");
    assert!(matches!(err, EngineError::NotFound { .. }));
    assert_eq!(balance_of(&conn, wallet), dec("90"));

    let err = ledger::post_transaction(
        &mut conn,
        "grace",
        new_tx(TxKind::Expense, "10", None, wallet),
        Overdraft::Deny,
    )
    .expect_err("not grace's source");
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn edit_moves_money_between_sources() {
    let mut conn = setup();
    let checking = seed_source(&conn, "ada", "Checking", "1000");
    let savings = seed_source(&conn, "ada", "Savings", "1000");

    let tx = ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Expense, "300", None, checking),
        Overdraft::Deny,
    )
    .unwrap();
    assert_eq!(balance_of(&conn, checking), dec("700"));

    ledger::edit_transaction(
        &mut conn,
        "ada",
        tx.id,
        TransactionPatch {
            source_id: Some(savings),
            ..Default::default()
        },
        Overdraft::Deny,
    )
    .expect("re-home succeeds");
    assert_eq!(balance_of(&conn, checking), dec("1000"));
    assert_eq!(balance_of(&conn, savings), dec("700"));
}

#[test]
fn failed_edit_leaves_both_sources_untouched() {
    let mut conn = setup();
    let checking = seed_source(&conn, "ada", "Checking", "1000");
    let locked = seed_source(&conn, "ada", "Locked", "1000");

    let tx = ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Expense, "300", None, checking),
        Overdraft::Deny,
    )
    .unwrap();
    conn.execute("UPDATE sources SET status='locked' WHERE id=?1", params![locked])
        .unwrap();

    let err = ledger::edit_transaction(
        &mut conn,
        "ada",
        tx.id,
        TransactionPatch {
            source_id: Some(locked),
            ..Default::default()
        },
        Overdraft::Deny,
    )
    .expect_err("target is locked");
    assert!(matches!(err, EngineError::SourceLocked { .. }));

    // The reverse leg must have rolled back with the failed apply leg.
    assert_eq!(balance_of(&conn, checking), dec("700"));
    assert_eq!(balance_of(&conn, locked), dec("1000"));
    let stored = ledger::get_transaction(&conn, "ada", tx.id).unwrap();
    assert_eq!(stored.source_id, checking);
}

#[test]
fn date_and_description_edits_skip_the_ledger() {
    let mut conn = setup();
    let checking = seed_source(&conn, "ada", "Checking", "1000");
    let tx = ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Expense, "300", None, checking),
        Overdraft::Deny,
    )
    .unwrap();

    let edited = ledger::edit_transaction(
        &mut conn,
        "ada",
        tx.id,
        TransactionPatch {
            date: Some(date("2024-04-01")),
            description: Some("renamed".into()),
            ..Default::default()
        },
        Overdraft::Deny,
    )
    .unwrap();
    assert_eq!(edited.date, date("2024-04-01"));
    assert_eq!(edited.description, "renamed");
    // Applied once at post time, never again.
    assert_eq!(balance_of(&conn, checking), dec("700"));
}

#[test]
fn edit_amount_reapplies_the_difference() {
    let mut conn = setup();
    let checking = seed_source(&conn, "ada", "Checking", "1000");
    let tx = ledger::post_transaction(
        &mut conn,
        "ada",
        new_tx(TxKind::Expense, "300", None, checking),
        Overdraft::Deny,
    )
    .unwrap();

    ledger::edit_transaction(
        &mut conn,
        "ada",
        tx.id,
        TransactionPatch {
            amount: Some(dec("120")),
            ..Default::default()
        },
        Overdraft::Deny,
    )
    .unwrap();
    assert_eq!(balance_of(&conn, checking), dec("880"));
}

// Tiny deterministic generator so the operation-sequence test needs no
// extra dev-dependency.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[test]
fn balance_always_equals_opening_plus_live_signed_amounts() {
    let mut conn = setup();
    let opening = dec("10000");
    let wallet = seed_source(&conn, "ada", "Wallet", "10000");
    let mut rng = XorShift(0x1234_5678_9abc_def1);
    let mut live: Vec<i64> = Vec::new();

    for _ in 0..200 {
        let roll = rng.next() % 100;
        let amount = Decimal::from(rng.next() % 99 + 1);
        if roll < 50 || live.is_empty() {
            let kind = if rng.next() % 2 == 0 {
                TxKind::Expense
            } else {
                TxKind::Income
            };
            let tx = ledger::post_transaction(
                &mut conn,
                "ada",
                NewTransaction {
                    date: date("2024-01-01"),
                    amount,
                    kind,
                    description: "op".into(),
                    category_id: None,
                    source_id: wallet,
                    provenance: Provenance::Manual,
                },
                Overdraft::Allow,
            )
            .unwrap();
            live.push(tx.id);
        } else if roll < 75 {
            let id = live[(rng.next() % live.len() as u64) as usize];
            ledger::edit_transaction(
                &mut conn,
                "ada",
                id,
                TransactionPatch {
                    amount: Some(amount),
                    ..Default::default()
                },
                Overdraft::Allow,
            )
            .unwrap();
        } else {
            let idx = (rng.next() % live.len() as u64) as usize;
            let id = live.swap_remove(idx);
            ledger::delete_transaction(&mut conn, "ada", id).unwrap();
        }
    }

    let mut expected = opening;
    let mut stmt = conn
        .prepare("SELECT amount, kind FROM transactions WHERE source_id=?1")
        .unwrap();
    let mut rows = stmt.query(params![wallet]).unwrap();
    while let Some(r) = rows.next().unwrap() {
        let amount: String = r.get(0).unwrap();
        let kind: String = r.get(1).unwrap();
        let amount: Decimal = amount.parse().unwrap();
        if kind == "income" {
            expected += amount;
        } else {
            expected -= amount;
        }
    }
    assert_eq!(balance_of(&conn, wallet), expected);
}
