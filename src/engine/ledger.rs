// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Balance ledger: the only code allowed to move a source's balance.
//!
//! Every compound mutation runs inside one IMMEDIATE transaction, so the
//! store's single-writer lock serializes postings per source (and across the
//! two sources of a re-homed edit, which is why no manual lock ordering
//! exists here). Busy/locked errors are retried with bounded backoff and
//! surfaced as [`EngineError::Conflict`] once the budget is spent.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use std::thread;
use std::time::Duration;

use crate::engine::error::{is_busy, parse_stored, EngineError, EngineResult};
use crate::models::{Provenance, SourceStatus, Transaction, TxKind};

const MAX_WRITE_ATTEMPTS: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(20);

/// Commit-time overdraft policy for a posting. Income postings and
/// reversals ignore it; see [`effective_overdraft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overdraft {
    Deny,
    Allow,
}

/// Income always lands; only expense postings consult the caller's policy.
pub fn effective_overdraft(kind: TxKind, requested: Overdraft) -> Overdraft {
    match kind {
        TxKind::Income => Overdraft::Allow,
        TxKind::Expense => requested,
    }
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub kind: TxKind,
    pub description: String,
    pub category_id: Option<i64>,
    pub source_id: i64,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub kind: Option<TxKind>,
    pub description: Option<String>,
    /// `Some(None)` clears the category.
    pub category_id: Option<Option<i64>>,
    pub source_id: Option<i64>,
}

/// Runs `op` inside an IMMEDIATE transaction, retrying the whole closure
/// when the store is busy. `op` must therefore be safe to re-run: each
/// attempt starts from a rolled-back, clean state.
pub(crate) fn with_write_tx<T>(
    conn: &mut Connection,
    mut op: impl FnMut(&rusqlite::Transaction) -> EngineResult<T>,
) -> EngineResult<T> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
            Ok(tx) => tx,
            Err(e) if is_busy(&e) => {
                if attempt >= MAX_WRITE_ATTEMPTS {
                    return Err(EngineError::Conflict);
                }
                thread::sleep(RETRY_BASE_DELAY * attempt);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        match op(&tx) {
            Ok(value) => match tx.commit() {
                Ok(()) => return Ok(value),
                Err(e) if is_busy(&e) => {
                    if attempt >= MAX_WRITE_ATTEMPTS {
                        return Err(EngineError::Conflict);
                    }
                    thread::sleep(RETRY_BASE_DELAY * attempt);
                }
                Err(e) => return Err(e.into()),
            },
            Err(EngineError::Db(e)) if is_busy(&e) => {
                if attempt >= MAX_WRITE_ATTEMPTS {
                    return Err(EngineError::Conflict);
                }
                thread::sleep(RETRY_BASE_DELAY * attempt);
            }
            Err(other) => return Err(other),
        }
    }
}

struct SourceRow {
    name: String,
    balance: Decimal,
    status: SourceStatus,
}

fn source_row(conn: &Connection, owner: &str, source_id: i64) -> EngineResult<SourceRow> {
    let raw = conn
        .query_row(
            "SELECT name, balance, status FROM sources WHERE id=?1 AND owner=?2",
            params![source_id, owner],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| EngineError::not_found("source", source_id))?;
    Ok(SourceRow {
        name: raw.0,
        balance: parse_stored("source balance", &raw.1)?,
        status: parse_stored("source status", &raw.2)?,
    })
}

/// Atomically adds `signed` (positive income, negative expense) to the
/// source's balance and returns the new balance. Call inside a write
/// transaction; on its own connection this is a single autocommit UPDATE.
pub fn apply(
    conn: &Connection,
    owner: &str,
    source_id: i64,
    signed: Decimal,
    overdraft: Overdraft,
) -> EngineResult<Decimal> {
    let row = source_row(conn, owner, source_id)?;
    if !row.status.allows_posting() {
        return Err(EngineError::SourceLocked {
            name: row.name,
            status: row.status.to_string(),
        });
    }
    let new_balance = row.balance + signed;
    if new_balance < Decimal::ZERO && overdraft == Overdraft::Deny {
        return Err(EngineError::InsufficientFunds {
            balance: row.balance,
            attempted: -signed,
        });
    }
    conn.execute(
        "UPDATE sources SET balance=?1 WHERE id=?2 AND owner=?3",
        params![new_balance.to_string(), source_id, owner],
    )?;
    Ok(new_balance)
}

/// Undo a previous `apply`. Reversals may always drive a balance negative:
/// blocking one would wedge deletes and edits on a drained source.
pub fn reverse(
    conn: &Connection,
    owner: &str,
    source_id: i64,
    signed: Decimal,
) -> EngineResult<Decimal> {
    apply(conn, owner, source_id, -signed, Overdraft::Allow)
}

/// Advisory read used before submitting an expense; the authoritative
/// check happens again inside `apply` at commit time.
pub fn can_afford(
    conn: &Connection,
    owner: &str,
    source_id: i64,
    expense_amount: Decimal,
) -> EngineResult<bool> {
    let row = source_row(conn, owner, source_id)?;
    Ok(row.balance >= expense_amount)
}

fn validate_amount(amount: Decimal) -> EngineResult<()> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::validation(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Kind must agree with the category's kind at write time; existing rows
/// are not re-validated when a category is later repurposed.
fn validate_category_kind(
    conn: &Connection,
    owner: &str,
    category_id: i64,
    kind: TxKind,
) -> EngineResult<()> {
    let raw: String = conn
        .query_row(
            "SELECT kind FROM categories WHERE id=?1 AND owner=?2",
            params![category_id, owner],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| EngineError::not_found("category", category_id))?;
    let cat_kind: TxKind = parse_stored("category kind", &raw)?;
    if cat_kind != kind {
        return Err(EngineError::validation(format!(
            "{} transaction cannot use {} category",
            kind, cat_kind
        )));
    }
    Ok(())
}

pub fn get_transaction(conn: &Connection, owner: &str, id: i64) -> EngineResult<Transaction> {
    let raw = conn
        .query_row(
            "SELECT id, owner, date, amount, kind, description, category_id, source_id, provenance
             FROM transactions WHERE id=?1 AND owner=?2",
            params![id, owner],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, Option<i64>>(6)?,
                    r.get::<_, i64>(7)?,
                    r.get::<_, String>(8)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| EngineError::not_found("transaction", id))?;
    Ok(Transaction {
        id: raw.0,
        owner: raw.1,
        date: parse_stored("transaction date", &raw.2)?,
        amount: parse_stored("transaction amount", &raw.3)?,
        kind: parse_stored("transaction kind", &raw.4)?,
        description: raw.5,
        category_id: raw.6,
        source_id: raw.7,
        provenance: parse_stored("transaction provenance", &raw.8)?,
    })
}

/// postTransaction: validate, apply the signed amount to the source, and
/// insert the row — one atomic unit.
pub fn post_transaction(
    conn: &mut Connection,
    owner: &str,
    new: NewTransaction,
    overdraft: Overdraft,
) -> EngineResult<Transaction> {
    validate_amount(new.amount)?;
    with_write_tx(conn, |tx| {
        if let Some(category_id) = new.category_id {
            validate_category_kind(tx, owner, category_id, new.kind)?;
        }
        apply(
            tx,
            owner,
            new.source_id,
            new.kind.signed(new.amount),
            effective_overdraft(new.kind, overdraft),
        )?;
        tx.execute(
            "INSERT INTO transactions(owner, date, amount, kind, description, category_id, source_id, provenance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                owner,
                new.date.to_string(),
                new.amount.to_string(),
                new.kind.to_string(),
                new.description,
                new.category_id,
                new.source_id,
                new.provenance.to_string(),
            ],
        )?;
        Ok(Transaction {
            id: tx.last_insert_rowid(),
            owner: owner.to_string(),
            date: new.date,
            amount: new.amount,
            kind: new.kind,
            description: new.description.clone(),
            category_id: new.category_id,
            source_id: new.source_id,
            provenance: new.provenance,
        })
    })
}

/// editTransaction: reverse the old posting and apply the new one only
/// when money actually moved (amount, kind or source changed); a pure
/// date/description/category edit leaves balances untouched. Both legs
/// share one transaction, so a failed apply rolls the reverse back too.
pub fn edit_transaction(
    conn: &mut Connection,
    owner: &str,
    id: i64,
    patch: TransactionPatch,
    overdraft: Overdraft,
) -> EngineResult<Transaction> {
    if let Some(amount) = patch.amount {
        validate_amount(amount)?;
    }
    with_write_tx(conn, |tx| {
        let old = get_transaction(tx, owner, id)?;
        let new = Transaction {
            id: old.id,
            owner: old.owner.clone(),
            date: patch.date.unwrap_or(old.date),
            amount: patch.amount.unwrap_or(old.amount),
            kind: patch.kind.unwrap_or(old.kind),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| old.description.clone()),
            category_id: patch.category_id.unwrap_or(old.category_id),
            source_id: patch.source_id.unwrap_or(old.source_id),
            provenance: old.provenance,
        };
        let category_changed = new.category_id != old.category_id;
        if category_changed || new.kind != old.kind {
            if let Some(category_id) = new.category_id {
                validate_category_kind(tx, owner, category_id, new.kind)?;
            }
        }
        let money_moved = new.amount != old.amount
            || new.kind != old.kind
            || new.source_id != old.source_id;
        if money_moved {
            reverse(tx, owner, old.source_id, old.signed_amount())?;
            apply(
                tx,
                owner,
                new.source_id,
                new.signed_amount(),
                effective_overdraft(new.kind, overdraft),
            )?;
        }
        tx.execute(
            "UPDATE transactions SET date=?1, amount=?2, kind=?3, description=?4, category_id=?5, source_id=?6
             WHERE id=?7 AND owner=?8",
            params![
                new.date.to_string(),
                new.amount.to_string(),
                new.kind.to_string(),
                new.description,
                new.category_id,
                new.source_id,
                id,
                owner,
            ],
        )?;
        Ok(new)
    })
}

/// deleteTransaction: reverse the posting and drop the row atomically.
pub fn delete_transaction(conn: &mut Connection, owner: &str, id: i64) -> EngineResult<()> {
    with_write_tx(conn, |tx| {
        let old = get_transaction(tx, owner, id)?;
        reverse(tx, owner, old.source_id, old.signed_amount())?;
        tx.execute(
            "DELETE FROM transactions WHERE id=?1 AND owner=?2",
            params![id, owner],
        )?;
        Ok(())
    })
}
