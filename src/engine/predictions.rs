// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Predicted-bill lifecycle: proposed → accepted | dismissed (terminal).
//!
//! Proposals arrive from the external bill-prediction generator as
//! prediction-kind calendar events. Accepting one posts a concrete
//! transaction through the balance ledger and resolves the event in the
//! same store transaction, so a ledger refusal (locked source, denied
//! overdraft) leaves the proposal untouched and exactly one transaction
//! ever exists per accepted prediction. Confidence is advisory metadata;
//! nothing here enforces a threshold.

use rusqlite::{params, Connection};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{self, map_event_row, EVENT_COLS};
use crate::engine::ledger::{self, effective_overdraft, with_write_tx, Overdraft};
use crate::models::{CalendarEvent, Provenance, Transaction, TxKind};

/// Unresolved proposals for this owner, oldest bill first.
pub fn list_proposed(conn: &Connection, owner: &str) -> EngineResult<Vec<CalendarEvent>> {
    let sql = format!(
        "SELECT {EVENT_COLS} FROM events
         WHERE owner=?1 AND kind='prediction' AND resolution IS NULL
         ORDER BY start_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner], map_event_row)?;
    let mut proposals = Vec::new();
    for row in rows {
        proposals.push(row?.into_event()?);
    }
    Ok(proposals)
}

/// Loads the event and enforces the lifecycle gate shared by accept and
/// dismiss: it must be a prediction and still proposed.
fn proposed_prediction(
    conn: &Connection,
    owner: &str,
    event_id: i64,
) -> EngineResult<CalendarEvent> {
    let event = events::get_event(conn, owner, event_id)?;
    if !event.is_prediction() {
        return Err(EngineError::validation(format!(
            "event {} is a {}, not a prediction",
            event_id, event.kind
        )));
    }
    if let Some(resolution) = event.resolution {
        return Err(EngineError::AlreadyResolved(resolution.to_string()));
    }
    Ok(event)
}

/// The transaction kind a prediction materializes as: its category's kind
/// when one is attached, otherwise expense — predicted bills are charges.
fn materialized_kind(
    conn: &Connection,
    owner: &str,
    event: &CalendarEvent,
) -> EngineResult<TxKind> {
    use crate::engine::error::parse_stored;
    use rusqlite::OptionalExtension;
    match event.category_id {
        Some(category_id) => {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT kind FROM categories WHERE id=?1 AND owner=?2",
                    params![category_id, owner],
                    |r| r.get(0),
                )
                .optional()?;
            match raw {
                Some(raw) => parse_stored("category kind", &raw),
                None => Ok(TxKind::Expense),
            }
        }
        None => Ok(TxKind::Expense),
    }
}

/// acceptPrediction: post the bill through the ledger and resolve the
/// proposal atomically. A second accept of the same id is
/// [`EngineError::AlreadyResolved`], never a double posting.
pub fn accept(
    conn: &mut Connection,
    owner: &str,
    event_id: i64,
    overdraft: Overdraft,
) -> EngineResult<Transaction> {
    with_write_tx(conn, |tx| {
        let event = proposed_prediction(tx, owner, event_id)?;
        let amount = event
            .amount
            .ok_or_else(|| EngineError::validation("prediction carries no amount"))?;
        let source_id = event
            .source_id
            .ok_or_else(|| EngineError::validation("prediction carries no funding source"))?;
        let kind = materialized_kind(tx, owner, &event)?;

        ledger::apply(
            tx,
            owner,
            source_id,
            kind.signed(amount),
            effective_overdraft(kind, overdraft),
        )?;
        tx.execute(
            "INSERT INTO transactions(owner, date, amount, kind, description, category_id, source_id, provenance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                owner,
                event.start_date.to_string(),
                amount.to_string(),
                kind.to_string(),
                event.title,
                event.category_id,
                source_id,
                Provenance::PredictionConfirmed.to_string(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE events SET resolution='accepted', resolved_at=datetime('now')
             WHERE id=?1 AND owner=?2",
            params![event_id, owner],
        )?;
        Ok(Transaction {
            id,
            owner: owner.to_string(),
            date: event.start_date,
            amount,
            kind,
            description: event.title.clone(),
            category_id: event.category_id,
            source_id,
            provenance: Provenance::PredictionConfirmed,
        })
    })
}

/// dismissPrediction: resolve without touching the ledger.
pub fn dismiss(conn: &mut Connection, owner: &str, event_id: i64) -> EngineResult<()> {
    with_write_tx(conn, |tx| {
        proposed_prediction(tx, owner, event_id)?;
        tx.execute(
            "UPDATE events SET resolution='dismissed', resolved_at=datetime('now')
             WHERE id=?1 AND owner=?2",
            params![event_id, owner],
        )?;
        Ok(())
    })
}
