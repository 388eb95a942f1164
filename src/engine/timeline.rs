// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Timeline reconciliation: one ordered, day-bucketed view over persisted
//! one-off events, expanded recurrences, unresolved predictions and
//! transaction-derived pseudo-entries.
//!
//! Reads here are snapshots; they never block the ledger's writers. A
//! predicted or scheduled occurrence that coincides with a real transaction
//! is intentionally NOT collapsed — telling "planned" from "happened" is
//! the caller's presentation concern.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::engine::error::{parse_stored, EngineResult};
use crate::engine::events;
use crate::engine::recurrence::{event_dates, Window};
use crate::models::{CalendarEvent, EventKind, TxKind};

/// Entries shown per day before the bucket reports overflow instead.
/// Aggregates always cover the full day, capped or not.
pub const DAY_ENTRY_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A persisted one-off calendar event (including proposed predictions).
    Event,
    /// A computed instance of a recurring definition; never persisted.
    Occurrence,
    /// A posted ledger transaction shown as a pseudo-event. Not editable
    /// through the calendar; edits go through the ledger.
    Transaction,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    /// Stable reference: `txn:<id>`, `evt:<id>`, or `evt:<id>@<date>` for
    /// occurrences, so clients can address one instance without the
    /// engine ever materializing it.
    pub id: String,
    pub date: NaiveDate,
    pub kind: EntryKind,
    pub display: EventKind,
    pub title: String,
    pub amount: Option<Decimal>,
    pub category_id: Option<i64>,
    pub source_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub entries: Vec<TimelineEntry>,
    /// Entries dropped from `entries` by the display cap.
    pub overflow: usize,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
}

/// Same-day ordering: income first, then expense, reminder, prediction.
fn precedence(display: EventKind) -> u8 {
    match display {
        EventKind::Income => 0,
        EventKind::Expense => 1,
        EventKind::Reminder => 2,
        EventKind::Prediction => 3,
    }
}

fn event_entry(event: &CalendarEvent, date: NaiveDate, kind: EntryKind) -> TimelineEntry {
    let id = match kind {
        EntryKind::Occurrence => format!("evt:{}@{}", event.id, date),
        _ => format!("evt:{}", event.id),
    };
    TimelineEntry {
        id,
        date,
        kind,
        display: event.kind,
        title: event.title.clone(),
        amount: event.amount,
        category_id: event.category_id,
        source_id: event.source_id,
    }
}

fn transaction_entries(
    conn: &Connection,
    owner: &str,
    window: Window,
) -> EngineResult<Vec<TimelineEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, amount, kind, description, category_id, source_id
         FROM transactions WHERE owner=?1 AND date>=?2 AND date<?3
         ORDER BY date, id",
    )?;
    let rows = stmt.query_map(
        params![owner, window.start.to_string(), window.end.to_string()],
        |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, Option<i64>>(5)?,
                r.get::<_, i64>(6)?,
            ))
        },
    )?;
    let mut entries = Vec::new();
    for row in rows {
        let (id, date, amount, kind, description, category_id, source_id) = row?;
        let tx_kind: TxKind = parse_stored("transaction kind", &kind)?;
        entries.push(TimelineEntry {
            id: format!("txn:{}", id),
            date: parse_stored("transaction date", &date)?,
            kind: EntryKind::Transaction,
            display: match tx_kind {
                TxKind::Income => EventKind::Income,
                TxKind::Expense => EventKind::Expense,
            },
            title: description,
            amount: Some(parse_stored("transaction amount", &amount)?),
            category_id,
            source_id: Some(source_id),
        });
    }
    Ok(entries)
}

/// getTimeline: merge, order, bucket. An unknown owner or empty window is
/// an empty timeline, not an error.
pub fn get_timeline(
    conn: &Connection,
    owner: &str,
    window: Window,
) -> EngineResult<Vec<DayBucket>> {
    if window.is_empty() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for event in events::one_off_events_in(conn, owner, window)? {
        entries.push(event_entry(&event, event.start_date, EntryKind::Event));
    }
    for event in events::recurring_events_intersecting(conn, owner, window)? {
        for date in event_dates(&event, window) {
            entries.push(event_entry(&event, date, EntryKind::Occurrence));
        }
    }
    entries.extend(transaction_entries(conn, owner, window)?);

    // Stable: entries of equal (date, precedence) keep their fetch order.
    entries.sort_by_key(|e| (e.date, precedence(e.display)));

    let mut buckets: BTreeMap<NaiveDate, Vec<TimelineEntry>> = BTreeMap::new();
    for entry in entries {
        buckets.entry(entry.date).or_default().push(entry);
    }

    let mut days = Vec::with_capacity(buckets.len());
    for (date, day_entries) in buckets {
        let mut income = Decimal::ZERO;
        let mut expenses = Decimal::ZERO;
        for entry in &day_entries {
            let counts = match entry.kind {
                EntryKind::Transaction => match entry.display {
                    EventKind::Income => Some(TxKind::Income),
                    EventKind::Expense => Some(TxKind::Expense),
                    _ => None,
                },
                // Reminders and unaccepted predictions never count.
                EntryKind::Event | EntryKind::Occurrence => entry.display.counts_toward_totals(),
            };
            if let (Some(kind), Some(amount)) = (counts, entry.amount) {
                match kind {
                    TxKind::Income => income += amount,
                    TxKind::Expense => expenses += amount,
                }
            }
        }
        let overflow = day_entries.len().saturating_sub(DAY_ENTRY_CAP);
        let mut shown = day_entries;
        shown.truncate(DAY_ENTRY_CAP);
        days.push(DayBucket {
            date,
            entries: shown,
            overflow,
            income,
            expenses,
            net: income - expenses,
        });
    }
    Ok(days)
}
