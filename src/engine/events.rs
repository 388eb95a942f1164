// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Calendar event store operations. Malformed definitions (recurring with
//! no frequency, money kinds with no amount, confidence outside [0,1]) are
//! rejected here, at write time — the timeline read path never validates.

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::engine::error::{parse_stored, EngineError, EngineResult};
use crate::engine::ledger::with_write_tx;
use crate::engine::recurrence::Window;
use crate::models::{CalendarEvent, EventKind};

pub(crate) const EVENT_COLS: &str = "id, owner, title, description, kind, amount, start_date, \
     is_recurring, frequency, recurrence_count, end_date, category_id, source_id, \
     confidence, pattern, generator, resolution";

/// One row of the events table, still in stored (TEXT) form.
pub(crate) struct RawEvent {
    id: i64,
    owner: String,
    title: String,
    description: Option<String>,
    kind: String,
    amount: Option<String>,
    start_date: String,
    is_recurring: bool,
    frequency: Option<String>,
    recurrence_count: Option<u32>,
    end_date: Option<String>,
    category_id: Option<i64>,
    source_id: Option<i64>,
    confidence: Option<String>,
    pattern: Option<String>,
    generator: Option<String>,
    resolution: Option<String>,
}

pub(crate) fn map_event_row(r: &rusqlite::Row) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        id: r.get(0)?,
        owner: r.get(1)?,
        title: r.get(2)?,
        description: r.get(3)?,
        kind: r.get(4)?,
        amount: r.get(5)?,
        start_date: r.get(6)?,
        is_recurring: r.get::<_, i64>(7)? != 0,
        frequency: r.get(8)?,
        recurrence_count: r.get(9)?,
        end_date: r.get(10)?,
        category_id: r.get(11)?,
        source_id: r.get(12)?,
        confidence: r.get(13)?,
        pattern: r.get(14)?,
        generator: r.get(15)?,
        resolution: r.get(16)?,
    })
}

impl RawEvent {
    pub(crate) fn into_event(self) -> EngineResult<CalendarEvent> {
        Ok(CalendarEvent {
            id: self.id,
            owner: self.owner,
            title: self.title,
            description: self.description,
            kind: parse_stored("event kind", &self.kind)?,
            amount: self
                .amount
                .as_deref()
                .map(|v| parse_stored("event amount", v))
                .transpose()?,
            start_date: parse_stored("event start date", &self.start_date)?,
            is_recurring: self.is_recurring,
            frequency: self
                .frequency
                .as_deref()
                .map(|v| parse_stored("event frequency", v))
                .transpose()?,
            recurrence_count: self.recurrence_count,
            end_date: self
                .end_date
                .as_deref()
                .map(|v| parse_stored("event end date", v))
                .transpose()?,
            category_id: self.category_id,
            source_id: self.source_id,
            confidence: self
                .confidence
                .as_deref()
                .map(|v| parse_stored("event confidence", v))
                .transpose()?,
            pattern: self.pattern,
            generator: self.generator,
            resolution: self
                .resolution
                .as_deref()
                .map(|v| parse_stored("event resolution", v))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub kind: EventKind,
    pub amount: Option<Decimal>,
    pub start_date: chrono::NaiveDate,
    pub is_recurring: bool,
    pub frequency: Option<crate::models::Frequency>,
    pub recurrence_count: Option<u32>,
    pub end_date: Option<chrono::NaiveDate>,
    pub category_id: Option<i64>,
    pub source_id: Option<i64>,
    pub confidence: Option<Decimal>,
    pub pattern: Option<String>,
    pub generator: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub kind: Option<EventKind>,
    pub amount: Option<Option<Decimal>>,
    pub start_date: Option<chrono::NaiveDate>,
    pub is_recurring: Option<bool>,
    pub frequency: Option<Option<crate::models::Frequency>>,
    pub recurrence_count: Option<Option<u32>>,
    pub end_date: Option<Option<chrono::NaiveDate>>,
    pub category_id: Option<Option<i64>>,
    pub source_id: Option<Option<i64>>,
}

fn ensure_category(conn: &Connection, owner: &str, id: i64) -> EngineResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE id=?1 AND owner=?2",
            params![id, owner],
            |r| r.get(0),
        )
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| EngineError::not_found("category", id))
}

fn ensure_source(conn: &Connection, owner: &str, id: i64) -> EngineResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM sources WHERE id=?1 AND owner=?2",
            params![id, owner],
            |r| r.get(0),
        )
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| EngineError::not_found("source", id))
}

fn validate_event(conn: &Connection, owner: &str, ev: &NewEvent) -> EngineResult<()> {
    if ev.title.trim().is_empty() {
        return Err(EngineError::validation("event title must not be empty"));
    }
    if ev.is_recurring && ev.frequency.is_none() {
        return Err(EngineError::validation(
            "recurring event requires a frequency",
        ));
    }
    match ev.amount {
        Some(amount) if amount <= Decimal::ZERO => {
            return Err(EngineError::validation(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        None if ev.kind.requires_amount() => {
            return Err(EngineError::validation(format!(
                "{} event requires an amount",
                ev.kind
            )));
        }
        _ => {}
    }
    if let Some(confidence) = ev.confidence {
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(EngineError::validation(format!(
                "confidence must be within [0, 1], got {}",
                confidence
            )));
        }
    }
    if ev.kind == EventKind::Prediction
        && ev.generator.as_deref().map_or(true, |g| g.trim().is_empty())
    {
        return Err(EngineError::validation(
            "prediction event requires a generator tag",
        ));
    }
    if let Some(id) = ev.category_id {
        ensure_category(conn, owner, id)?;
    }
    if let Some(id) = ev.source_id {
        ensure_source(conn, owner, id)?;
    }
    Ok(())
}

pub fn create_event(conn: &Connection, owner: &str, new: NewEvent) -> EngineResult<CalendarEvent> {
    validate_event(conn, owner, &new)?;
    conn.execute(
        "INSERT INTO events(owner, title, description, kind, amount, start_date, is_recurring, \
         frequency, recurrence_count, end_date, category_id, source_id, confidence, pattern, generator)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            owner,
            new.title,
            new.description,
            new.kind.to_string(),
            new.amount.map(|a| a.to_string()),
            new.start_date.to_string(),
            new.is_recurring,
            new.frequency.map(|f| f.to_string()),
            new.recurrence_count,
            new.end_date.map(|d| d.to_string()),
            new.category_id,
            new.source_id,
            new.confidence.map(|c| c.to_string()),
            new.pattern,
            new.generator,
        ],
    )?;
    get_event(conn, owner, conn.last_insert_rowid())
}

pub fn get_event(conn: &Connection, owner: &str, id: i64) -> EngineResult<CalendarEvent> {
    let sql = format!("SELECT {EVENT_COLS} FROM events WHERE id=?1 AND owner=?2");
    conn.query_row(&sql, params![id, owner], map_event_row)
        .optional()?
        .ok_or_else(|| EngineError::not_found("event", id))?
        .into_event()
}

/// Merge the patch onto the stored row and re-validate the result, so an
/// edit can never leave behind a definition that `create_event` would have
/// rejected.
pub fn edit_event(
    conn: &mut Connection,
    owner: &str,
    id: i64,
    patch: EventPatch,
) -> EngineResult<CalendarEvent> {
    with_write_tx(conn, |tx| {
        let old = get_event(tx, owner, id)?;
        let merged = NewEvent {
            title: patch.title.clone().unwrap_or_else(|| old.title.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| old.description.clone()),
            kind: patch.kind.unwrap_or(old.kind),
            amount: patch.amount.unwrap_or(old.amount),
            start_date: patch.start_date.unwrap_or(old.start_date),
            is_recurring: patch.is_recurring.unwrap_or(old.is_recurring),
            frequency: patch.frequency.unwrap_or(old.frequency),
            recurrence_count: patch.recurrence_count.unwrap_or(old.recurrence_count),
            end_date: patch.end_date.unwrap_or(old.end_date),
            category_id: patch.category_id.unwrap_or(old.category_id),
            source_id: patch.source_id.unwrap_or(old.source_id),
            confidence: old.confidence,
            pattern: old.pattern.clone(),
            generator: old.generator.clone(),
        };
        validate_event(tx, owner, &merged)?;
        tx.execute(
            "UPDATE events SET title=?1, description=?2, kind=?3, amount=?4, start_date=?5, \
             is_recurring=?6, frequency=?7, recurrence_count=?8, end_date=?9, category_id=?10, source_id=?11
             WHERE id=?12 AND owner=?13",
            params![
                merged.title,
                merged.description,
                merged.kind.to_string(),
                merged.amount.map(|a| a.to_string()),
                merged.start_date.to_string(),
                merged.is_recurring,
                merged.frequency.map(|f| f.to_string()),
                merged.recurrence_count,
                merged.end_date.map(|d| d.to_string()),
                merged.category_id,
                merged.source_id,
                id,
                owner,
            ],
        )?;
        get_event(tx, owner, id)
    })
}

pub fn delete_event(conn: &Connection, owner: &str, id: i64) -> EngineResult<()> {
    let affected = conn.execute(
        "DELETE FROM events WHERE id=?1 AND owner=?2",
        params![id, owner],
    )?;
    if affected == 0 {
        return Err(EngineError::not_found("event", id));
    }
    Ok(())
}

/// Non-recurring events whose date falls inside the window. Resolved
/// predictions are dead to every read path and excluded here.
pub fn one_off_events_in(
    conn: &Connection,
    owner: &str,
    window: Window,
) -> EngineResult<Vec<CalendarEvent>> {
    let sql = format!(
        "SELECT {EVENT_COLS} FROM events
         WHERE owner=?1 AND is_recurring=0 AND resolution IS NULL
           AND start_date>=?2 AND start_date<?3
         ORDER BY start_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![owner, window.start.to_string(), window.end.to_string()],
        map_event_row,
    )?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.into_event()?);
    }
    Ok(events)
}

/// Recurring definitions whose effective range intersects the window;
/// count bounds are enforced during expansion, not here.
pub fn recurring_events_intersecting(
    conn: &Connection,
    owner: &str,
    window: Window,
) -> EngineResult<Vec<CalendarEvent>> {
    let sql = format!(
        "SELECT {EVENT_COLS} FROM events
         WHERE owner=?1 AND is_recurring=1 AND resolution IS NULL
           AND start_date<?2 AND (end_date IS NULL OR end_date>=?3)
         ORDER BY start_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![owner, window.end.to_string(), window.start.to_string()],
        map_event_row,
    )?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.into_event()?);
    }
    Ok(events)
}
