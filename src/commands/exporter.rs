// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::current_owner;
use anyhow::Result;
use rusqlite::{params, Connection};
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        Some(("events", sub)) => export_events(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT t.date, t.kind, t.amount, t.description, c.name as category, s.name as source, t.provenance
         FROM transactions t
         LEFT JOIN sources s ON t.source_id=s.id
         LEFT JOIN categories c ON t.category_id=c.id
         WHERE t.owner=?1
         ORDER BY t.date, t.id",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, Option<String>>(5)?,
            r.get::<_, String>(6)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "date",
                "kind",
                "amount",
                "description",
                "category",
                "source",
                "provenance",
            ])?;
            for row in rows {
                let (date, kind, amount, description, category, source, provenance) = row?;
                wtr.write_record([
                    date,
                    kind,
                    amount,
                    description,
                    category.unwrap_or_default(),
                    source.unwrap_or_default(),
                    provenance,
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (date, kind, amount, description, category, source, provenance) = row?;
                items.push(json!({
                    "date": date, "kind": kind, "amount": amount, "description": description,
                    "category": category, "source": source, "provenance": provenance
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported transactions to {}", out);
    Ok(())
}

fn export_events(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT e.start_date, e.kind, e.title, e.amount, e.frequency, e.recurrence_count,
                e.end_date, c.name as category, s.name as source
         FROM events e
         LEFT JOIN categories c ON e.category_id=c.id
         LEFT JOIN sources s ON e.source_id=s.id
         WHERE e.owner=?1 AND e.resolution IS NULL
         ORDER BY e.start_date, e.id",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, Option<i64>>(5)?,
            r.get::<_, Option<String>>(6)?,
            r.get::<_, Option<String>>(7)?,
            r.get::<_, Option<String>>(8)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "date", "kind", "title", "amount", "frequency", "count", "until", "category",
                "source",
            ])?;
            for row in rows {
                let (date, kind, title, amount, frequency, count, until, category, source) = row?;
                wtr.write_record([
                    date,
                    kind,
                    title,
                    amount.unwrap_or_default(),
                    frequency.unwrap_or_default(),
                    count.map(|n| n.to_string()).unwrap_or_default(),
                    until.unwrap_or_default(),
                    category.unwrap_or_default(),
                    source.unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (date, kind, title, amount, frequency, count, until, category, source) = row?;
                items.push(json!({
                    "date": date, "kind": kind, "title": title, "amount": amount,
                    "frequency": frequency, "count": count, "until": until,
                    "category": category, "source": source
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported events to {}", out);
    Ok(())
}
