// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::events::{self, EventPatch, NewEvent};
use crate::models::{EventKind, Frequency};
use crate::utils::{
    current_owner, id_for_category, id_for_source, maybe_print_json, parse_date, parse_decimal,
    pretty_table,
};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => add(conn, &owner, sub)?,
        Some(("edit", sub)) => edit(conn, &owner, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            events::delete_event(conn, &owner, id)?;
            println!("Removed event {}", id);
        }
        Some(("list", sub)) => list(conn, &owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let kind: EventKind = sub
        .get_one::<String>("kind")
        .unwrap()
        .parse()
        .map_err(anyhow::Error::msg)?;
    let frequency: Option<Frequency> = sub
        .get_one::<String>("repeat")
        .map(|s| s.parse().map_err(anyhow::Error::msg))
        .transpose()?;
    let event = events::create_event(
        conn,
        owner,
        NewEvent {
            title: sub.get_one::<String>("title").unwrap().to_string(),
            description: sub.get_one::<String>("description").cloned(),
            kind,
            amount: sub
                .get_one::<String>("amount")
                .map(|s| parse_decimal(s))
                .transpose()?,
            start_date: parse_date(sub.get_one::<String>("date").unwrap())?,
            is_recurring: frequency.is_some(),
            frequency,
            recurrence_count: sub.get_one::<u32>("count").copied(),
            end_date: sub
                .get_one::<String>("until")
                .map(|s| parse_date(s))
                .transpose()?,
            category_id: sub
                .get_one::<String>("category")
                .map(|c| id_for_category(conn, owner, c))
                .transpose()?,
            source_id: sub
                .get_one::<String>("source")
                .map(|s| id_for_source(conn, owner, s))
                .transpose()?,
            confidence: None,
            pattern: None,
            generator: None,
        },
    )?;
    match event.frequency {
        Some(freq) => println!(
            "Scheduled {} event {} '{}' starting {} ({})",
            event.kind, event.id, event.title, event.start_date, freq
        ),
        None => println!(
            "Scheduled {} event {} '{}' on {}",
            event.kind, event.id, event.title, event.start_date
        ),
    }
    Ok(())
}

fn edit(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let mut patch = EventPatch {
        title: sub.get_one::<String>("title").cloned(),
        description: sub.get_one::<String>("description").map(|s| Some(s.clone())),
        kind: sub
            .get_one::<String>("kind")
            .map(|s| s.parse().map_err(anyhow::Error::msg))
            .transpose()?,
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s).map(Some))
            .transpose()?,
        start_date: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
        is_recurring: None,
        frequency: None,
        recurrence_count: sub.get_one::<u32>("count").map(|n| Some(*n)),
        end_date: sub
            .get_one::<String>("until")
            .map(|s| parse_date(s).map(Some))
            .transpose()?,
        category_id: sub
            .get_one::<String>("category")
            .map(|c| id_for_category(conn, owner, c).map(Some))
            .transpose()?,
        source_id: sub
            .get_one::<String>("source")
            .map(|s| id_for_source(conn, owner, s).map(Some))
            .transpose()?,
    };
    if sub.get_flag("no-repeat") {
        patch.is_recurring = Some(false);
        patch.frequency = Some(None);
        patch.recurrence_count = Some(None);
        patch.end_date = Some(None);
    } else if let Some(repeat) = sub.get_one::<String>("repeat") {
        let frequency: Frequency = repeat.parse().map_err(anyhow::Error::msg)?;
        patch.is_recurring = Some(true);
        patch.frequency = Some(Some(frequency));
    }
    let event = events::edit_event(conn, owner, id, patch)?;
    println!("Updated event {} '{}'", event.id, event.title);
    Ok(())
}

#[derive(Serialize)]
struct EventRow {
    id: i64,
    date: String,
    kind: String,
    title: String,
    amount: String,
    repeat: String,
    count: String,
    until: String,
    category: String,
    source: String,
}

fn list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut sql = String::from(
        "SELECT e.id, e.start_date, e.kind, e.title, e.amount, e.is_recurring, e.frequency,
                e.recurrence_count, e.end_date, c.name, s.name
         FROM events e
         LEFT JOIN categories c ON e.category_id=c.id
         LEFT JOIN sources s ON e.source_id=s.id
         WHERE e.owner=? AND e.resolution IS NULL",
    );
    let mut params_vec: Vec<String> = vec![owner.to_string()];
    if let Some(from) = sub.get_one::<String>("from") {
        parse_date(from)?;
        sql.push_str(" AND e.start_date>=?");
        params_vec.push(from.into());
    }
    if let Some(to) = sub.get_one::<String>("to") {
        parse_date(to)?;
        sql.push_str(" AND e.start_date<?");
        params_vec.push(to.into());
    }
    sql.push_str(" ORDER BY e.start_date, e.id");

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let is_recurring: bool = r.get::<_, i64>(5)? != 0;
        let frequency: Option<String> = r.get(6)?;
        data.push(EventRow {
            id: r.get(0)?,
            date: r.get(1)?,
            kind: r.get(2)?,
            title: r.get(3)?,
            amount: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
            repeat: if is_recurring {
                frequency.unwrap_or_default()
            } else {
                String::new()
            },
            count: r
                .get::<_, Option<i64>>(7)?
                .map(|n| n.to_string())
                .unwrap_or_default(),
            until: r.get::<_, Option<String>>(8)?.unwrap_or_default(),
            category: r.get::<_, Option<String>>(9)?.unwrap_or_default(),
            source: r.get::<_, Option<String>>(10)?.unwrap_or_default(),
        });
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|e| {
                vec![
                    e.id.to_string(),
                    e.date.clone(),
                    e.kind.clone(),
                    e.title.clone(),
                    e.amount.clone(),
                    e.repeat.clone(),
                    e.count.clone(),
                    e.until.clone(),
                    e.category.clone(),
                    e.source.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "Id", "Date", "Kind", "Title", "Amount", "Repeat", "Count", "Until",
                    "Category", "Source"
                ],
                rows,
            )
        );
    }
    Ok(())
}
