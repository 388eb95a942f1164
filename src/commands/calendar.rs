// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::recurrence::Window;
use crate::engine::timeline;
use crate::utils::{current_owner, fmt_amount, maybe_print_json, parse_date, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("view", sub)) => view(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn view(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let from = parse_date(sub.get_one::<String>("from").unwrap())?;
    let to = parse_date(sub.get_one::<String>("to").unwrap())?;

    let days = timeline::get_timeline(conn, &owner, Window::new(from, to))?;
    if maybe_print_json(json_flag, jsonl_flag, &days)? {
        return Ok(());
    }
    if days.is_empty() {
        println!("Nothing scheduled or posted in [{}, {})", from, to);
        return Ok(());
    }

    let mut rows = Vec::new();
    for day in &days {
        let mut first = true;
        for entry in &day.entries {
            rows.push(vec![
                if first { day.date.to_string() } else { String::new() },
                format!("{:?}", entry.kind).to_lowercase(),
                entry.display.to_string(),
                entry.title.clone(),
                entry.amount.as_ref().map(fmt_amount).unwrap_or_default(),
                if first { fmt_amount(&day.net) } else { String::new() },
            ]);
            first = false;
        }
        if day.overflow > 0 {
            rows.push(vec![
                String::new(),
                String::new(),
                String::new(),
                format!("(+{} more)", day.overflow),
                String::new(),
                String::new(),
            ]);
        }
    }
    println!(
        "{}",
        pretty_table(&["Date", "Entry", "Type", "Title", "Amount", "Net"], rows)
    );
    Ok(())
}
