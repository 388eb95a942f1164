// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Source, SourceKind, SourceStatus};
use crate::utils::{current_owner, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => add(conn, &owner, sub)?,
        Some(("list", sub)) => list(conn, &owner, sub)?,
        Some(("lock", sub)) => set_status(conn, &owner, sub, SourceStatus::Locked)?,
        Some(("unlock", sub)) => set_status(conn, &owner, sub, SourceStatus::Available)?,
        Some(("rm", sub)) => rm(conn, &owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let kind: SourceKind = sub
        .get_one::<String>("kind")
        .unwrap()
        .parse()
        .map_err(anyhow::Error::msg)?;
    let balance = parse_decimal(sub.get_one::<String>("balance").unwrap())?;
    let interest_rate = sub
        .get_one::<String>("interest-rate")
        .map(|s| parse_decimal(s))
        .transpose()?;
    let interest_period = sub.get_one::<String>("interest-period").cloned();
    let transfer_latency = sub.get_one::<String>("transfer-latency").cloned();

    // The only place balance is written without the ledger: creation.
    conn.execute(
        "INSERT INTO sources(owner, name, kind, balance, opening_balance, interest_rate, interest_period, transfer_latency)
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7)",
        params![
            owner,
            name,
            kind.to_string(),
            balance.to_string(),
            interest_rate.map(|r| r.to_string()),
            interest_period,
            transfer_latency
        ],
    )?;
    println!("Added source '{}' ({}, opening balance {})", name, kind, balance);
    Ok(())
}

fn list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut stmt = conn.prepare(
        "SELECT id, owner, name, kind, balance, opening_balance, status, interest_rate, interest_period, transfer_latency
         FROM sources WHERE owner=?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, Option<String>>(7)?,
            r.get::<_, Option<String>>(8)?,
            r.get::<_, Option<String>>(9)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (id, owner, name, kind, balance, opening, status, rate, period, latency) = row?;
        data.push(Source {
            id,
            owner,
            name,
            kind: kind.parse().map_err(anyhow::Error::msg)?,
            balance: parse_decimal(&balance)?,
            opening_balance: parse_decimal(&opening)?,
            status: status.parse().map_err(anyhow::Error::msg)?,
            interest_rate: rate.as_deref().map(parse_decimal).transpose()?,
            interest_period: period,
            transfer_latency: latency,
        });
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|s| {
                vec![
                    s.name.clone(),
                    s.kind.to_string(),
                    format!("{:.2}", s.balance),
                    s.status.to_string(),
                    s.interest_rate
                        .map(|r| r.to_string())
                        .unwrap_or_default(),
                    s.transfer_latency.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Name", "Kind", "Balance", "Status", "Rate", "Latency"],
                rows
            )
        );
    }
    Ok(())
}

fn set_status(
    conn: &Connection,
    owner: &str,
    sub: &clap::ArgMatches,
    status: SourceStatus,
) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let affected = conn.execute(
        "UPDATE sources SET status=?1 WHERE owner=?2 AND name=?3",
        params![status.to_string(), owner, name],
    )?;
    if affected == 0 {
        return Err(anyhow!("Source '{}' not found", name));
    }
    println!("Source '{}' is now {}", name, status);
    Ok(())
}

fn rm(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let referenced: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions t JOIN sources s ON t.source_id=s.id
         WHERE s.owner=?1 AND s.name=?2",
        params![owner, name],
        |r| r.get(0),
    )?;
    if referenced > 0 {
        return Err(anyhow!(
            "Source '{}' has {} transaction(s); lock it instead of removing it",
            name,
            referenced
        ));
    }
    let affected = conn.execute(
        "DELETE FROM sources WHERE owner=?1 AND name=?2",
        params![owner, name],
    )?;
    if affected == 0 {
        return Err(anyhow!("Source '{}' not found", name));
    }
    println!("Removed source '{}'", name);
    Ok(())
}
