// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{current_owner, maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("balances", sub)) => balances(conn, sub)?,
        Some(("cashflow", sub)) => cashflow(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// The materialized running totals, exactly as the ledger maintains them.
/// `doctor` is the place that cross-checks them against history.
fn balances(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut stmt = conn.prepare(
        "SELECT name, kind, balance, status FROM sources WHERE owner=?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (name, kind, balance, status) = row?;
        let bal = balance
            .parse::<Decimal>()
            .with_context(|| format!("Invalid balance '{}' for source {}", balance, name))?;
        data.push(vec![name, kind, format!("{:.2}", bal), status]);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(&["Source", "Kind", "Balance", "Status"], data)
        );
    }
    Ok(())
}

fn cashflow(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let months: usize = *sub.get_one::<usize>("months").unwrap_or(&12);

    let mut stmt = conn.prepare(
        "SELECT substr(date,1,7) AS month, amount, kind
         FROM transactions WHERE owner=?1
         ORDER BY date DESC",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;

    use std::collections::BTreeMap;
    let mut map: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for row in rows {
        let (month, amount, kind) = row?;
        let amt = amount
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in {}", amount, month))?;
        let entry = map.entry(month).or_insert((Decimal::ZERO, Decimal::ZERO));
        if kind == "income" {
            entry.0 += amt;
        } else {
            entry.1 += amt;
        }
    }
    let mut data = Vec::new();
    for (month, (income, expense)) in map.iter().rev().take(months) {
        data.push(vec![
            month.clone(),
            format!("{:.2}", income),
            format!("{:.2}", expense),
            format!("{:.2}", income - expense),
        ]);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(&["Month", "Income", "Expense", "Net"], data)
        );
    }
    Ok(())
}
