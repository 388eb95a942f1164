// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::ledger::{self, Overdraft};
use crate::models::TxKind;
use crate::utils::{current_owner, parse_date, parse_decimal};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::collections::{hash_map::Entry, HashMap};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => import_transactions(conn, sub),
        _ => Ok(()),
    }
}

/// CSV columns: date, description, amount (signed: negative = expense),
/// category (optional), source. The whole file lands atomically, and every
/// row is applied to its source balance, so an import can never leave a
/// running total out of step with history. Overdraft is allowed: imported
/// history already happened.
fn import_transactions(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let tx = conn.transaction()?;
    let mut source_cache: HashMap<String, i64> = HashMap::new();
    let mut category_cache: HashMap<String, (i64, TxKind)> = HashMap::new();
    let mut imported = 0usize;

    for result in rdr.records() {
        let rec = result?;
        let date_raw = rec.get(0).context("date missing")?.trim().to_string();
        let description = rec.get(1).context("description missing")?.trim().to_string();
        let amount_raw = rec.get(2).context("amount missing")?.trim().to_string();
        let category = rec.get(3).unwrap_or("").trim().to_string();
        let source = rec.get(4).context("source missing")?.trim().to_string();

        let date = parse_date(&date_raw)
            .with_context(|| format!("Invalid transaction date '{}'", date_raw))?;
        let signed = parse_decimal(&amount_raw)
            .with_context(|| format!("Invalid amount '{}' for {}", amount_raw, description))?;
        if signed.is_zero() {
            return Err(anyhow!("Zero amount for '{}' on {}", description, date));
        }
        let kind = if signed < Decimal::ZERO {
            TxKind::Expense
        } else {
            TxKind::Income
        };
        let magnitude = signed.abs();

        let source_id = match source_cache.entry(source.clone()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id: i64 = tx
                    .query_row(
                        "SELECT id FROM sources WHERE owner=?1 AND name=?2",
                        params![&owner, &source],
                        |r| r.get(0),
                    )
                    .with_context(|| format!("Source '{}' not found", source))?;
                *entry.insert(id)
            }
        };
        let category_id = if category.is_empty() {
            None
        } else {
            let (id, cat_kind) = match category_cache.entry(category.clone()) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    let fetched: (i64, String) = tx
                        .query_row(
                            "SELECT id, kind FROM categories WHERE owner=?1 AND name=?2",
                            params![&owner, &category],
                            |r| Ok((r.get(0)?, r.get(1)?)),
                        )
                        .with_context(|| format!("Category '{}' not found", category))?;
                    let kind: TxKind = fetched.1.parse().map_err(anyhow::Error::msg)?;
                    *entry.insert((fetched.0, kind))
                }
            };
            if cat_kind != kind {
                return Err(anyhow!(
                    "Amount '{}' is {} but category '{}' is {}",
                    amount_raw,
                    kind,
                    category,
                    cat_kind
                ));
            }
            Some(id)
        };

        ledger::apply(&tx, &owner, source_id, signed, Overdraft::Allow)?;
        tx.execute(
            "INSERT INTO transactions(owner, date, amount, kind, description, category_id, source_id, provenance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'manual')",
            params![
                &owner,
                date.to_string(),
                magnitude.to_string(),
                kind.to_string(),
                description,
                category_id,
                source_id,
            ],
        )?;
        imported += 1;
    }
    tx.commit()?;
    println!("Imported {} transaction(s) from {}", imported, path);
    Ok(())
}
