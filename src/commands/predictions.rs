// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::events::{self, NewEvent};
use crate::engine::ledger::Overdraft;
use crate::engine::predictions;
use crate::models::EventKind;
use crate::utils::{
    current_owner, id_for_category, id_for_source, maybe_print_json, pretty_table,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    match m.subcommand() {
        Some(("list", sub)) => list(conn, &owner, sub)?,
        Some(("accept", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let overdraft = if sub.get_flag("allow-overdraft") {
                Overdraft::Allow
            } else {
                Overdraft::Deny
            };
            let tx = predictions::accept(conn, &owner, id, overdraft)?;
            println!(
                "Confirmed prediction {} into transaction {}: {} {} on {}",
                id, tx.id, tx.kind, tx.amount, tx.date
            );
        }
        Some(("dismiss", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            predictions::dismiss(conn, &owner, id)?;
            println!("Dismissed prediction {}", id);
        }
        Some(("ingest", sub)) => ingest(conn, &owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let proposals = predictions::list_proposed(conn, owner)?;
    if !maybe_print_json(json_flag, jsonl_flag, &proposals)? {
        let rows: Vec<Vec<String>> = proposals
            .iter()
            .map(|p| {
                vec![
                    p.id.to_string(),
                    p.start_date.to_string(),
                    p.title.clone(),
                    p.amount.map(|a| format!("{:.2}", a)).unwrap_or_default(),
                    p.confidence.map(|c| c.to_string()).unwrap_or_default(),
                    p.pattern.clone().unwrap_or_default(),
                    p.generator.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Title", "Amount", "Confidence", "Pattern", "Generator"],
                rows,
            )
        );
    }
    Ok(())
}

/// One proposed bill as emitted by the bill-prediction generator.
#[derive(Deserialize)]
struct ProposedBill {
    title: String,
    #[serde(default)]
    description: Option<String>,
    amount: Decimal,
    date: NaiveDate,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    confidence: Option<Decimal>,
    #[serde(default)]
    pattern: Option<String>,
    generator: String,
}

fn ingest(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let content =
        fs::read_to_string(path).with_context(|| format!("Open proposals file {}", path))?;

    let mut ingested = 0usize;
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bill: ProposedBill = serde_json::from_str(line)
            .with_context(|| format!("Invalid proposal on line {}", lineno + 1))?;
        let category_id = bill
            .category
            .as_deref()
            .map(|c| id_for_category(conn, owner, c))
            .transpose()?;
        let source_id = bill
            .source
            .as_deref()
            .map(|s| id_for_source(conn, owner, s))
            .transpose()?;
        events::create_event(
            conn,
            owner,
            NewEvent {
                title: bill.title,
                description: bill.description,
                kind: EventKind::Prediction,
                amount: Some(bill.amount),
                start_date: bill.date,
                is_recurring: false,
                frequency: None,
                recurrence_count: None,
                end_date: None,
                category_id,
                source_id,
                confidence: bill.confidence,
                pattern: bill.pattern,
                generator: Some(bill.generator),
            },
        )?;
        ingested += 1;
    }
    println!("Ingested {} proposed bill(s) from {}", ingested, path);
    Ok(())
}
