// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::ledger::{self, NewTransaction, Overdraft, TransactionPatch};
use crate::models::{Provenance, TxKind};
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
        Some(("rm", sub)) => rm(conn, &owner, sub)?,
        Some(("list", sub)) => list(conn, &owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn overdraft_flag(sub: &clap::ArgMatches) -> Overdraft {
    if sub.get_flag("allow-overdraft") {
        Overdraft::Allow
    } else {
        Overdraft::Deny
    }
}

fn add(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let kind: TxKind = sub
        .get_one::<String>("kind")
        .unwrap()
        .parse()
        .map_err(anyhow::Error::msg)?;
    let description = sub.get_one::<String>("description").unwrap().to_string();
    let source_name = sub.get_one::<String>("source").unwrap();
    let source_id = id_for_source(conn, owner, source_name)?;
    let category_id = sub
        .get_one::<String>("category")
        .map(|c| id_for_category(conn, owner, c))
        .transpose()?;
    let overdraft = overdraft_flag(sub);

    // Advisory check; the authoritative one happens at commit inside apply.
    if kind == TxKind::Expense
        && overdraft == Overdraft::Allow
        && !ledger::can_afford(conn, owner, source_id, amount)?
    {
        println!(
            "Warning: '{}' cannot cover {}, balance will go negative",
            source_name, amount
        );
    }

    let tx = ledger::post_transaction(
        conn,
        owner,
        NewTransaction {
            date,
            amount,
            kind,
            description,
            category_id,
            source_id,
            provenance: Provenance::Manual,
        },
        overdraft,
    )?;
    println!(
        "Recorded {} {} on {} '{}' (source: {})",
        tx.kind, tx.amount, tx.date, tx.description, source_name
    );
    Ok(())
}

fn edit(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let patch = TransactionPatch {
        date: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        kind: sub
            .get_one::<String>("kind")
            .map(|s| s.parse().map_err(anyhow::Error::msg))
            .transpose()?,
        description: sub.get_one::<String>("description").cloned(),
        category_id: if sub.get_flag("clear-category") {
            Some(None)
        } else {
            sub.get_one::<String>("category")
                .map(|c| id_for_category(conn, owner, c).map(Some))
                .transpose()?
        },
        source_id: sub
            .get_one::<String>("source")
            .map(|s| id_for_source(conn, owner, s))
            .transpose()?,
    };
    let tx = ledger::edit_transaction(conn, owner, id, patch, overdraft_flag(sub))?;
    println!(
        "Updated transaction {}: {} {} on {} '{}'",
        tx.id, tx.kind, tx.amount, tx.date, tx.description
    );
    Ok(())
}

fn rm(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    ledger::delete_transaction(conn, owner, id)?;
    println!("Deleted transaction {} and reversed its posting", id);
    Ok(())
}

fn list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, owner, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.description.clone(),
                    r.category.clone(),
                    r.source.clone(),
                    r.provenance.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "Id",
                    "Date",
                    "Kind",
                    "Amount",
                    "Description",
                    "Category",
                    "Source",
                    "Provenance"
                ],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub kind: String,
    pub amount: String,
    pub description: String,
    pub category: String,
    pub source: String,
    pub provenance: String,
}

pub fn query_rows(
    conn: &Connection,
    owner: &str,
    sub: &clap::ArgMatches,
) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.kind, t.amount, t.description, c.name, s.name, t.provenance
         FROM transactions t
         LEFT JOIN sources s ON t.source_id=s.id
         LEFT JOIN categories c ON t.category_id=c.id
         WHERE t.owner=?",
    );
    let mut params_vec: Vec<String> = vec![owner.to_string()];

    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(t.date,1,7)=?");
        params_vec.push(month.into());
    }
    if let Some(source) = sub.get_one::<String>("source") {
        sql.push_str(" AND s.name=?");
        params_vec.push(source.into());
    }
    if let Some(category) = sub.get_one::<String>("category") {
        sql.push_str(" AND c.name=?");
        params_vec.push(category.into());
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let date: String = r.get(1)?;
        let kind: String = r.get(2)?;
        let amount: String = r.get(3)?;
        let description: String = r.get(4)?;
        let category: Option<String> = r.get(5)?;
        let source: Option<String> = r.get(6)?;
        let provenance: String = r.get(7)?;
        data.push(TransactionRow {
            id,
            date,
            kind,
            amount,
            description,
            category: category.unwrap_or_default(),
            source: source.unwrap_or_default(),
            provenance,
        });
    }
    Ok(data)
}
