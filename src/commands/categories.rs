// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::TxKind;
use crate::utils::{current_owner, maybe_print_json, pretty_table};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Serialize)]
struct CategoryRow {
    name: String,
    kind: String,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let owner = current_owner(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let kind: TxKind = sub
                .get_one::<String>("kind")
                .unwrap()
                .parse()
                .map_err(anyhow::Error::msg)?;
            conn.execute(
                "INSERT INTO categories(owner, name, kind) VALUES (?1, ?2, ?3)",
                params![owner, name, kind.to_string()],
            )?;
            println!("Added {} category '{}'", kind, name);
        }
        Some(("list", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let mut stmt =
                conn.prepare("SELECT name, kind FROM categories WHERE owner=?1 ORDER BY name")?;
            let rows = stmt.query_map(params![owner], |r| {
                Ok(CategoryRow {
                    name: r.get(0)?,
                    kind: r.get(1)?,
                })
            })?;
            let mut data = Vec::new();
            for row in rows {
                data.push(row?);
            }
            if !maybe_print_json(json_flag, jsonl_flag, &data)? {
                let rows: Vec<Vec<String>> = data
                    .iter()
                    .map(|c| vec![c.name.clone(), c.kind.clone()])
                    .collect();
                println!("{}", pretty_table(&["Category", "Kind"], rows));
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let affected = conn.execute(
                "DELETE FROM categories WHERE owner=?1 AND name=?2",
                params![owner, name],
            )?;
            if affected == 0 {
                return Err(anyhow!("Category '{}' not found", name));
            }
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
