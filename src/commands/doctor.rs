// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Balance drift: the running total must equal the opening balance
    //    plus every signed posting still alive. Drift means something
    //    mutated a balance behind the ledger's back.
    let mut stmt = conn.prepare(
        "SELECT s.id, s.owner, s.name, s.balance, s.opening_balance
         FROM sources s ORDER BY s.owner, s.name",
    )?;
    let sources = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;
    for src in sources {
        let (id, owner, name, balance_s, opening_s) = src?;
        let stored = balance_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid balance '{}' for source {}", balance_s, name))?;
        let mut recomputed = opening_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid opening balance for source {}", name))?;

        let mut tstmt =
            conn.prepare("SELECT amount, kind FROM transactions WHERE source_id=?1")?;
        let mut cur = tstmt.query([id])?;
        while let Some(r) = cur.next()? {
            let amount_s: String = r.get(0)?;
            let kind: String = r.get(1)?;
            let amount = amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in transactions", amount_s))?;
            if kind == "income" {
                recomputed += amount;
            } else {
                recomputed -= amount;
            }
        }
        if recomputed != stored {
            rows.push(vec![
                "balance_drift".into(),
                format!(
                    "{}/{}: stored {} vs recomputed {}",
                    owner, name, stored, recomputed
                ),
            ]);
        }
    }

    // 2) Recurring events missing a frequency (rejected at write time;
    //    anything here predates that check or was tampered with).
    let mut stmt2 = conn.prepare(
        "SELECT id, owner, title FROM events WHERE is_recurring=1 AND frequency IS NULL",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let id: i64 = r.get(0)?;
        let owner: String = r.get(1)?;
        let title: String = r.get(2)?;
        rows.push(vec![
            "recurring_no_frequency".into(),
            format!("event {} ({}/{})", id, owner, title),
        ]);
    }

    // 3) Prediction hygiene: generator tag missing, or confidence outside [0,1].
    let mut stmt3 = conn.prepare(
        "SELECT id, owner, generator, confidence FROM events WHERE kind='prediction'",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let id: i64 = r.get(0)?;
        let owner: String = r.get(1)?;
        let generator: Option<String> = r.get(2)?;
        let confidence: Option<String> = r.get(3)?;
        if generator.as_deref().map_or(true, |g| g.trim().is_empty()) {
            rows.push(vec![
                "prediction_no_generator".into(),
                format!("event {} ({})", id, owner),
            ]);
        }
        if let Some(c) = confidence {
            let parsed = c.parse::<Decimal>().ok();
            match parsed {
                Some(v) if v >= Decimal::ZERO && v <= Decimal::ONE => {}
                _ => rows.push(vec![
                    "prediction_bad_confidence".into(),
                    format!("event {} ({}): '{}'", id, owner, c),
                ]),
            }
        }
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
