// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use cashplan::{cli, commands, db, utils};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("user", sub)) => match sub.subcommand() {
            Some(("set", s)) => {
                let name = s.get_one::<String>("name").unwrap();
                utils::set_owner(&conn, name)?;
                println!("Active owner set to '{}'", name);
            }
            _ => println!("{}", utils::current_owner(&conn)?),
        },
        Some(("source", sub)) => commands::sources::handle(&conn, sub)?,
        Some(("category", sub)) => commands::categories::handle(&conn, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut conn, sub)?,
        Some(("event", sub)) => commands::events::handle(&mut conn, sub)?,
        Some(("calendar", sub)) => commands::calendar::handle(&conn, sub)?,
        Some(("predict", sub)) => commands::predictions::handle(&mut conn, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, sub)?,
        Some(("import", sub)) => commands::importer::handle(&mut conn, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
