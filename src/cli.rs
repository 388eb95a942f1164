// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{crate_version, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

pub fn build_cli() -> Command {
    Command::new("cashplan")
        .version(crate_version!())
        .about("Personal finance ledger, calendar timeline, and predicted-bill lifecycle")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("user")
                .about("Show or set the active owner")
                .subcommand(
                    Command::new("set")
                        .about("Set the active owner")
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(Command::new("show").about("Show the active owner")),
        )
        .subcommand(
            Command::new("source")
                .about("Manage funding sources")
                .subcommand(
                    Command::new("add")
                        .about("Add a funding source")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .default_value("bank")
                                .help("bank|ewallet|cash|other"),
                        )
                        .arg(
                            Arg::new("balance")
                                .long("balance")
                                .default_value("0")
                                .help("Opening balance"),
                        )
                        .arg(Arg::new("interest-rate").long("interest-rate"))
                        .arg(Arg::new("interest-period").long("interest-period"))
                        .arg(Arg::new("transfer-latency").long("transfer-latency")),
                )
                .subcommand(json_flags(
                    Command::new("list").about("List funding sources"),
                ))
                .subcommand(
                    Command::new("lock")
                        .about("Soft-lock a source against new postings")
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(
                    Command::new("unlock")
                        .about("Re-open a locked source")
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Remove a source with no transaction history")
                        .arg(Arg::new("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add")
                        .about("Add a category")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .help("expense|income"),
                        ),
                )
                .subcommand(json_flags(Command::new("list").about("List categories")))
                .subcommand(
                    Command::new("rm")
                        .about("Remove a category")
                        .arg(Arg::new("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Post and manage ledger transactions")
                .subcommand(
                    Command::new("add")
                        .about("Post a transaction")
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .help("Positive magnitude"),
                        )
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .help("expense|income"),
                        )
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(Arg::new("source").long("source").required(true))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("allow-overdraft")
                                .long("allow-overdraft")
                                .action(ArgAction::SetTrue)
                                .help("Let an expense drive the balance negative"),
                        ),
                )
                .subcommand(
                    Command::new("edit")
                        .about("Edit a transaction; balance moves only if amount, kind or source change")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        )
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("kind").long("kind"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("source").long("source"))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("clear-category")
                                .long("clear-category")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("allow-overdraft")
                                .long("allow-overdraft")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete a transaction and reverse its posting")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List transactions")
                        .arg(Arg::new("month").long("month").help("YYYY-MM"))
                        .arg(Arg::new("source").long("source"))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(clap::value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("event")
                .about("Manage calendar events")
                .subcommand(
                    Command::new("add")
                        .about("Create a calendar event")
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .help("expense|income|reminder"),
                        )
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("source").long("source"))
                        .arg(
                            Arg::new("repeat")
                                .long("repeat")
                                .help("daily|weekly|bi-weekly|monthly|quarterly|yearly"),
                        )
                        .arg(
                            Arg::new("count")
                                .long("count")
                                .value_parser(clap::value_parser!(u32))
                                .help("Stop after this many occurrences"),
                        )
                        .arg(
                            Arg::new("until")
                                .long("until")
                                .help("Last admissible date (inclusive)"),
                        ),
                )
                .subcommand(
                    Command::new("edit")
                        .about("Edit a calendar event")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        )
                        .arg(Arg::new("title").long("title"))
                        .arg(Arg::new("kind").long("kind"))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("source").long("source"))
                        .arg(Arg::new("repeat").long("repeat"))
                        .arg(
                            Arg::new("count")
                                .long("count")
                                .value_parser(clap::value_parser!(u32)),
                        )
                        .arg(Arg::new("until").long("until"))
                        .arg(
                            Arg::new("no-repeat")
                                .long("no-repeat")
                                .action(ArgAction::SetTrue)
                                .help("Drop the recurrence entirely"),
                        ),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete a calendar event")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List calendar events")
                        .arg(Arg::new("from").long("from"))
                        .arg(Arg::new("to").long("to")),
                )),
        )
        .subcommand(
            Command::new("calendar")
                .about("Reconciled calendar timeline")
                .subcommand(json_flags(
                    Command::new("view")
                        .about("Merged day-by-day view over [from, to)")
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                )),
        )
        .subcommand(
            Command::new("predict")
                .about("Predicted-bill lifecycle")
                .subcommand(json_flags(
                    Command::new("list").about("List proposed predictions"),
                ))
                .subcommand(
                    Command::new("accept")
                        .about("Confirm a prediction into a posted transaction")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("allow-overdraft")
                                .long("allow-overdraft")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("dismiss")
                        .about("Dismiss a prediction")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("ingest")
                        .about("Load generator proposals from a JSONL file")
                        .arg(Arg::new("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Reports")
                .subcommand(json_flags(
                    Command::new("balances").about("Current source balances"),
                ))
                .subcommand(json_flags(
                    Command::new("cashflow")
                        .about("Monthly income/expense/net")
                        .arg(
                            Arg::new("months")
                                .long("months")
                                .value_parser(clap::value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("import")
                .about("Import data")
                .subcommand(
                    Command::new("transactions")
                        .about("Import transactions from CSV, posting each through the ledger")
                        .arg(Arg::new("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("transactions")
                        .about("Export transactions")
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(
                    Command::new("events")
                        .about("Export calendar events")
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(Command::new("doctor").about("Check stored balances against transaction history"))
}
