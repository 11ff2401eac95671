// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON document per line"),
    )
}

fn filter_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("bank")
            .long("bank")
            .short('b')
            .action(ArgAction::Append)
            .help("Bank code; repeat or comma-separate, 'all' for every bank (default)"),
    )
    .arg(
        Arg::new("period")
            .long("period")
            .short('p')
            .default_value("current-month")
            .help("current-month, previous-month, month-before-previous, previous-N-months, YYYY-MM-DD..YYYY-MM-DD, or all"),
    )
}

pub fn build_cli() -> Command {
    Command::new("ledgerlens")
        .about("Track bank transactions and summarize income, spending and balances")
        .version(crate_version!())
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("bank")
                .about("Manage connected banks")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("id").long("id").required(true).help("Bank code, e.g. hdfc"))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("account").long("account").help("Masked account number")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("rm")
                        .about("Remove a bank and all of its transactions")
                        .arg(Arg::new("id").long("id").required(true)),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Ingest transactions")
                .subcommand(
                    Command::new("transactions")
                        .about("Import a <bank>Transaction.json upload")
                        .arg(Arg::new("path").long("path").required(true))
                        .arg(Arg::new("name").long("name").help("Bank display name"))
                        .arg(Arg::new("account").long("account").help("Masked account number")),
                )
                .subcommand(Command::new("demo").about("Load the demo dataset")),
        )
        .subcommand(
            Command::new("tx").about("Transactions").subcommand(json_flags(filter_args(
                Command::new("list").arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize)),
                ),
            ))),
        )
        .subcommand(
            Command::new("report")
                .about("Aggregated views")
                .subcommand(json_flags(filter_args(Command::new("summary"))))
                .subcommand(json_flags(filter_args(Command::new("banks"))))
                .subcommand(json_flags(filter_args(Command::new("categories"))))
                .subcommand(json_flags(filter_args(Command::new("monthly")))),
        )
        .subcommand(json_flags(
            Command::new("extract")
                .about("Parse a bank notification snippet")
                .arg(Arg::new("text").long("text").required(true))
                .arg(
                    Arg::new("no-llm")
                        .long("no-llm")
                        .action(ArgAction::SetTrue)
                        .help("Use cached categories only"),
                ),
        ))
        .subcommand(
            Command::new("inbox")
                .about("Queue of notification snippets awaiting ingestion")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("bank").long("bank").required(true))
                        .arg(Arg::new("text").long("text").required(true))
                        .arg(
                            Arg::new("received")
                                .long("received")
                                .help("YYYY-MM-DD, defaults to today"),
                        ),
                )
                .subcommand(json_flags(Command::new("list").arg(
                    Arg::new("status").long("status").help("pending, processed, skipped, failed"),
                )))
                .subcommand(
                    Command::new("process")
                        .arg(Arg::new("no-llm").long("no-llm").action(ArgAction::SetTrue))
                        .arg(
                            Arg::new("max-attempts")
                                .long("max-attempts")
                                .value_parser(value_parser!(u32))
                                .default_value("3"),
                        ),
                ),
        )
        .subcommand(
            Command::new("merchant")
                .about("Merchant category cache")
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("merchant").long("merchant").required(true))
                        .arg(Arg::new("category").long("category").required(true)),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Settings")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").long("key").required(true))
                        .arg(Arg::new("value").long("value").required(true)),
                )
                .subcommand(Command::new("get").arg(Arg::new("key").long("key").required(true)))
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("export")
                .about("Export transactions")
                .subcommand(filter_args(
                    Command::new("transactions")
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                )),
        )
}
