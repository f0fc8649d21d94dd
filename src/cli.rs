// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{arg, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Emit pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Emit one JSON object per line"),
    )
}

pub fn build_cli() -> Command {
    Command::new("finledger")
        .about("Personal-finance ledger: investments, savings, recurring deposits")
        .version(clap::crate_version!())
        .arg(
            Arg::new("profile")
                .long("profile")
                .global(true)
                .default_value("default")
                .help("Owner profile all operations are scoped to"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("asset")
                .about("Investment assets")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--symbol <SYMBOL>).required(true))
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(arg!(--kind <KIND>).required(true).help("stock|etf|crypto|gold")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(arg!(--id <ID>).required(true))),
        )
        .subcommand(
            Command::new("invest")
                .about("Investment transactions")
                .subcommand(trade_args(Command::new("buy")))
                .subcommand(trade_args(Command::new("sell")))
                .subcommand(
                    Command::new("dividend")
                        .arg(arg!(--asset <ID>).required(true))
                        .arg(arg!(--units <UNITS>).required(true))
                        .arg(arg!(--price <PRICE>).required(true))
                        .arg(arg!(--total <TOTAL>).required(true))
                        .arg(arg!(--period <PERIOD>).required(true).help("YYYY-MM or YYYY-MM-DD"))
                        .arg(arg!(--notes <NOTES>).required(false)),
                )
                .subcommand(json_flags(
                    Command::new("list").arg(arg!(--asset <ID>).required(true)),
                ))
                .subcommand(Command::new("rm").arg(arg!(--id <ID>).required(true)))
                .subcommand(
                    Command::new("note")
                        .arg(arg!(--id <ID>).required(true))
                        .arg(arg!(--notes <NOTES>).required(false)),
                ),
        )
        .subcommand(
            Command::new("savings")
                .about("Savings accounts")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(arg!(--start <AMOUNT>).required(false).help("Starting balance"))
                        .arg(arg!(--goal <AMOUNT>).required(false))
                        .arg(arg!(--rate <RATE>).required(false).help("Nominal annual rate, display only"))
                        .arg(arg!(--target <AMOUNT>).required(false).help("Monthly contribution target, display only")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("update")
                        .arg(arg!(--id <ID>).required(true))
                        .arg(arg!(--start <AMOUNT>).required(false))
                        .arg(arg!(--goal <AMOUNT>).required(false))
                        .arg(arg!(--rate <RATE>).required(false))
                        .arg(arg!(--target <AMOUNT>).required(false))
                        .arg(
                            Arg::new("clear-goal")
                                .long("clear-goal")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("goal"),
                        )
                        .arg(
                            Arg::new("clear-rate")
                                .long("clear-rate")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("rate"),
                        )
                        .arg(
                            Arg::new("clear-target")
                                .long("clear-target")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("target"),
                        ),
                )
                .subcommand(Command::new("rm").arg(arg!(--id <ID>).required(true)))
                .subcommand(
                    Command::new("tx")
                        .about("Savings transactions")
                        .subcommand(
                            Command::new("add")
                                .arg(arg!(--account <ID>).required(true))
                                .arg(arg!(--kind <KIND>).required(true).help("capital_add|dividend|withdrawal"))
                                .arg(arg!(--amount <AMOUNT>).required(true))
                                .arg(arg!(--period <PERIOD>).required(true).help("YYYY-MM or YYYY-MM-DD"))
                                .arg(arg!(--status <STATUS>).required(false).help("pending|completed, default completed"))
                                .arg(arg!(--notes <NOTES>).required(false)),
                        )
                        .subcommand(json_flags(
                            Command::new("list").arg(arg!(--account <ID>).required(true)),
                        ))
                        .subcommand(Command::new("complete").arg(arg!(--id <ID>).required(true)))
                        .subcommand(Command::new("rm").arg(arg!(--id <ID>).required(true))),
                ),
        )
        .subcommand(
            Command::new("recurring")
                .about("Recurring deposit rules")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--account <ID>).required(true))
                        .arg(arg!(--amount <AMOUNT>).required(true))
                        .arg(arg!(--day <DAY>).required(true).help("Day of month, 1-28"))
                        .arg(arg!(--start <PERIOD>).required(true).help("YYYY-MM"))
                        .arg(arg!(--end <PERIOD>).required(false).help("YYYY-MM"))
                        .arg(
                            Arg::new("auto-confirm")
                                .long("auto-confirm")
                                .action(ArgAction::SetTrue)
                                .help("Generated deposits land as completed instead of pending"),
                        ),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(arg!(--id <ID>).required(true)))
                .subcommand(
                    Command::new("run")
                        .about("Generate missing deposits for all active rules")
                        .arg(arg!(--"as-of" <PERIOD>).required(false).help("Reference month, default today")),
                ),
        )
        .subcommand(
            Command::new("doctor")
                .about("Refold every aggregate and report drift")
                .arg(
                    Arg::new("fix")
                        .long("fix")
                        .action(ArgAction::SetTrue)
                        .help("Rewrite stored aggregates that drifted"),
                ),
        )
}

fn trade_args(cmd: Command) -> Command {
    cmd.arg(arg!(--asset <ID>).required(true))
        .arg(arg!(--units <UNITS>).required(true))
        .arg(arg!(--price <PRICE>).required(true))
        .arg(arg!(--total <TOTAL>).required(true))
        .arg(arg!(--period <PERIOD>).required(true).help("YYYY-MM or YYYY-MM-DD"))
        .arg(arg!(--notes <NOTES>).required(false))
}
