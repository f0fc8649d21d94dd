// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{Datelike, Local};
use rusqlite::Connection;

use crate::models::RuleMode;
use crate::recurring::{self, RuleInput};
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, parse_period, pretty_table};

pub fn handle(conn: &mut Connection, owner: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, owner, sub)?,
        Some(("list", sub)) => list(conn, owner, sub)?,
        Some(("rm", sub)) => rm(conn, owner, sub)?,
        Some(("run", sub)) => run(conn, owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_period(sub.get_one::<String>("start").unwrap().trim())?;
    let end = sub
        .get_one::<String>("end")
        .map(|s| parse_period(s.trim()))
        .transpose()?
        .map(|p| (p.year, p.month));
    let mode = if sub.get_flag("auto-confirm") {
        RuleMode::AutoConfirm
    } else {
        RuleMode::Pending
    };
    let input = RuleInput {
        account_id: sub.get_one::<String>("account").unwrap().trim().parse()?,
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?,
        day_of_month: sub.get_one::<String>("day").unwrap().trim().parse()?,
        start_year: start.year,
        start_month: start.month,
        end,
        mode,
        active: true,
    };
    let rule = recurring::create_rule(conn, owner, &input)?;
    println!(
        "Added rule {}: {} on day {} from {}-{:02} ({})",
        rule.id,
        fmt_money(&rule.amount),
        rule.day_of_month,
        rule.start_year,
        rule.start_month,
        rule.mode.as_str()
    );
    Ok(())
}

fn list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let rules = recurring::list_rules(conn, owner)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rules)? {
        let rows = rules
            .into_iter()
            .map(|r| {
                let end = match (r.end_year, r.end_month) {
                    (Some(y), Some(m)) => format!("{}-{:02}", y, m),
                    _ => String::new(),
                };
                vec![
                    r.id.to_string(),
                    r.account_id.to_string(),
                    fmt_money(&r.amount),
                    r.day_of_month.to_string(),
                    format!("{}-{:02}", r.start_year, r.start_month),
                    end,
                    r.mode.as_str().to_string(),
                    if r.active { "yes" } else { "no" }.to_string(),
                    r.last_generated_at.unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Account", "Amount", "Day", "Start", "End", "Mode", "Active", "Last Run"],
                rows
            )
        );
    }
    Ok(())
}

fn rm(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub.get_one::<String>("id").unwrap().trim().parse()?;
    recurring::delete_rule(conn, owner, id)?;
    println!("Removed rule {}", id);
    Ok(())
}

fn run(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    // The core takes the reference month as data; the clock read stays out
    // here at the edge.
    let (year, month) = match sub.get_one::<String>("as-of") {
        Some(raw) => {
            let p = parse_period(raw.trim())?;
            (p.year, p.month)
        }
        None => {
            let today = Local::now().date_naive();
            (today.year(), today.month())
        }
    };
    let report = recurring::generate_missing(conn, owner, year, month)?;
    println!(
        "Generated {} deposits ({} already present) up to {}-{:02}",
        report.created, report.skipped, year, month
    );
    Ok(())
}
