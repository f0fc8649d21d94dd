// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::models::{SavingsTxKind, TxSource, TxStatus};
use crate::savings::{self, SavingsAccountPatch, SavingsTxInput};
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, parse_period, pretty_table};

pub fn handle(conn: &mut Connection, owner: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, owner, sub)?,
        Some(("list", sub)) => list(conn, owner, sub)?,
        Some(("update", sub)) => update(conn, owner, sub)?,
        Some(("rm", sub)) => rm(conn, owner, sub)?,
        Some(("tx", sub)) => tx(conn, owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn opt_decimal(sub: &clap::ArgMatches, key: &str) -> Result<Option<Decimal>> {
    sub.get_one::<String>(key)
        .map(|s| parse_decimal(s.trim()))
        .transpose()
}

fn add(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let starting = opt_decimal(sub, "start")?.unwrap_or(Decimal::ZERO);
    let account = savings::create_account(
        conn,
        owner,
        &name,
        starting,
        opt_decimal(sub, "goal")?,
        opt_decimal(sub, "rate")?,
        opt_decimal(sub, "target")?,
    )?;
    println!(
        "Added savings account '{}' with balance {}",
        account.name,
        fmt_money(&account.balance_display())
    );
    Ok(())
}

fn list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let accounts = savings::list_accounts(conn, owner)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &accounts)? {
        let rows = accounts
            .into_iter()
            .map(|a| {
                vec![
                    a.id.to_string(),
                    a.name.clone(),
                    fmt_money(&a.balance_display()),
                    a.goal.map(|g| fmt_money(&g)).unwrap_or_default(),
                    a.monthly_target.map(|t| fmt_money(&t)).unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Name", "Balance", "Goal", "Monthly Target"], rows)
        );
    }
    Ok(())
}

/// `--clear-*` beats a value flag; clap already rejects passing both.
fn patch_field(
    sub: &clap::ArgMatches,
    key: &str,
    clear_key: &str,
) -> Result<Option<Option<Decimal>>> {
    if sub.get_flag(clear_key) {
        return Ok(Some(None));
    }
    Ok(opt_decimal(sub, key)?.map(Some))
}

fn update(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub.get_one::<String>("id").unwrap().trim().parse()?;
    let patch = SavingsAccountPatch {
        starting_balance: opt_decimal(sub, "start")?,
        goal: patch_field(sub, "goal", "clear-goal")?,
        annual_rate: patch_field(sub, "rate", "clear-rate")?,
        monthly_target: patch_field(sub, "target", "clear-target")?,
    };
    let account = savings::update_account(conn, owner, id, &patch)?;
    println!(
        "Updated '{}'; balance {}",
        account.name,
        fmt_money(&account.balance_display())
    );
    Ok(())
}

fn rm(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub.get_one::<String>("id").unwrap().trim().parse()?;
    savings::delete_account(conn, owner, id)?;
    println!("Removed savings account {} and its transactions", id);
    Ok(())
}

fn tx(conn: &mut Connection, owner: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => tx_add(conn, owner, sub)?,
        Some(("list", sub)) => tx_list(conn, owner, sub)?,
        Some(("complete", sub)) => tx_complete(conn, owner, sub)?,
        Some(("rm", sub)) => tx_rm(conn, owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn tx_add(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let account_id: i64 = sub.get_one::<String>("account").unwrap().trim().parse()?;
    let kind_raw = sub.get_one::<String>("kind").unwrap().trim();
    let kind = SavingsTxKind::parse(kind_raw).ok_or_else(|| {
        anyhow!(
            "Unknown transaction kind '{}', expected capital_add|dividend|withdrawal",
            kind_raw
        )
    })?;
    let status = match sub.get_one::<String>("status") {
        Some(raw) => TxStatus::parse(raw.trim())
            .ok_or_else(|| anyhow!("Unknown status '{}', expected pending|completed", raw))?,
        None => TxStatus::Completed,
    };
    let input = SavingsTxInput {
        kind,
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?,
        period: parse_period(sub.get_one::<String>("period").unwrap().trim())?,
        status,
        source: TxSource::Manual,
        rule_id: None,
        notes: sub.get_one::<String>("notes").map(|s| s.to_string()),
    };
    let tx = savings::create_transaction(conn, owner, account_id, &input)?;
    let account = savings::get_account(conn, owner, account_id)?;
    println!(
        "Recorded {} {} on {} ({}); balance {}",
        tx.kind.as_str(),
        fmt_money(&tx.amount),
        tx.period,
        tx.status.as_str(),
        fmt_money(&account.balance_display())
    );
    Ok(())
}

fn tx_list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let account_id: i64 = sub.get_one::<String>("account").unwrap().trim().parse()?;
    let txs = savings::list_transactions(conn, owner, account_id)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &txs)? {
        let rows = txs
            .into_iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.period.to_string(),
                    t.kind.as_str().to_string(),
                    fmt_money(&t.amount),
                    t.status.as_str().to_string(),
                    t.source.as_str().to_string(),
                    t.notes.unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Period", "Kind", "Amount", "Status", "Source", "Notes"],
                rows
            )
        );
    }
    Ok(())
}

fn tx_complete(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub.get_one::<String>("id").unwrap().trim().parse()?;
    let tx = savings::set_transaction_status(conn, owner, id, TxStatus::Completed)?;
    let account = savings::get_account(conn, owner, tx.account_id)?;
    println!(
        "Completed transaction {}; balance {}",
        id,
        fmt_money(&account.balance_display())
    );
    Ok(())
}

fn tx_rm(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub.get_one::<String>("id").unwrap().trim().parse()?;
    savings::delete_transaction(conn, owner, id)?;
    println!("Removed transaction {}", id);
    Ok(())
}
