// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::investments::{self, InvestmentTxInput};
use crate::models::InvestmentTxKind;
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, parse_period, pretty_table};

pub fn handle(conn: &mut Connection, owner: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("buy", sub)) => record(conn, owner, sub, InvestmentTxKind::Buy)?,
        Some(("sell", sub)) => record(conn, owner, sub, InvestmentTxKind::Sell)?,
        Some(("dividend", sub)) => record(conn, owner, sub, InvestmentTxKind::Dividend)?,
        Some(("list", sub)) => list(conn, owner, sub)?,
        Some(("rm", sub)) => rm(conn, owner, sub)?,
        Some(("note", sub)) => note(conn, owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn record(
    conn: &mut Connection,
    owner: &str,
    sub: &clap::ArgMatches,
    kind: InvestmentTxKind,
) -> Result<()> {
    let asset_id: i64 = sub.get_one::<String>("asset").unwrap().trim().parse()?;
    let input = InvestmentTxInput {
        kind,
        units: parse_decimal(sub.get_one::<String>("units").unwrap().trim())?,
        price_per_unit: parse_decimal(sub.get_one::<String>("price").unwrap().trim())?,
        total_amount: parse_decimal(sub.get_one::<String>("total").unwrap().trim())?,
        period: parse_period(sub.get_one::<String>("period").unwrap().trim())?,
        notes: sub.get_one::<String>("notes").map(|s| s.to_string()),
    };
    let tx = investments::create_transaction(conn, owner, asset_id, &input)?;
    let asset = investments::get_asset(conn, owner, asset_id)?;
    println!(
        "Recorded {} {} x {} @ {} ({}); now {} units, {} invested",
        tx.kind.as_str(),
        tx.units.normalize(),
        asset.symbol,
        tx.price_per_unit,
        tx.period,
        asset.total_units.normalize(),
        fmt_money(&asset.total_invested)
    );
    Ok(())
}

fn list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let asset_id: i64 = sub.get_one::<String>("asset").unwrap().trim().parse()?;
    let txs = investments::list_transactions(conn, owner, asset_id)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &txs)? {
        let rows = txs
            .into_iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.period.to_string(),
                    t.kind.as_str().to_string(),
                    t.units.normalize().to_string(),
                    t.price_per_unit.to_string(),
                    fmt_money(&t.total_amount),
                    t.notes.unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Period", "Kind", "Units", "Price", "Total", "Notes"],
                rows
            )
        );
    }
    Ok(())
}

fn rm(conn: &mut Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub.get_one::<String>("id").unwrap().trim().parse()?;
    investments::delete_transaction(conn, owner, id)?;
    println!("Removed transaction {}", id);
    Ok(())
}

fn note(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub.get_one::<String>("id").unwrap().trim().parse()?;
    let notes = sub.get_one::<String>("notes").map(|s| s.as_str());
    investments::update_notes(conn, owner, id, notes)?;
    println!("Updated notes on transaction {}", id);
    Ok(())
}
