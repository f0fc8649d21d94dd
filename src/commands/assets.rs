// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{anyhow, Result};
use rusqlite::Connection;

use crate::investments;
use crate::models::AssetKind;
use crate::utils::{fmt_money, maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, owner: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, owner, sub)?,
        Some(("list", sub)) => list(conn, owner, sub)?,
        Some(("rm", sub)) => rm(conn, owner, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let symbol = sub.get_one::<String>("symbol").unwrap().trim().to_string();
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let kind_raw = sub.get_one::<String>("kind").unwrap().trim();
    let kind = AssetKind::parse(kind_raw)
        .ok_or_else(|| anyhow!("Unknown asset kind '{}', expected stock|etf|crypto|gold", kind_raw))?;
    let asset = investments::create_asset(conn, owner, &symbol, &name, kind)?;
    println!("Added asset {} ({}) [{}]", asset.symbol, asset.name, asset.kind.as_str());
    Ok(())
}

fn list(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let assets = investments::list_assets(conn, owner)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &assets)? {
        let rows = assets
            .into_iter()
            .map(|a| {
                vec![
                    a.id.to_string(),
                    a.symbol,
                    a.name,
                    a.kind.as_str().to_string(),
                    a.total_units.normalize().to_string(),
                    fmt_money(&a.total_invested),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Symbol", "Name", "Kind", "Units", "Invested"], rows)
        );
    }
    Ok(())
}

fn rm(conn: &Connection, owner: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub.get_one::<String>("id").unwrap().trim().parse()?;
    investments::soft_delete_asset(conn, owner, id)?;
    println!("Removed asset {} (history retained)", id);
    Ok(())
}
