// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};

use crate::utils::pretty_table;
use crate::{investments, savings};

/// Refold every aggregate from its log and compare against what is stored.
/// Drift means some writer bypassed the recompute engine; `--fix` rewrites
/// the stored values with the canonical refold result.
pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let fix = m.get_flag("fix");
    let mut rows = Vec::new();

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let asset_ids: Vec<(i64, String, String)> = {
        let mut stmt = tx.prepare(
            "SELECT id, owner, symbol FROM assets WHERE deleted_at IS NULL ORDER BY id",
        )?;
        let ids = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    for (id, owner, symbol) in asset_ids {
        let stored = investments::get_asset(&tx, &owner, id)?;
        let refolded = investments::recompute_asset(&tx, id)?;
        if stored.total_units != refolded.total_units
            || stored.total_invested != refolded.total_invested
        {
            rows.push(vec![
                "asset_aggregate_drift".into(),
                format!(
                    "{}: stored {}/{}, refolded {}/{}",
                    symbol,
                    stored.total_units,
                    stored.total_invested,
                    refolded.total_units,
                    refolded.total_invested
                ),
            ]);
        }
    }

    let account_ids: Vec<(i64, String, String)> = {
        let mut stmt =
            tx.prepare("SELECT id, owner, name FROM savings_accounts ORDER BY id")?;
        let ids = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    for (id, owner, name) in account_ids {
        let stored = savings::get_account(&tx, &owner, id)?;
        let refolded = savings::recompute_account(&tx, id)?;
        if stored.current_balance != refolded {
            rows.push(vec![
                "savings_balance_drift".into(),
                format!("{}: stored {}, refolded {}", name, stored.current_balance, refolded),
            ]);
        }
    }

    // recompute_* already rewrote the stored values; only keep them on --fix.
    if fix {
        tx.commit()?;
    } else {
        tx.rollback()?;
    }

    if rows.is_empty() {
        println!("doctor: all aggregates match their logs");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
        if fix {
            println!("doctor: stored aggregates rewritten from the logs");
        } else {
            println!("doctor: re-run with --fix to rewrite stored aggregates");
        }
    }
    Ok(())
}
