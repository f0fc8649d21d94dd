// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Investment holdings and their transaction log.
//!
//! An asset's `total_units` / `total_invested` are derived values: they are
//! always the fold of the asset's full ordered transaction history, written
//! back inside the same storage transaction as the log mutation that made
//! them stale. Cost basis uses the average-cost method: a sell removes the
//! same fraction of the invested amount as it removes of the units held.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};
use crate::models::{Asset, AssetKind, InvestmentTransaction, InvestmentTxKind, Period};
use crate::utils::{scale_of, stored_decimal};

/// Derived totals for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetAggregate {
    pub total_units: Decimal,
    pub total_invested: Decimal,
}

impl AssetAggregate {
    pub const ZERO: AssetAggregate = AssetAggregate {
        total_units: Decimal::ZERO,
        total_invested: Decimal::ZERO,
    };
}

#[derive(Debug, Clone)]
pub struct InvestmentTxInput {
    pub kind: InvestmentTxKind,
    pub units: Decimal,
    pub price_per_unit: Decimal,
    pub total_amount: Decimal,
    pub period: Period,
    pub notes: Option<String>,
}

impl InvestmentTxInput {
    /// All checks run before any storage write begins.
    pub fn validate(&self) -> CoreResult<()> {
        self.period.validate()?;
        if self.units <= Decimal::ZERO {
            return Err(CoreError::validation("units", "must be positive"));
        }
        if scale_of(self.units) > 8 {
            return Err(CoreError::validation("units", "at most 8 decimal places"));
        }
        if self.price_per_unit <= Decimal::ZERO {
            return Err(CoreError::validation("price_per_unit", "must be positive"));
        }
        if scale_of(self.price_per_unit) > 2 {
            return Err(CoreError::validation(
                "price_per_unit",
                "at most 2 decimal places",
            ));
        }
        if self.total_amount <= Decimal::ZERO {
            return Err(CoreError::validation("total_amount", "must be positive"));
        }
        // A dividend's payout is not units x price; the balance check only
        // applies to trades.
        if matches!(self.kind, InvestmentTxKind::Buy | InvestmentTxKind::Sell) {
            let implied = self.units * self.price_per_unit;
            if (implied - self.total_amount).abs() > Decimal::new(1, 2) {
                return Err(CoreError::validation(
                    "total_amount",
                    format!(
                        "does not match units x price ({} vs {})",
                        implied, self.total_amount
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Average-cost fold over a chronologically ordered transaction history.
///
/// Strictly sequential: each sell's ratio is computed against the unit count
/// accumulated from every earlier transaction, so the slice must already be
/// in replay order and must never be folded in parallel.
pub fn fold_asset(txs: &[InvestmentTransaction]) -> AssetAggregate {
    let mut units = Decimal::ZERO;
    let mut invested = Decimal::ZERO;
    for tx in txs {
        match tx.kind {
            InvestmentTxKind::Buy => {
                units += tx.units;
                invested += tx.total_amount;
            }
            InvestmentTxKind::Sell => {
                if units > Decimal::ZERO {
                    let ratio = tx.units / units;
                    invested -= invested * ratio;
                }
                units -= tx.units;
            }
            // Income stays in the log; it never touches units or cost basis.
            InvestmentTxKind::Dividend => {}
        }
    }
    // Absorb rounding drift; negative aggregates are never persisted.
    AssetAggregate {
        total_units: units.max(Decimal::ZERO),
        total_invested: invested.max(Decimal::ZERO),
    }
}

pub fn create_asset(
    conn: &Connection,
    owner: &str,
    symbol: &str,
    name: &str,
    kind: AssetKind,
) -> CoreResult<Asset> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(CoreError::validation("symbol", "must not be empty"));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("name", "must not be empty"));
    }
    let res = conn.execute(
        "INSERT INTO assets(owner, symbol, name, kind) VALUES (?1,?2,?3,?4)",
        params![owner, symbol, name, kind.as_str()],
    );
    match res {
        Ok(_) => get_asset(conn, owner, conn.last_insert_rowid()),
        Err(e) if CoreError::is_unique_violation(&e) => Err(CoreError::validation(
            "symbol",
            format!("'{}' already in use", symbol),
        )),
        Err(e) => Err(e.into()),
    }
}

pub fn get_asset(conn: &Connection, owner: &str, asset_id: i64) -> CoreResult<Asset> {
    let row = conn
        .query_row(
            "SELECT id, owner, symbol, name, kind, total_units, total_invested
             FROM assets WHERE id=?1 AND owner=?2 AND deleted_at IS NULL",
            params![asset_id, owner],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;
    let (id, owner, symbol, name, kind_s, units_s, invested_s) =
        row.ok_or(CoreError::NotFound("asset"))?;
    let kind = AssetKind::parse(&kind_s)
        .ok_or_else(|| CoreError::Corrupt(format!("asset kind '{}'", kind_s)))?;
    Ok(Asset {
        id,
        owner,
        symbol,
        name,
        kind,
        total_units: stored_decimal(&units_s, "total_units")?,
        total_invested: stored_decimal(&invested_s, "total_invested")?,
    })
}

pub fn list_assets(conn: &Connection, owner: &str) -> CoreResult<Vec<Asset>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, symbol, name, kind, total_units, total_invested
         FROM assets WHERE owner=?1 AND deleted_at IS NULL ORDER BY symbol",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
        ))
    })?;
    let mut assets = Vec::new();
    for row in rows {
        let (id, symbol, name, kind_s, units_s, invested_s) = row?;
        let kind = AssetKind::parse(&kind_s)
            .ok_or_else(|| CoreError::Corrupt(format!("asset kind '{}'", kind_s)))?;
        assets.push(Asset {
            id,
            owner: owner.to_string(),
            symbol,
            name,
            kind,
            total_units: stored_decimal(&units_s, "total_units")?,
            total_invested: stored_decimal(&invested_s, "total_invested")?,
        });
    }
    Ok(assets)
}

/// Tombstone the asset. Its transactions remain for history/export, the
/// symbol becomes reusable, and no new transactions are accepted.
pub fn soft_delete_asset(conn: &Connection, owner: &str, asset_id: i64) -> CoreResult<()> {
    let n = conn.execute(
        "UPDATE assets SET deleted_at=datetime('now')
         WHERE id=?1 AND owner=?2 AND deleted_at IS NULL",
        params![asset_id, owner],
    )?;
    if n == 0 {
        return Err(CoreError::NotFound("asset"));
    }
    Ok(())
}

/// Append one transaction and recompute the asset's aggregates as a single
/// unit of work. Any failure after the log write rolls the whole unit back;
/// a reader never observes the log entry without its matching aggregate.
pub fn create_transaction(
    conn: &mut Connection,
    owner: &str,
    asset_id: i64,
    input: &InvestmentTxInput,
) -> CoreResult<InvestmentTransaction> {
    input.validate()?;
    let asset = get_asset(conn, owner, asset_id)?;
    // Cheap precondition: do not open a doomed unit of work for an oversell.
    if input.kind == InvestmentTxKind::Sell && input.units > asset.total_units {
        return Err(CoreError::InsufficientUnits {
            requested: input.units,
            held: asset.total_units,
        });
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO investment_transactions
            (owner, asset_id, kind, units, price_per_unit, total_amount, year, month, day, notes)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            owner,
            asset_id,
            input.kind.as_str(),
            input.units.to_string(),
            input.price_per_unit.to_string(),
            input.total_amount.to_string(),
            input.period.year,
            input.period.month,
            input.period.day,
            input.notes
        ],
    )?;
    let tx_id = tx.last_insert_rowid();
    recompute_asset(&tx, asset_id)?;
    let created = get_transaction(&tx, owner, tx_id)?;
    tx.commit()?;
    Ok(created)
}

/// Remove one transaction and recompute, atomically.
pub fn delete_transaction(conn: &mut Connection, owner: &str, tx_id: i64) -> CoreResult<()> {
    let existing = get_transaction(conn, owner, tx_id)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "DELETE FROM investment_transactions WHERE id=?1 AND owner=?2",
        params![tx_id, owner],
    )?;
    recompute_asset(&tx, existing.asset_id)?;
    tx.commit()?;
    Ok(())
}

/// Notes are the one field that stays editable after creation.
pub fn update_notes(
    conn: &Connection,
    owner: &str,
    tx_id: i64,
    notes: Option<&str>,
) -> CoreResult<InvestmentTransaction> {
    let n = conn.execute(
        "UPDATE investment_transactions SET notes=?1 WHERE id=?2 AND owner=?3",
        params![notes, tx_id, owner],
    )?;
    if n == 0 {
        return Err(CoreError::NotFound("transaction"));
    }
    get_transaction(conn, owner, tx_id)
}

pub fn get_transaction(
    conn: &Connection,
    owner: &str,
    tx_id: i64,
) -> CoreResult<InvestmentTransaction> {
    let mut txs = query_transactions(
        conn,
        "WHERE t.id=?1 AND t.owner=?2",
        params![tx_id, owner],
    )?;
    txs.pop().ok_or(CoreError::NotFound("transaction"))
}

/// Full history for one asset in replay order. Read-only; never triggers a
/// recompute.
pub fn list_transactions(
    conn: &Connection,
    owner: &str,
    asset_id: i64,
) -> CoreResult<Vec<InvestmentTransaction>> {
    query_transactions(
        conn,
        "WHERE t.asset_id=?1 AND t.owner=?2",
        params![asset_id, owner],
    )
}

fn query_transactions(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> CoreResult<Vec<InvestmentTransaction>> {
    // Replay order: period, then insertion order as the tiebreak. COALESCE
    // puts day-less entries at the 1st; id breaks created_at ties.
    let sql = format!(
        "SELECT t.id, t.owner, t.asset_id, t.kind, t.units, t.price_per_unit,
                t.total_amount, t.year, t.month, t.day, t.notes, t.created_at
         FROM investment_transactions t {}
         ORDER BY t.year, t.month, COALESCE(t.day,1), t.created_at, t.id",
        filter
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params, |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, i32>(7)?,
            r.get::<_, u32>(8)?,
            r.get::<_, Option<u32>>(9)?,
            r.get::<_, Option<String>>(10)?,
            r.get::<_, String>(11)?,
        ))
    })?;
    let mut txs = Vec::new();
    for row in rows {
        let (id, owner, asset_id, kind_s, units_s, price_s, total_s, year, month, day, notes, created_at) =
            row?;
        let kind = InvestmentTxKind::parse(&kind_s)
            .ok_or_else(|| CoreError::Corrupt(format!("transaction kind '{}'", kind_s)))?;
        txs.push(InvestmentTransaction {
            id,
            owner,
            asset_id,
            kind,
            units: stored_decimal(&units_s, "units")?,
            price_per_unit: stored_decimal(&price_s, "price_per_unit")?,
            total_amount: stored_decimal(&total_s, "total_amount")?,
            period: Period::new(year, month, day),
            notes,
            created_at,
        })
    }
    Ok(txs)
}

/// The only writer of `total_units` / `total_invested`: reload the full
/// ordered log and refold from scratch. Re-runnable at any time; a deleted
/// or corrected past transaction can never leave the aggregates wrong.
pub fn recompute_asset(conn: &Connection, asset_id: i64) -> CoreResult<AssetAggregate> {
    let owner: String = conn.query_row(
        "SELECT owner FROM assets WHERE id=?1",
        params![asset_id],
        |r| r.get(0),
    )?;
    let txs = query_transactions(
        conn,
        "WHERE t.asset_id=?1 AND t.owner=?2",
        params![asset_id, owner],
    )?;
    let agg = fold_asset(&txs);
    conn.execute(
        "UPDATE assets SET total_units=?1, total_invested=?2 WHERE id=?3",
        params![
            agg.total_units.to_string(),
            agg.total_invested.to_string(),
            asset_id
        ],
    )?;
    Ok(agg)
}
