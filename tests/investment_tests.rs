// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use finledger::db;
use finledger::error::CoreError;
use finledger::investments::{self, InvestmentTxInput};
use finledger::models::{AssetKind, InvestmentTxKind, Period};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

const OWNER: &str = "alice";

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn input(kind: InvestmentTxKind, units: &str, price: &str, total: &str) -> InvestmentTxInput {
    InvestmentTxInput {
        kind,
        units: dec(units),
        price_per_unit: dec(price),
        total_amount: dec(total),
        period: Period::new(2024, 6, Some(5)),
        notes: None,
    }
}

fn setup() -> (Connection, i64) {
    let conn = db::open_in_memory().unwrap();
    let asset = investments::create_asset(&conn, OWNER, "vwce", "FTSE All-World", AssetKind::Etf)
        .unwrap();
    assert_eq!(asset.symbol, "VWCE");
    (conn, asset.id)
}

#[test]
fn average_cost_sell_scenario() {
    let (mut conn, asset_id) = setup();
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "10", "100", "1000"),
    )
    .unwrap();
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "10", "300", "3000"),
    )
    .unwrap();

    let asset = investments::get_asset(&conn, OWNER, asset_id).unwrap();
    assert_eq!(asset.total_units, dec("20"));
    assert_eq!(asset.total_invested, dec("4000"));

    // Selling 5 of 20 removes a quarter of the cost basis.
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Sell, "5", "250", "1250"),
    )
    .unwrap();

    let asset = investments::get_asset(&conn, OWNER, asset_id).unwrap();
    assert_eq!(asset.total_units, dec("15"));
    assert_eq!(asset.total_invested, dec("3000"));
}

#[test]
fn oversell_is_rejected_and_changes_nothing() {
    let (mut conn, asset_id) = setup();
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "10", "100", "1000"),
    )
    .unwrap();

    let err = investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Sell, "11", "100", "1100"),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InsufficientUnits { .. }));

    let asset = investments::get_asset(&conn, OWNER, asset_id).unwrap();
    assert_eq!(asset.total_units, dec("10"));
    assert_eq!(asset.total_invested, dec("1000"));
    assert_eq!(
        investments::list_transactions(&conn, OWNER, asset_id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn dividend_leaves_aggregates_untouched() {
    let (mut conn, asset_id) = setup();
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "10", "100", "1000"),
    )
    .unwrap();
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Dividend, "10", "1", "17.30"),
    )
    .unwrap();

    let asset = investments::get_asset(&conn, OWNER, asset_id).unwrap();
    assert_eq!(asset.total_units, dec("10"));
    assert_eq!(asset.total_invested, dec("1000"));
    assert_eq!(
        investments::list_transactions(&conn, OWNER, asset_id)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn deleting_a_transaction_recomputes_the_asset() {
    let (mut conn, asset_id) = setup();
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "10", "100", "1000"),
    )
    .unwrap();
    let second = investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "10", "300", "3000"),
    )
    .unwrap();

    investments::delete_transaction(&mut conn, OWNER, second.id).unwrap();

    let asset = investments::get_asset(&conn, OWNER, asset_id).unwrap();
    assert_eq!(asset.total_units, dec("10"));
    assert_eq!(asset.total_invested, dec("1000"));
}

#[test]
fn recompute_failure_rolls_back_the_log_write() {
    let (mut conn, asset_id) = setup();
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "10", "100", "1000"),
    )
    .unwrap();

    // Damage a stored row behind the engine's back so the refold inside the
    // next unit of work fails after its log insert succeeded.
    conn.execute(
        "INSERT INTO investment_transactions
            (owner, asset_id, kind, units, price_per_unit, total_amount, year, month)
         VALUES (?1, ?2, 'buy', 'garbage', '1', '1', 2024, 7)",
        rusqlite::params![OWNER, asset_id],
    )
    .unwrap();

    let before: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM investment_transactions WHERE asset_id=?1",
            [asset_id],
            |r| r.get(0),
        )
        .unwrap();

    let err = investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "5", "100", "500"),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::Corrupt(_)));

    // The failed unit of work left no orphan row and no aggregate change.
    let after: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM investment_transactions WHERE asset_id=?1",
            [asset_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(before, after);
    let asset = investments::get_asset(&conn, OWNER, asset_id).unwrap();
    assert_eq!(asset.total_units, dec("10"));
    assert_eq!(asset.total_invested, dec("1000"));
}

#[test]
fn soft_deleted_asset_rejects_new_transactions_and_frees_its_symbol() {
    let (mut conn, asset_id) = setup();
    investments::soft_delete_asset(&conn, OWNER, asset_id).unwrap();

    assert!(matches!(
        investments::get_asset(&conn, OWNER, asset_id),
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        investments::create_transaction(
            &mut conn,
            OWNER,
            asset_id,
            &input(InvestmentTxKind::Buy, "1", "10", "10"),
        ),
        Err(CoreError::NotFound(_))
    ));
    assert!(investments::list_assets(&conn, OWNER).unwrap().is_empty());

    // The tombstone does not hold the symbol hostage.
    investments::create_asset(&conn, OWNER, "VWCE", "FTSE All-World", AssetKind::Etf).unwrap();
}

#[test]
fn cross_owner_access_reads_as_not_found() {
    let (mut conn, asset_id) = setup();
    assert!(matches!(
        investments::get_asset(&conn, "mallory", asset_id),
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        investments::create_transaction(
            &mut conn,
            "mallory",
            asset_id,
            &input(InvestmentTxKind::Buy, "1", "10", "10"),
        ),
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        investments::soft_delete_asset(&conn, "mallory", asset_id),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn notes_are_the_only_mutable_field() {
    let (mut conn, asset_id) = setup();
    let tx = investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &input(InvestmentTxKind::Buy, "10", "100", "1000"),
    )
    .unwrap();

    let updated = investments::update_notes(&conn, OWNER, tx.id, Some("rebalance")).unwrap();
    assert_eq!(updated.notes.as_deref(), Some("rebalance"));
    assert_eq!(updated.units, tx.units);
    assert_eq!(updated.total_amount, tx.total_amount);

    assert!(matches!(
        investments::update_notes(&conn, "mallory", tx.id, None),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn replay_order_is_period_then_insertion() {
    let (mut conn, asset_id) = setup();
    // Inserted out of calendar order; the March buy must fold before the
    // June sell even though it was appended later.
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &InvestmentTxInput {
            period: Period::new(2024, 6, None),
            ..input(InvestmentTxKind::Buy, "10", "100", "1000")
        },
    )
    .unwrap();
    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &InvestmentTxInput {
            period: Period::new(2024, 3, Some(15)),
            ..input(InvestmentTxKind::Buy, "10", "300", "3000")
        },
    )
    .unwrap();

    let txs = investments::list_transactions(&conn, OWNER, asset_id).unwrap();
    assert_eq!(txs[0].period.month, 3);
    assert_eq!(txs[1].period.month, 6);

    investments::create_transaction(
        &mut conn,
        OWNER,
        asset_id,
        &InvestmentTxInput {
            period: Period::new(2024, 4, None),
            ..input(InvestmentTxKind::Sell, "10", "200", "2000")
        },
    )
    .unwrap();

    // The April sell sees only the March buy before it: ratio 10/10 on a
    // basis of 3000, leaving the June buy's 1000 intact.
    let asset = investments::get_asset(&conn, OWNER, asset_id).unwrap();
    assert_eq!(asset.total_units, dec("10"));
    assert_eq!(asset.total_invested, dec("1000"));
}
