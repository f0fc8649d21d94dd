// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use finledger::db;
use finledger::error::CoreError;
use finledger::models::{Period, RuleMode, SavingsTxKind, TxSource, TxStatus};
use finledger::recurring::{self, RuleInput};
use finledger::savings::{self, SavingsAccountPatch, SavingsTxInput};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

const OWNER: &str = "alice";

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn input(kind: SavingsTxKind, amount: &str, status: TxStatus) -> SavingsTxInput {
    SavingsTxInput {
        kind,
        amount: dec(amount),
        period: Period::new(2024, 6, None),
        status,
        source: TxSource::Manual,
        rule_id: None,
        notes: None,
    }
}

fn setup(starting: &str) -> (Connection, i64) {
    let conn = db::open_in_memory().unwrap();
    let account =
        savings::create_account(&conn, OWNER, "Emergency Fund", dec(starting), None, None, None)
            .unwrap();
    (conn, account.id)
}

#[test]
fn balance_counts_completed_transactions_only() {
    let (mut conn, account_id) = setup("1000");
    savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::CapitalAdd, "200", TxStatus::Completed),
    )
    .unwrap();
    savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::Dividend, "50", TxStatus::Completed),
    )
    .unwrap();
    savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::Withdrawal, "9999", TxStatus::Pending),
    )
    .unwrap();

    let account = savings::get_account(&conn, OWNER, account_id).unwrap();
    assert_eq!(account.current_balance, dec("1250"));
}

#[test]
fn completing_a_pending_transaction_moves_the_balance() {
    let (mut conn, account_id) = setup("0");
    let tx = savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::CapitalAdd, "300", TxStatus::Pending),
    )
    .unwrap();
    assert_eq!(
        savings::get_account(&conn, OWNER, account_id)
            .unwrap()
            .current_balance,
        dec("0")
    );

    savings::set_transaction_status(&mut conn, OWNER, tx.id, TxStatus::Completed).unwrap();
    assert_eq!(
        savings::get_account(&conn, OWNER, account_id)
            .unwrap()
            .current_balance,
        dec("300")
    );
}

#[test]
fn completed_never_reverts_to_pending() {
    let (mut conn, account_id) = setup("0");
    let tx = savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::CapitalAdd, "300", TxStatus::Completed),
    )
    .unwrap();

    let err = savings::set_transaction_status(&mut conn, OWNER, tx.id, TxStatus::Pending)
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));

    // Nothing moved.
    let reread = savings::get_transaction(&conn, OWNER, tx.id).unwrap();
    assert_eq!(reread.status, TxStatus::Completed);
    assert_eq!(
        savings::get_account(&conn, OWNER, account_id)
            .unwrap()
            .current_balance,
        dec("300")
    );
}

#[test]
fn setting_the_same_status_is_a_no_op() {
    let (mut conn, account_id) = setup("0");
    let tx = savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::CapitalAdd, "300", TxStatus::Completed),
    )
    .unwrap();
    let same = savings::set_transaction_status(&mut conn, OWNER, tx.id, TxStatus::Completed)
        .unwrap();
    assert_eq!(same.status, TxStatus::Completed);
}

#[test]
fn completed_recurring_rows_cannot_be_deleted() {
    let (mut conn, account_id) = setup("0");
    let rule = recurring::create_rule(
        &conn,
        OWNER,
        &RuleInput {
            account_id,
            amount: dec("100"),
            day_of_month: 5,
            start_year: 2024,
            start_month: 6,
            end: None,
            mode: RuleMode::AutoConfirm,
            active: true,
        },
    )
    .unwrap();
    recurring::generate_missing(&mut conn, OWNER, 2024, 6).unwrap();

    let txs = savings::list_transactions(&conn, OWNER, account_id).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].rule_id, Some(rule.id));

    let err = savings::delete_transaction(&mut conn, OWNER, txs[0].id).unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
    assert_eq!(
        savings::list_transactions(&conn, OWNER, account_id)
            .unwrap()
            .len(),
        1
    );

    // Manual rows stay deletable, and deletion refolds the balance.
    let manual = savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::CapitalAdd, "40", TxStatus::Completed),
    )
    .unwrap();
    assert_eq!(
        savings::get_account(&conn, OWNER, account_id)
            .unwrap()
            .current_balance,
        dec("140")
    );
    savings::delete_transaction(&mut conn, OWNER, manual.id).unwrap();
    assert_eq!(
        savings::get_account(&conn, OWNER, account_id)
            .unwrap()
            .current_balance,
        dec("100")
    );
}

#[test]
fn manual_duplicate_of_a_generated_period_is_a_conflict() {
    let (mut conn, account_id) = setup("0");
    let rule = recurring::create_rule(
        &conn,
        OWNER,
        &RuleInput {
            account_id,
            amount: dec("100"),
            day_of_month: 5,
            start_year: 2024,
            start_month: 6,
            end: None,
            mode: RuleMode::AutoConfirm,
            active: true,
        },
    )
    .unwrap();
    recurring::generate_missing(&mut conn, OWNER, 2024, 6).unwrap();

    let err = savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &SavingsTxInput {
            kind: SavingsTxKind::CapitalAdd,
            amount: dec("100"),
            period: Period::new(2024, 6, Some(5)),
            status: TxStatus::Completed,
            source: TxSource::Recurring,
            rule_id: Some(rule.id),
            notes: None,
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CoreError::DuplicatePeriod { year: 2024, month: 6 }
    ));
    // The rejected insert left no row behind.
    assert_eq!(
        savings::list_transactions(&conn, OWNER, account_id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn account_hard_delete_cascades() {
    let (mut conn, account_id) = setup("100");
    savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::CapitalAdd, "50", TxStatus::Completed),
    )
    .unwrap();
    recurring::create_rule(
        &conn,
        OWNER,
        &RuleInput {
            account_id,
            amount: dec("25"),
            day_of_month: 1,
            start_year: 2024,
            start_month: 1,
            end: None,
            mode: RuleMode::Pending,
            active: true,
        },
    )
    .unwrap();

    savings::delete_account(&conn, OWNER, account_id).unwrap();

    assert!(matches!(
        savings::get_account(&conn, OWNER, account_id),
        Err(CoreError::NotFound(_))
    ));
    let orphan_txs: i64 = conn
        .query_row("SELECT COUNT(*) FROM savings_transactions", [], |r| r.get(0))
        .unwrap();
    let orphan_rules: i64 = conn
        .query_row("SELECT COUNT(*) FROM recurring_rules", [], |r| r.get(0))
        .unwrap();
    assert_eq!(orphan_txs, 0);
    assert_eq!(orphan_rules, 0);
}

#[test]
fn starting_balance_update_refolds() {
    let (mut conn, account_id) = setup("100");
    savings::create_transaction(
        &mut conn,
        OWNER,
        account_id,
        &input(SavingsTxKind::CapitalAdd, "50", TxStatus::Completed),
    )
    .unwrap();

    let patch = SavingsAccountPatch {
        starting_balance: Some(dec("500")),
        ..Default::default()
    };
    let updated = savings::update_account(&mut conn, OWNER, account_id, &patch).unwrap();
    assert_eq!(updated.current_balance, dec("550"));
}

#[test]
fn account_update_can_clear_optional_fields() {
    let conn = db::open_in_memory().unwrap();
    let account = savings::create_account(
        &conn,
        OWNER,
        "House Fund",
        dec("100"),
        Some(dec("5000")),
        Some(dec("3.5")),
        Some(dec("200")),
    )
    .unwrap();
    let mut conn = conn;

    // Untouched fields survive, cleared fields come back empty.
    let patch = SavingsAccountPatch {
        goal: Some(None),
        monthly_target: Some(None),
        ..Default::default()
    };
    let updated = savings::update_account(&mut conn, OWNER, account.id, &patch).unwrap();
    assert_eq!(updated.goal, None);
    assert_eq!(updated.monthly_target, None);
    assert_eq!(updated.annual_rate, Some(dec("3.5")));
    assert_eq!(updated.starting_balance, dec("100"));
}

#[test]
fn account_update_rejects_sub_cent_amounts() {
    let (mut conn, account_id) = setup("100");
    for patch in [
        SavingsAccountPatch {
            goal: Some(Some(dec("1000.005"))),
            ..Default::default()
        },
        SavingsAccountPatch {
            annual_rate: Some(Some(dec("3.141"))),
            ..Default::default()
        },
        SavingsAccountPatch {
            monthly_target: Some(Some(dec("50.999"))),
            ..Default::default()
        },
    ] {
        let err = savings::update_account(&mut conn, OWNER, account_id, &patch).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }
    // Everything still as created.
    let account = savings::get_account(&conn, OWNER, account_id).unwrap();
    assert_eq!(account.goal, None);
    assert_eq!(account.annual_rate, None);
    assert_eq!(account.monthly_target, None);
}

#[test]
fn balance_rounds_at_display_not_during_accumulation() {
    let (mut conn, account_id) = setup("0");
    // Three completed adds of 0.33; the stored balance keeps full precision.
    for _ in 0..3 {
        savings::create_transaction(
            &mut conn,
            OWNER,
            account_id,
            &input(SavingsTxKind::CapitalAdd, "0.33", TxStatus::Completed),
        )
        .unwrap();
    }
    let account = savings::get_account(&conn, OWNER, account_id).unwrap();
    assert_eq!(account.current_balance, dec("0.99"));
    assert_eq!(account.balance_display(), dec("0.99"));
}

#[test]
fn cross_owner_savings_access_reads_as_not_found() {
    let (mut conn, account_id) = setup("100");
    assert!(matches!(
        savings::get_account(&conn, "mallory", account_id),
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        savings::create_transaction(
            &mut conn,
            "mallory",
            account_id,
            &input(SavingsTxKind::CapitalAdd, "1", TxStatus::Completed),
        ),
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        savings::delete_account(&conn, "mallory", account_id),
        Err(CoreError::NotFound(_))
    ));
}
