// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Savings accounts and their transaction log.
//!
//! `current_balance` is derived: starting balance plus every *completed*
//! capital_add and dividend, minus every completed withdrawal, refolded from
//! the full log inside the same storage transaction as any mutation.
//! Pending rows are visible in the log but never counted.
//!
//! Unlike assets, savings accounts are hard-deleted: the account row and all
//! of its transactions and rules go together (no retention contract here).

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};
use crate::models::{Period, SavingsAccount, SavingsTransaction, SavingsTxKind, TxSource, TxStatus};
use crate::utils::{scale_of, stored_decimal};

#[derive(Debug, Clone)]
pub struct SavingsTxInput {
    pub kind: SavingsTxKind,
    pub amount: Decimal,
    pub period: Period,
    pub status: TxStatus,
    pub source: TxSource,
    pub rule_id: Option<i64>,
    pub notes: Option<String>,
}

impl SavingsTxInput {
    pub fn validate(&self) -> CoreResult<()> {
        self.period.validate()?;
        if self.amount <= Decimal::ZERO {
            return Err(CoreError::validation("amount", "must be positive"));
        }
        if scale_of(self.amount) > 2 {
            return Err(CoreError::validation("amount", "at most 2 decimal places"));
        }
        if self.source == TxSource::Recurring && self.rule_id.is_none() {
            return Err(CoreError::validation(
                "rule_id",
                "required for recurring transactions",
            ));
        }
        Ok(())
    }
}

/// Balance fold: completed rows only, accumulated at full precision.
/// Rounding to 2dp happens once, at the display boundary.
pub fn fold_savings(starting_balance: Decimal, txs: &[SavingsTransaction]) -> Decimal {
    let mut balance = starting_balance;
    for tx in txs {
        if tx.status != TxStatus::Completed {
            continue;
        }
        match tx.kind {
            SavingsTxKind::CapitalAdd | SavingsTxKind::Dividend => balance += tx.amount,
            SavingsTxKind::Withdrawal => balance -= tx.amount,
        }
    }
    balance
}

pub fn create_account(
    conn: &Connection,
    owner: &str,
    name: &str,
    starting_balance: Decimal,
    goal: Option<Decimal>,
    annual_rate: Option<Decimal>,
    monthly_target: Option<Decimal>,
) -> CoreResult<SavingsAccount> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("name", "must not be empty"));
    }
    if scale_of(starting_balance) > 2 {
        return Err(CoreError::validation(
            "starting_balance",
            "at most 2 decimal places",
        ));
    }
    let res = conn.execute(
        "INSERT INTO savings_accounts
            (owner, name, starting_balance, goal, annual_rate, monthly_target, current_balance)
         VALUES (?1,?2,?3,?4,?5,?6,?3)",
        params![
            owner,
            name,
            starting_balance.to_string(),
            goal.map(|d| d.to_string()),
            annual_rate.map(|d| d.to_string()),
            monthly_target.map(|d| d.to_string())
        ],
    );
    match res {
        Ok(_) => get_account(conn, owner, conn.last_insert_rowid()),
        Err(e) if CoreError::is_unique_violation(&e) => Err(CoreError::validation(
            "name",
            format!("'{}' already in use", name),
        )),
        Err(e) => Err(e.into()),
    }
}

pub fn get_account(conn: &Connection, owner: &str, account_id: i64) -> CoreResult<SavingsAccount> {
    let row = conn
        .query_row(
            "SELECT id, owner, name, starting_balance, goal, annual_rate, monthly_target,
                    current_balance
             FROM savings_accounts WHERE id=?1 AND owner=?2",
            params![account_id, owner],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, Option<String>>(5)?,
                    r.get::<_, Option<String>>(6)?,
                    r.get::<_, String>(7)?,
                ))
            },
        )
        .optional()?;
    let (id, owner, name, start_s, goal_s, rate_s, target_s, balance_s) =
        row.ok_or(CoreError::NotFound("savings account"))?;
    Ok(SavingsAccount {
        id,
        owner,
        name,
        starting_balance: stored_decimal(&start_s, "starting_balance")?,
        goal: goal_s.as_deref().map(|s| stored_decimal(s, "goal")).transpose()?,
        annual_rate: rate_s
            .as_deref()
            .map(|s| stored_decimal(s, "annual_rate"))
            .transpose()?,
        monthly_target: target_s
            .as_deref()
            .map(|s| stored_decimal(s, "monthly_target"))
            .transpose()?,
        current_balance: stored_decimal(&balance_s, "current_balance")?,
    })
}

pub fn list_accounts(conn: &Connection, owner: &str) -> CoreResult<Vec<SavingsAccount>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM savings_accounts WHERE owner=?1 ORDER BY name",
    )?;
    let ids: Vec<i64> = stmt
        .query_map(params![owner], |r| r.get(0))?
        .collect::<Result<_, _>>()?;
    ids.into_iter()
        .map(|id| get_account(conn, owner, id))
        .collect()
}

/// Partial update for account metadata. Outer `None` leaves a field alone;
/// `Some(None)` on an optional field clears it.
#[derive(Debug, Clone, Default)]
pub struct SavingsAccountPatch {
    pub starting_balance: Option<Decimal>,
    pub goal: Option<Option<Decimal>>,
    pub annual_rate: Option<Option<Decimal>>,
    pub monthly_target: Option<Option<Decimal>>,
}

impl SavingsAccountPatch {
    fn validate(&self) -> CoreResult<()> {
        let checks = [
            ("starting_balance", self.starting_balance),
            ("goal", self.goal.flatten()),
            ("annual_rate", self.annual_rate.flatten()),
            ("monthly_target", self.monthly_target.flatten()),
        ];
        for (field, value) in checks {
            if let Some(v) = value {
                if scale_of(v) > 2 {
                    return Err(CoreError::validation(field, "at most 2 decimal places"));
                }
            }
        }
        Ok(())
    }
}

/// Edit account metadata. A changed starting balance shifts the derived
/// balance, so that path refolds inside the same unit of work.
pub fn update_account(
    conn: &mut Connection,
    owner: &str,
    account_id: i64,
    patch: &SavingsAccountPatch,
) -> CoreResult<SavingsAccount> {
    patch.validate()?;
    let account = get_account(conn, owner, account_id)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "UPDATE savings_accounts
         SET starting_balance=?1, goal=?2, annual_rate=?3, monthly_target=?4
         WHERE id=?5 AND owner=?6",
        params![
            patch
                .starting_balance
                .unwrap_or(account.starting_balance)
                .to_string(),
            patch
                .goal
                .unwrap_or(account.goal)
                .map(|d| d.to_string()),
            patch
                .annual_rate
                .unwrap_or(account.annual_rate)
                .map(|d| d.to_string()),
            patch
                .monthly_target
                .unwrap_or(account.monthly_target)
                .map(|d| d.to_string()),
            account_id,
            owner
        ],
    )?;
    if patch.starting_balance.is_some() {
        recompute_account(&tx, account_id)?;
    }
    let updated = get_account(&tx, owner, account_id)?;
    tx.commit()?;
    Ok(updated)
}

/// Hard delete: the account's transactions and rules go with it via
/// ON DELETE CASCADE. This domain keeps no tombstones.
pub fn delete_account(conn: &Connection, owner: &str, account_id: i64) -> CoreResult<()> {
    let n = conn.execute(
        "DELETE FROM savings_accounts WHERE id=?1 AND owner=?2",
        params![account_id, owner],
    )?;
    if n == 0 {
        return Err(CoreError::NotFound("savings account"));
    }
    Ok(())
}

/// Append one savings transaction and refold the balance as one unit of
/// work. A manual insert that collides with an already-generated recurring
/// period is a `DuplicatePeriod` conflict, unlike the evaluator's silent
/// skip.
pub fn create_transaction(
    conn: &mut Connection,
    owner: &str,
    account_id: i64,
    input: &SavingsTxInput,
) -> CoreResult<SavingsTransaction> {
    input.validate()?;
    get_account(conn, owner, account_id)?;
    if let Some(rule_id) = input.rule_id {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM recurring_rules WHERE id=?1 AND owner=?2 AND account_id=?3",
                params![rule_id, owner, account_id],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(CoreError::NotFound("recurring rule"));
        }
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let res = tx.execute(
        "INSERT INTO savings_transactions
            (owner, account_id, kind, amount, year, month, day, status, source, rule_id, notes)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            owner,
            account_id,
            input.kind.as_str(),
            input.amount.to_string(),
            input.period.year,
            input.period.month,
            input.period.day,
            input.status.as_str(),
            input.source.as_str(),
            input.rule_id,
            input.notes
        ],
    );
    if let Err(e) = res {
        return Err(if CoreError::is_unique_violation(&e) {
            CoreError::DuplicatePeriod {
                year: input.period.year,
                month: input.period.month,
            }
        } else {
            e.into()
        });
    }
    let tx_id = tx.last_insert_rowid();
    recompute_account(&tx, account_id)?;
    let created = get_transaction(&tx, owner, tx_id)?;
    tx.commit()?;
    Ok(created)
}

/// Status moves one way: pending -> completed. The reverse would silently
/// invalidate a balance the owner may already have acted on.
pub fn set_transaction_status(
    conn: &mut Connection,
    owner: &str,
    tx_id: i64,
    new_status: TxStatus,
) -> CoreResult<SavingsTransaction> {
    let current = get_transaction(conn, owner, tx_id)?;
    if current.status == new_status {
        return Ok(current);
    }
    if current.status == TxStatus::Completed && new_status == TxStatus::Pending {
        return Err(CoreError::InvalidState(
            "completed transactions cannot revert to pending".into(),
        ));
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "UPDATE savings_transactions SET status=?1 WHERE id=?2 AND owner=?3",
        params![new_status.as_str(), tx_id, owner],
    )?;
    recompute_account(&tx, current.account_id)?;
    let updated = get_transaction(&tx, owner, tx_id)?;
    tx.commit()?;
    Ok(updated)
}

/// Remove one transaction and refold, atomically. Completed recurring rows
/// are locked: deleting generated history would let it silently regenerate.
pub fn delete_transaction(conn: &mut Connection, owner: &str, tx_id: i64) -> CoreResult<()> {
    let existing = get_transaction(conn, owner, tx_id)?;
    if existing.status == TxStatus::Completed && existing.source == TxSource::Recurring {
        return Err(CoreError::InvalidState(
            "completed recurring transactions cannot be deleted".into(),
        ));
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "DELETE FROM savings_transactions WHERE id=?1 AND owner=?2",
        params![tx_id, owner],
    )?;
    recompute_account(&tx, existing.account_id)?;
    tx.commit()?;
    Ok(())
}

pub fn get_transaction(
    conn: &Connection,
    owner: &str,
    tx_id: i64,
) -> CoreResult<SavingsTransaction> {
    let mut txs = query_transactions(
        conn,
        "WHERE t.id=?1 AND t.owner=?2",
        params![tx_id, owner],
    )?;
    txs.pop().ok_or(CoreError::NotFound("transaction"))
}

/// Full history for one account in replay order. Read-only.
pub fn list_transactions(
    conn: &Connection,
    owner: &str,
    account_id: i64,
) -> CoreResult<Vec<SavingsTransaction>> {
    query_transactions(
        conn,
        "WHERE t.account_id=?1 AND t.owner=?2",
        params![account_id, owner],
    )
}

fn query_transactions(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> CoreResult<Vec<SavingsTransaction>> {
    let sql = format!(
        "SELECT t.id, t.owner, t.account_id, t.kind, t.amount, t.year, t.month, t.day,
                t.status, t.source, t.rule_id, t.notes, t.created_at
         FROM savings_transactions t {}
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
            r.get::<_, i32>(5)?,
            r.get::<_, u32>(6)?,
            r.get::<_, Option<u32>>(7)?,
            r.get::<_, String>(8)?,
            r.get::<_, String>(9)?,
            r.get::<_, Option<i64>>(10)?,
            r.get::<_, Option<String>>(11)?,
            r.get::<_, String>(12)?,
        ))
    })?;
    let mut txs = Vec::new();
    for row in rows {
        let (id, owner, account_id, kind_s, amount_s, year, month, day, status_s, source_s, rule_id, notes, created_at) =
            row?;
        let kind = SavingsTxKind::parse(&kind_s)
            .ok_or_else(|| CoreError::Corrupt(format!("transaction kind '{}'", kind_s)))?;
        let status = TxStatus::parse(&status_s)
            .ok_or_else(|| CoreError::Corrupt(format!("status '{}'", status_s)))?;
        let source = TxSource::parse(&source_s)
            .ok_or_else(|| CoreError::Corrupt(format!("source '{}'", source_s)))?;
        txs.push(SavingsTransaction {
            id,
            owner,
            account_id,
            kind,
            amount: stored_decimal(&amount_s, "amount")?,
            period: Period::new(year, month, day),
            status,
            source,
            rule_id,
            notes,
            created_at,
        });
    }
    Ok(txs)
}

/// The only writer of `current_balance`: reload the full log, refold from
/// the starting balance, write the result back.
pub fn recompute_account(conn: &Connection, account_id: i64) -> CoreResult<Decimal> {
    let (owner, start_s): (String, String) = conn.query_row(
        "SELECT owner, starting_balance FROM savings_accounts WHERE id=?1",
        params![account_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let starting = stored_decimal(&start_s, "starting_balance")?;
    let txs = query_transactions(
        conn,
        "WHERE t.account_id=?1 AND t.owner=?2",
        params![account_id, owner],
    )?;
    let balance = fold_savings(starting, &txs);
    conn.execute(
        "UPDATE savings_accounts SET current_balance=?1 WHERE id=?2",
        params![balance.to_string(), account_id],
    )?;
    Ok(balance)
}
