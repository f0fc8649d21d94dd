// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recurring deposit rules and their evaluator.
//!
//! A rule is a template for a monthly capital_add. The evaluator walks the
//! months from the rule's start to `min(now, end)` and makes sure exactly one
//! generated transaction exists per period. Duplicates are expected
//! steady-state (the unique index swallows them); re-running on any schedule
//! converges to the same set of rows. The reference month is always passed in
//! by the caller, never read from a clock here.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::models::{RecurringRule, RuleMode};
use crate::savings::recompute_account;
use crate::utils::{scale_of, stored_decimal};

#[derive(Debug, Clone)]
pub struct RuleInput {
    pub account_id: i64,
    pub amount: Decimal,
    pub day_of_month: u32,
    pub start_year: i32,
    pub start_month: u32,
    /// Both-or-neither; `end >= start` when present.
    pub end: Option<(i32, u32)>,
    pub mode: RuleMode,
    pub active: bool,
}

impl RuleInput {
    pub fn validate(&self) -> CoreResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(CoreError::validation("amount", "must be positive"));
        }
        if scale_of(self.amount) > 2 {
            return Err(CoreError::validation("amount", "at most 2 decimal places"));
        }
        // Capped at 28 so every month of every year has the date.
        if !(1..=28).contains(&self.day_of_month) {
            return Err(CoreError::validation(
                "day_of_month",
                "must be between 1 and 28",
            ));
        }
        if !(1..=12).contains(&self.start_month) {
            return Err(CoreError::validation("start", "month out of range 1-12"));
        }
        if !(1900..=2200).contains(&self.start_year) {
            return Err(CoreError::validation(
                "start",
                format!("year {} out of range", self.start_year),
            ));
        }
        if let Some((ey, em)) = self.end {
            if !(1..=12).contains(&em) {
                return Err(CoreError::validation("end", "month out of range 1-12"));
            }
            if !(1900..=2200).contains(&ey) {
                return Err(CoreError::validation(
                    "end",
                    format!("year {} out of range", ey),
                ));
            }
            let start_idx = self.start_year * 12 + self.start_month as i32;
            let end_idx = ey * 12 + em as i32;
            if end_idx < start_idx {
                return Err(CoreError::validation("end", "must not precede start"));
            }
        }
        Ok(())
    }
}

/// Outcome of one generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub created: u32,
    /// Periods already materialized by an earlier pass; normal, not an error.
    pub skipped: u32,
}

/// The exact set of (year, month) periods a rule owes between its start and
/// `min(now, end)`, inclusive. Pure; months compared as flat `year*12+month`
/// indexes so December/January never rolls over wrong.
pub fn due_periods(rule: &RecurringRule, now_year: i32, now_month: u32) -> Vec<(i32, u32)> {
    let now_idx = now_year * 12 + now_month as i32;
    let mut limit = now_idx;
    if let Some(end_idx) = rule.end_index() {
        limit = limit.min(end_idx);
    }
    let mut periods = Vec::new();
    let mut idx = rule.start_index();
    while idx <= limit {
        let year = (idx - 1).div_euclid(12);
        let month = ((idx - 1).rem_euclid(12) + 1) as u32;
        periods.push((year, month));
        idx += 1;
    }
    periods
}

pub fn create_rule(conn: &Connection, owner: &str, input: &RuleInput) -> CoreResult<RecurringRule> {
    input.validate()?;
    let account: Option<i64> = conn
        .query_row(
            "SELECT id FROM savings_accounts WHERE id=?1 AND owner=?2",
            params![input.account_id, owner],
            |r| r.get(0),
        )
        .optional()?;
    if account.is_none() {
        return Err(CoreError::NotFound("savings account"));
    }
    conn.execute(
        "INSERT INTO recurring_rules
            (owner, account_id, amount, day_of_month, start_year, start_month,
             end_year, end_month, mode, active)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            owner,
            input.account_id,
            input.amount.to_string(),
            input.day_of_month,
            input.start_year,
            input.start_month,
            input.end.map(|(y, _)| y),
            input.end.map(|(_, m)| m),
            input.mode.as_str(),
            input.active
        ],
    )?;
    get_rule(conn, owner, conn.last_insert_rowid())
}

pub fn update_rule(
    conn: &Connection,
    owner: &str,
    rule_id: i64,
    input: &RuleInput,
) -> CoreResult<RecurringRule> {
    input.validate()?;
    let existing = get_rule(conn, owner, rule_id)?;
    if input.account_id != existing.account_id {
        return Err(CoreError::validation(
            "account_id",
            "a rule cannot move between accounts",
        ));
    }
    conn.execute(
        "UPDATE recurring_rules
         SET amount=?1, day_of_month=?2, start_year=?3, start_month=?4,
             end_year=?5, end_month=?6, mode=?7, active=?8
         WHERE id=?9 AND owner=?10",
        params![
            input.amount.to_string(),
            input.day_of_month,
            input.start_year,
            input.start_month,
            input.end.map(|(y, _)| y),
            input.end.map(|(_, m)| m),
            input.mode.as_str(),
            input.active,
            rule_id,
            owner
        ],
    )?;
    get_rule(conn, owner, rule_id)
}

pub fn delete_rule(conn: &Connection, owner: &str, rule_id: i64) -> CoreResult<()> {
    let n = conn.execute(
        "DELETE FROM recurring_rules WHERE id=?1 AND owner=?2",
        params![rule_id, owner],
    )?;
    if n == 0 {
        return Err(CoreError::NotFound("recurring rule"));
    }
    Ok(())
}

pub fn get_rule(conn: &Connection, owner: &str, rule_id: i64) -> CoreResult<RecurringRule> {
    let mut rules = query_rules(conn, "WHERE id=?1 AND owner=?2", params![rule_id, owner])?;
    rules.pop().ok_or(CoreError::NotFound("recurring rule"))
}

pub fn list_rules(conn: &Connection, owner: &str) -> CoreResult<Vec<RecurringRule>> {
    query_rules(conn, "WHERE owner=?1 ORDER BY id", params![owner])
}

fn query_rules(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> CoreResult<Vec<RecurringRule>> {
    let sql = format!(
        "SELECT id, owner, account_id, amount, day_of_month, start_year, start_month,
                end_year, end_month, mode, active, last_generated_at
         FROM recurring_rules {}",
        filter
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params, |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, u32>(4)?,
            r.get::<_, i32>(5)?,
            r.get::<_, u32>(6)?,
            r.get::<_, Option<i32>>(7)?,
            r.get::<_, Option<u32>>(8)?,
            r.get::<_, String>(9)?,
            r.get::<_, bool>(10)?,
            r.get::<_, Option<String>>(11)?,
        ))
    })?;
    let mut rules = Vec::new();
    for row in rows {
        let (id, owner, account_id, amount_s, day, sy, sm, ey, em, mode_s, active, last_gen) = row?;
        let mode = RuleMode::parse(&mode_s)
            .ok_or_else(|| CoreError::Corrupt(format!("rule mode '{}'", mode_s)))?;
        rules.push(RecurringRule {
            id,
            owner,
            account_id,
            amount: stored_decimal(&amount_s, "amount")?,
            day_of_month: day,
            start_year: sy,
            start_month: sm,
            end_year: ey,
            end_month: em,
            mode,
            active,
            last_generated_at: last_gen,
        });
    }
    Ok(rules)
}

/// Materialize every missing recurring deposit for the caller's active
/// rules, up to the given reference month.
///
/// Per rule: skip entirely if the parent account is gone, otherwise insert
/// one row per due period inside a single unit of work, letting the unique
/// index drop periods an earlier pass already covered, and refold the
/// account balance when anything landed. `last_generated_at` is touched
/// after the attempt, outside the atomic scope — bookkeeping, not an
/// invariant.
pub fn generate_missing(
    conn: &mut Connection,
    owner: &str,
    now_year: i32,
    now_month: u32,
) -> CoreResult<GenerationReport> {
    let rules: Vec<RecurringRule> = list_rules(conn, owner)?
        .into_iter()
        .filter(|r| r.active)
        .collect();

    let mut report = GenerationReport::default();
    for rule in rules {
        let account: Option<i64> = conn
            .query_row(
                "SELECT id FROM savings_accounts WHERE id=?1 AND owner=?2",
                params![rule.account_id, owner],
                |r| r.get(0),
            )
            .optional()?;
        if account.is_none() {
            continue;
        }

        let periods = due_periods(&rule, now_year, now_month);
        let status = rule.mode.generated_status();

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut created = 0u32;
        for (year, month) in &periods {
            // OR IGNORE rides on idx_savings_tx_recurring_once: an
            // already-generated period inserts zero rows.
            let n = tx.execute(
                "INSERT OR IGNORE INTO savings_transactions
                    (owner, account_id, kind, amount, year, month, day, status, source, rule_id)
                 VALUES (?1,?2,'capital_add',?3,?4,?5,?6,?7,'recurring',?8)",
                params![
                    owner,
                    rule.account_id,
                    rule.amount.to_string(),
                    year,
                    month,
                    rule.day_of_month,
                    status.as_str(),
                    rule.id
                ],
            )?;
            created += n as u32;
        }
        if created > 0 {
            recompute_account(&tx, rule.account_id)?;
        }
        tx.commit()?;

        report.created += created;
        report.skipped += periods.len() as u32 - created;

        conn.execute(
            "UPDATE recurring_rules SET last_generated_at=datetime('now') WHERE id=?1",
            params![rule.id],
        )?;
    }
    Ok(report)
}
