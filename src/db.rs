// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Finledger", "finledger"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("finledger.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

/// In-memory database with the full schema; used throughout the test suite.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("Open in-memory DB")?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS assets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        symbol TEXT NOT NULL,
        name TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('stock','etf','crypto','gold')),
        total_units TEXT NOT NULL DEFAULT '0',
        total_invested TEXT NOT NULL DEFAULT '0',
        deleted_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    -- Symbol is unique per owner among live assets only; a soft-deleted asset
    -- frees its symbol while its transaction history stays queryable.
    CREATE UNIQUE INDEX IF NOT EXISTS idx_assets_owner_symbol
        ON assets(owner, symbol) WHERE deleted_at IS NULL;

    CREATE TABLE IF NOT EXISTS investment_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        asset_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('buy','sell','dividend')),
        units TEXT NOT NULL,
        price_per_unit TEXT NOT NULL,
        total_amount TEXT NOT NULL,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        day INTEGER,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        FOREIGN KEY(asset_id) REFERENCES assets(id)
    );
    CREATE INDEX IF NOT EXISTS idx_investment_tx_replay
        ON investment_transactions(asset_id, year, month, day, created_at);

    CREATE TABLE IF NOT EXISTS savings_accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        name TEXT NOT NULL,
        starting_balance TEXT NOT NULL DEFAULT '0',
        goal TEXT,
        annual_rate TEXT,
        monthly_target TEXT,
        current_balance TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(owner, name)
    );

    CREATE TABLE IF NOT EXISTS recurring_rules(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        account_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        day_of_month INTEGER NOT NULL CHECK(day_of_month BETWEEN 1 AND 28),
        start_year INTEGER NOT NULL,
        start_month INTEGER NOT NULL,
        end_year INTEGER,
        end_month INTEGER,
        mode TEXT NOT NULL CHECK(mode IN ('pending','auto_confirm')),
        active INTEGER NOT NULL DEFAULT 1,
        last_generated_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(account_id) REFERENCES savings_accounts(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS savings_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        account_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('capital_add','dividend','withdrawal')),
        amount TEXT NOT NULL,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        day INTEGER,
        status TEXT NOT NULL CHECK(status IN ('pending','completed')),
        source TEXT NOT NULL CHECK(source IN ('manual','recurring')),
        rule_id INTEGER,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        FOREIGN KEY(account_id) REFERENCES savings_accounts(id) ON DELETE CASCADE,
        FOREIGN KEY(rule_id) REFERENCES recurring_rules(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_savings_tx_replay
        ON savings_transactions(account_id, year, month, day, created_at);
    -- At most one recurring deposit per (account, rule, year, month).
    -- Enforced at write time so regeneration can race with itself and
    -- still converge on the same set of rows.
    CREATE UNIQUE INDEX IF NOT EXISTS idx_savings_tx_recurring_once
        ON savings_transactions(account_id, rule_id, year, month)
        WHERE source='recurring' AND kind='capital_add';
    "#,
    )?;
    Ok(())
}
