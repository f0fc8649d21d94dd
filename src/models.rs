// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A calendar period. Transactions are dated to a year/month with an
/// optional day; replay order treats a missing day as the 1st.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
    pub day: Option<u32>,
}

impl Period {
    pub fn new(year: i32, month: u32, day: Option<u32>) -> Self {
        Period { year, month, day }
    }

    /// Months since year zero. Comparing periods as flat month indexes
    /// avoids every December/January rollover pitfall.
    pub fn index(&self) -> i32 {
        self.year * 12 + self.month as i32
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=12).contains(&self.month) {
            return Err(CoreError::validation(
                "period",
                format!("month {} out of range 1-12", self.month),
            ));
        }
        if !(1900..=2200).contains(&self.year) {
            return Err(CoreError::validation(
                "period",
                format!("year {} out of range", self.year),
            ));
        }
        if let Some(d) = self.day {
            // Range alone is not enough: Feb 31 is in 1-31 but not on any
            // calendar.
            if NaiveDate::from_ymd_opt(self.year, self.month, d).is_none() {
                return Err(CoreError::validation(
                    "period",
                    format!("{}-{:02}-{:02} is not a calendar date", self.year, self.month, d),
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.day {
            Some(d) => write!(f, "{}-{:02}-{:02}", self.year, self.month, d),
            None => write!(f, "{}-{:02}", self.year, self.month),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Stock,
    Etf,
    Crypto,
    Gold,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Stock => "stock",
            AssetKind::Etf => "etf",
            AssetKind::Crypto => "crypto",
            AssetKind::Gold => "gold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stock" => Some(AssetKind::Stock),
            "etf" => Some(AssetKind::Etf),
            "crypto" => Some(AssetKind::Crypto),
            "gold" => Some(AssetKind::Gold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentTxKind {
    Buy,
    Sell,
    Dividend,
}

impl InvestmentTxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentTxKind::Buy => "buy",
            InvestmentTxKind::Sell => "sell",
            InvestmentTxKind::Dividend => "dividend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(InvestmentTxKind::Buy),
            "sell" => Some(InvestmentTxKind::Sell),
            "dividend" => Some(InvestmentTxKind::Dividend),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsTxKind {
    CapitalAdd,
    Dividend,
    Withdrawal,
}

impl SavingsTxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavingsTxKind::CapitalAdd => "capital_add",
            SavingsTxKind::Dividend => "dividend",
            SavingsTxKind::Withdrawal => "withdrawal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "capital_add" => Some(SavingsTxKind::CapitalAdd),
            "dividend" => Some(SavingsTxKind::Dividend),
            "withdrawal" => Some(SavingsTxKind::Withdrawal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Completed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TxStatus::Pending),
            "completed" => Some(TxStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxSource {
    Manual,
    Recurring,
}

impl TxSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxSource::Manual => "manual",
            TxSource::Recurring => "recurring",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(TxSource::Manual),
            "recurring" => Some(TxSource::Recurring),
            _ => None,
        }
    }
}

/// Determines the status given to transactions a rule materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    Pending,
    AutoConfirm,
}

impl RuleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleMode::Pending => "pending",
            RuleMode::AutoConfirm => "auto_confirm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RuleMode::Pending),
            "auto_confirm" => Some(RuleMode::AutoConfirm),
            _ => None,
        }
    }

    pub fn generated_status(&self) -> TxStatus {
        match self {
            RuleMode::Pending => TxStatus::Pending,
            RuleMode::AutoConfirm => TxStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub owner: String,
    pub symbol: String,
    pub name: String,
    pub kind: AssetKind,
    /// Derived; written only by the recompute engine.
    pub total_units: Decimal,
    /// Derived; written only by the recompute engine.
    pub total_invested: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentTransaction {
    pub id: i64,
    pub owner: String,
    pub asset_id: i64,
    pub kind: InvestmentTxKind,
    pub units: Decimal,
    pub price_per_unit: Decimal,
    pub total_amount: Decimal,
    pub period: Period,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsAccount {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub starting_balance: Decimal,
    pub goal: Option<Decimal>,
    /// Display-only; never folded into the balance.
    pub annual_rate: Option<Decimal>,
    /// Display-only; never folded into the balance.
    pub monthly_target: Option<Decimal>,
    /// Derived; written only by the recompute engine, stored at full
    /// precision and rounded to 2dp at the display boundary.
    pub current_balance: Decimal,
}

impl SavingsAccount {
    pub fn balance_display(&self) -> Decimal {
        self.current_balance.round_dp(2)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsTransaction {
    pub id: i64,
    pub owner: String,
    pub account_id: i64,
    pub kind: SavingsTxKind,
    pub amount: Decimal,
    pub period: Period,
    pub status: TxStatus,
    pub source: TxSource,
    pub rule_id: Option<i64>,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: i64,
    pub owner: String,
    pub account_id: i64,
    pub amount: Decimal,
    pub day_of_month: u32,
    pub start_year: i32,
    pub start_month: u32,
    pub end_year: Option<i32>,
    pub end_month: Option<u32>,
    pub mode: RuleMode,
    pub active: bool,
    pub last_generated_at: Option<String>,
}

impl RecurringRule {
    pub fn start_index(&self) -> i32 {
        self.start_year * 12 + self.start_month as i32
    }

    pub fn end_index(&self) -> Option<i32> {
        match (self.end_year, self.end_month) {
            (Some(y), Some(m)) => Some(y * 12 + m as i32),
            _ => None,
        }
    }
}
