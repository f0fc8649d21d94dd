// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rust_decimal::Decimal;

use crate::error::CoreError;
use crate::models::Period;

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Parse `YYYY-MM` or `YYYY-MM-DD` into a period.
pub fn parse_period(s: &str) -> Result<Period> {
    let parts: Vec<&str> = s.split('-').collect();
    let period = match parts.as_slice() {
        [y, m] => Period::new(y.parse()?, m.parse()?, None),
        [y, m, d] => Period::new(y.parse()?, m.parse()?, Some(d.parse()?)),
        _ => anyhow::bail!("Invalid period '{}', expected YYYY-MM or YYYY-MM-DD", s),
    };
    period
        .validate()
        .with_context(|| format!("Invalid period '{}'", s))?;
    Ok(period)
}

/// Decode a decimal persisted as TEXT. A parse failure here means the row
/// itself is damaged, not that the caller sent bad input.
pub fn stored_decimal(s: &str, what: &str) -> Result<Decimal, CoreError> {
    Decimal::from_str_exact(s).map_err(|_| CoreError::Corrupt(format!("{} '{}'", what, s)))
}

/// Significant fractional digits, ignoring trailing zeros.
pub fn scale_of(d: Decimal) -> u32 {
    d.normalize().scale()
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
