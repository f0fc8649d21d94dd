// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

/// Typed failures for every core operation. Classified at the point of
/// detection and returned, never panicked. Cross-owner access and
/// soft-deleted parents both surface as `NotFound` so the caller cannot
/// probe for another owner's entities.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("invalid state transition: {0}")]
    InvalidState(String),

    #[error("cannot sell {requested} units, only {held} held")]
    InsufficientUnits { requested: Decimal, held: Decimal },

    #[error("a recurring deposit already exists for {year}-{month:02}")]
    DuplicatePeriod { year: i32, month: u32 },

    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl CoreError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Storage failures are transient from the caller's point of view; the
    /// unit of work has been rolled back and the request may be re-sent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Storage(_))
    }

    /// True when an insert failed on a UNIQUE index specifically. CHECK and
    /// foreign-key failures share the generic constraint code and must not
    /// be mistaken for a duplicate row.
    pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t(
                kind TEXT NOT NULL CHECK(kind IN ('a','b')),
                tag TEXT UNIQUE
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn unique_violation_is_recognized() {
        let conn = setup();
        conn.execute("INSERT INTO t(kind, tag) VALUES ('a','x')", []).unwrap();
        let err = conn
            .execute("INSERT INTO t(kind, tag) VALUES ('a','x')", [])
            .unwrap_err();
        assert!(CoreError::is_unique_violation(&err));
    }

    #[test]
    fn check_violation_is_not_a_duplicate() {
        let conn = setup();
        let err = conn
            .execute("INSERT INTO t(kind, tag) VALUES ('z','y')", [])
            .unwrap_err();
        assert!(!CoreError::is_unique_violation(&err));
    }
}
