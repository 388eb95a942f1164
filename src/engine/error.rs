// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad input rejected before any store write.
    #[error("{0}")]
    Validation(String),

    /// Missing, or owned by somebody else — indistinguishable on purpose.
    #[error("{kind} '{what}' not found")]
    NotFound { kind: &'static str, what: String },

    #[error("source '{name}' is {status} and cannot accept postings")]
    SourceLocked { name: String, status: String },

    /// Advisory at submission time; authoritative when overdraft is denied.
    #[error("insufficient funds: balance {balance}, attempted {attempted}")]
    InsufficientFunds { balance: Decimal, attempted: Decimal },

    /// A concurrent writer held the store past the bounded retry budget.
    #[error("concurrent update conflict; refresh and retry")]
    Conflict,

    #[error("prediction was already {0}")]
    AlreadyResolved(String),

    #[error("corrupt value '{value}' stored for {what}")]
    Storage { what: &'static str, value: String },

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn not_found(kind: &'static str, what: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            what: what.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }
}

/// Parse a value persisted as TEXT, mapping failure to a storage error
/// instead of a validation error: the input was checked at write time, so
/// a bad stored value means the store itself is damaged.
pub(crate) fn parse_stored<T: std::str::FromStr>(
    what: &'static str,
    value: &str,
) -> EngineResult<T> {
    value.parse().map_err(|_| EngineError::Storage {
        what,
        value: value.to_string(),
    })
}

pub(crate) fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}
