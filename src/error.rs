//! Error taxonomy for the exchange core.
//!
//! Every public operation is transactional: on any error the operation
//! aborts with zero partial mutation and the caller sees the prior state
//! plus one of these variants.

use thiserror::Error;

/// Typed error for every public exchange operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Unknown instrument or order, or an order not owned by the caller
    /// (treated identically to non-existence so ownership never leaks).
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-positive quantity or limit price, or other malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Withdrawal exceeds the available balance. No mutation occurred.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    /// The operation does not apply to current state: cancel on a terminal
    /// order, duplicate instrument identity, delete with resting orders.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Identity/role failure surfaced by the auth collaborator.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Storage-layer failure (snapshot I/O, corrupt state).
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
