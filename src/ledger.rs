//! Balance ledger: per-user, per-instrument available quantity.
//!
//! Deposits upsert-or-add; withdrawals check-then-decrement under the
//! transaction's exclusive hold, so concurrent withdrawals can never jointly
//! overdraw a row. Balances are not consulted by matching; deposits and
//! withdrawals are independent transactions.

use rust_decimal::Decimal;

use crate::error::{ExchangeError, Result};
use crate::store::Txn;
use crate::types::{InstrumentId, UserId};

/// Adds `amount` to the (user, instrument) row, creating it on first deposit.
pub fn deposit(
    txn: &mut Txn<'_>,
    user_id: UserId,
    instrument_id: InstrumentId,
    amount: Decimal,
) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(ExchangeError::InvalidArgument(format!(
            "deposit amount must be positive, got {amount}"
        )));
    }
    txn.credit(user_id, instrument_id, amount);
    Ok(())
}

/// Removes `amount` from the (user, instrument) row. Fails with
/// `InsufficientBalance` and no mutation when the row is absent or short.
pub fn withdraw(
    txn: &mut Txn<'_>,
    user_id: UserId,
    instrument_id: InstrumentId,
    amount: Decimal,
) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(ExchangeError::InvalidArgument(format!(
            "withdraw amount must be positive, got {amount}"
        )));
    }
    txn.debit(user_id, instrument_id, amount)
}

/// All positive balances of a user as (instrument, amount). Rows that have
/// been drawn down to zero are not reported.
pub fn balances_of(txn: &Txn<'_>, user_id: UserId) -> Vec<(InstrumentId, Decimal)> {
    txn.balances_of(user_id)
}
