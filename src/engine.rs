//! Single-entry exchange facade.
//!
//! [`Exchange`] wraps the [`Store`] and exposes the public operations:
//! submit/cancel/query orders, the order book projection, trade history, and
//! the balance operations. Every public operation runs as one transaction —
//! all of its mutations commit together or none do, and no intermediate
//! state is externally observable.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use log::info;

use crate::error::{ExchangeError, Result};
use crate::ledger;
use crate::matching::match_order;
use crate::order_book::{project_order_book, OrderBookView};
use crate::store::{Store, StoreSnapshot, Txn};
use crate::types::{Instrument, InstrumentId, OrderBody, OrderId, Status, UserId};

/// Outcome of an order submission: id plus the state matching left it in.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubmitResult {
    pub order_id: OrderId,
    pub status: Status,
    pub filled: Decimal,
}

/// Owner-facing order view with the ticker resolved.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub status: Status,
    pub user_id: UserId,
    pub timestamp: u64,
    pub ticker: String,
    pub body: OrderBody,
    pub filled: Decimal,
}

/// One executed-trade row of the public history.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TradeTick {
    pub ticker: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub timestamp: u64,
}

/// The exchange core. Shareable across request handlers: every method takes
/// `&self` and serializes through the store's transaction lock.
#[derive(Debug, Default)]
pub struct Exchange {
    store: Store,
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            store: Store::new(),
        }
    }

    /// Submits an order: persists it, matches it against the resting
    /// opposite side, settles its fill state, and commits — atomically.
    pub fn submit_order(
        &self,
        user_id: UserId,
        ticker: &str,
        body: OrderBody,
    ) -> Result<SubmitResult> {
        if body.quantity() <= Decimal::ZERO {
            return Err(ExchangeError::InvalidArgument(format!(
                "order quantity must be positive, got {}",
                body.quantity()
            )));
        }
        if let Some(price) = body.price() {
            if price <= Decimal::ZERO {
                return Err(ExchangeError::InvalidArgument(format!(
                    "limit price must be positive, got {price}"
                )));
            }
        }

        let mut txn = self.store.begin();
        let instrument_id = txn.resolve_instrument(ticker)?;
        let order = txn.insert_order(user_id, instrument_id, body);
        info!(
            "order submitted order_id={} user_id={} ticker={} direction={:?} quantity={} price={:?}",
            order.id.0,
            user_id.0,
            ticker,
            body.direction(),
            body.quantity(),
            body.price()
        );

        let fills = match_order(&mut txn, &order)?;
        let filled: Decimal = fills.iter().map(|f| f.quantity).sum();
        if filled > Decimal::ZERO {
            txn.apply_fill(order.id, filled)?;
        }
        let status = Status::from_filled(filled, body.quantity());
        txn.commit();

        for fill in &fills {
            info!(
                "fill taker_order={} maker_order={} price={} quantity={}",
                order.id.0, fill.maker_order_id.0, fill.price, fill.quantity
            );
        }
        info!(
            "order settled order_id={} status={:?} filled={}",
            order.id.0, status, filled
        );
        Ok(SubmitResult {
            order_id: order.id,
            status,
            filled,
        })
    }

    /// Cancels a resting order owned by `user_id`.
    ///
    /// A missing order and an order owned by someone else are both
    /// `NotFound`; a terminal order is `Conflict` with no state change.
    pub fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<()> {
        let mut txn = self.store.begin();
        let order = txn
            .order(order_id)
            .filter(|o| o.user_id == user_id)
            .cloned()
            .ok_or_else(|| ExchangeError::NotFound(format!("order {}", order_id.0)))?;
        if !order.is_resting() {
            return Err(ExchangeError::Conflict(format!(
                "order {} is {:?}",
                order_id.0, order.status
            )));
        }
        txn.set_order_status(order_id, Status::Cancelled)?;
        txn.commit();
        info!("order cancelled order_id={} user_id={}", order_id.0, user_id.0);
        Ok(())
    }

    /// One order, owner-scoped: an id that exists under a different owner is
    /// reported as `NotFound`.
    pub fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderDetail> {
        let txn = self.store.begin();
        txn.order(order_id)
            .filter(|o| o.user_id == user_id)
            .map(|o| detail(&txn, o))
            .ok_or_else(|| ExchangeError::NotFound(format!("order {}", order_id.0)))
    }

    /// All orders ever created by `user_id`, oldest first.
    pub fn list_orders(&self, user_id: UserId) -> Vec<OrderDetail> {
        let txn = self.store.begin();
        txn.orders_by_owner(user_id)
            .iter()
            .map(|o| detail(&txn, o))
            .collect()
    }

    /// Resting limit orders for one instrument: bids price-descending, asks
    /// price-ascending, up to `limit` entries per side. Entries are single
    /// resting orders reporting unfilled quantity, not aggregated levels.
    pub fn order_book(&self, ticker: &str, limit: usize) -> Result<OrderBookView> {
        let txn = self.store.begin();
        let instrument_id = txn.resolve_instrument(ticker)?;
        Ok(project_order_book(&txn, instrument_id, limit))
    }

    /// Most recent trades for one instrument, newest first.
    pub fn trade_history(&self, ticker: &str, limit: usize) -> Result<Vec<TradeTick>> {
        let txn = self.store.begin();
        let instrument_id = txn.resolve_instrument(ticker)?;
        Ok(txn
            .trades_for(instrument_id, limit)
            .into_iter()
            .map(|t| TradeTick {
                ticker: ticker.to_string(),
                price: t.price,
                amount: t.amount,
                timestamp: t.timestamp,
            })
            .collect())
    }

    /// Credits `amount` of the instrument to the user's balance.
    pub fn deposit(&self, user_id: UserId, ticker: &str, amount: Decimal) -> Result<()> {
        let mut txn = self.store.begin();
        let instrument_id = txn.resolve_instrument(ticker)?;
        ledger::deposit(&mut txn, user_id, instrument_id, amount)?;
        txn.commit();
        info!(
            "deposit user_id={} ticker={} amount={}",
            user_id.0, ticker, amount
        );
        Ok(())
    }

    /// Debits `amount` from the user's balance, refusing overdraft.
    pub fn withdraw(&self, user_id: UserId, ticker: &str, amount: Decimal) -> Result<()> {
        let mut txn = self.store.begin();
        let instrument_id = txn.resolve_instrument(ticker)?;
        ledger::withdraw(&mut txn, user_id, instrument_id, amount)?;
        txn.commit();
        info!(
            "withdraw user_id={} ticker={} amount={}",
            user_id.0, ticker, amount
        );
        Ok(())
    }

    /// Ticker → amount for every positive balance of the user.
    pub fn balances(&self, user_id: UserId) -> BTreeMap<String, Decimal> {
        let txn = self.store.begin();
        ledger::balances_of(&txn, user_id)
            .into_iter()
            .map(|(instrument_id, amount)| (ticker_of(&txn, instrument_id), amount))
            .collect()
    }

    /// Lists an instrument (catalog seam). `Conflict` on duplicate ticker or name.
    pub fn register_instrument(&self, ticker: &str, name: &str) -> Result<InstrumentId> {
        let mut txn = self.store.begin();
        let id = txn.register_instrument(ticker, name)?;
        txn.commit();
        info!("instrument listed ticker={} name={}", ticker, name);
        Ok(id)
    }

    /// Delists an instrument; refused while orders still rest on it.
    pub fn remove_instrument(&self, ticker: &str) -> Result<()> {
        let mut txn = self.store.begin();
        txn.remove_instrument(ticker)?;
        txn.commit();
        info!("instrument delisted ticker={}", ticker);
        Ok(())
    }

    /// The current instrument catalog.
    pub fn instruments(&self) -> Vec<Instrument> {
        self.store.begin().instruments().to_vec()
    }

    /// Exports the full state for persistence.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    /// Replaces the full state from a snapshot (startup recovery).
    pub fn restore(&self, snapshot: StoreSnapshot) {
        self.store.restore(snapshot);
    }
}

fn detail(txn: &Txn<'_>, order: &crate::types::OrderRecord) -> OrderDetail {
    OrderDetail {
        id: order.id,
        status: order.status,
        user_id: order.user_id,
        timestamp: order.timestamp,
        ticker: ticker_of(txn, order.instrument_id),
        body: order.body,
        filled: order.filled,
    }
}

/// Delisted instruments keep their history; fall back to the raw id.
fn ticker_of(txn: &Txn<'_>, instrument_id: InstrumentId) -> String {
    txn.instrument(instrument_id)
        .map(|i| i.ticker.clone())
        .unwrap_or_else(|| format!("#{}", instrument_id.0))
}
