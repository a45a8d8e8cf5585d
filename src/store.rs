//! Durable store with explicit transactions.
//!
//! [`Store`] owns every table behind one exclusive lock. [`Store::begin`]
//! returns a [`Txn`] handle that all ledger/order/matching operations go
//! through; each mutation records an undo entry, [`Txn::commit`] keeps the
//! state, and any other exit path (error return, panic unwind) rolls back on
//! drop. Holding the lock for the whole transaction serializes every public
//! operation against every other, so a submission's read-candidates→mutate
//! sequence can never interleave with a concurrent submission, cancel, or
//! withdrawal.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;

use crate::error::{ExchangeError, Result};
use crate::types::{
    Instrument, InstrumentId, OrderBody, OrderId, OrderRecord, Status, TradeId, TradeRecord,
    UserId,
};

#[derive(Debug)]
struct Tables {
    instruments: Vec<Instrument>,
    orders: BTreeMap<OrderId, OrderRecord>,
    balances: BTreeMap<(UserId, InstrumentId), Decimal>,
    trades: Vec<TradeRecord>,
    next_order_id: u64,
    next_trade_id: u64,
    next_instrument_id: u64,
    next_seq: u64,
}

impl Tables {
    fn new() -> Self {
        Self {
            instruments: Vec::new(),
            orders: BTreeMap::new(),
            balances: BTreeMap::new(),
            trades: Vec::new(),
            next_order_id: 1,
            next_trade_id: 1,
            next_instrument_id: 1,
            next_seq: 1,
        }
    }
}

/// One undo entry per mutation, replayed in reverse on rollback.
#[derive(Debug)]
enum Undo {
    OrderInsert(OrderId),
    OrderState {
        id: OrderId,
        filled: Decimal,
        status: Status,
    },
    InstrumentInsert(InstrumentId),
    InstrumentRemove { index: usize, instrument: Instrument },
    BalanceSet {
        user_id: UserId,
        instrument_id: InstrumentId,
        prev: Option<Decimal>,
    },
    TradeAppend,
}

/// Exchange-wide store. Cheap to share behind an `Arc`; all access goes
/// through [`Store::begin`].
#[derive(Debug)]
pub struct Store {
    tables: Mutex<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::new()),
        }
    }

    /// Opens a transaction, taking the exclusive store lock until the handle
    /// is committed or dropped.
    pub fn begin(&self) -> Txn<'_> {
        let tables = self.tables.lock().expect("store lock");
        let saved_counters = [
            tables.next_order_id,
            tables.next_trade_id,
            tables.next_instrument_id,
            tables.next_seq,
        ];
        Txn {
            tables,
            undo: Vec::new(),
            saved_counters,
            committed: false,
        }
    }

    /// Exports the full state for persistence.
    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.lock().expect("store lock");
        StoreSnapshot {
            instruments: tables.instruments.clone(),
            orders: tables.orders.values().cloned().collect(),
            balances: tables
                .balances
                .iter()
                .map(|(&(user_id, instrument_id), &amount)| BalanceRow {
                    user_id,
                    instrument_id,
                    amount,
                })
                .collect(),
            trades: tables.trades.clone(),
            next_order_id: tables.next_order_id,
            next_trade_id: tables.next_trade_id,
            next_instrument_id: tables.next_instrument_id,
            next_seq: tables.next_seq,
        }
    }

    /// Replaces the full state from a snapshot (startup recovery).
    pub fn restore(&self, snapshot: StoreSnapshot) {
        let mut tables = self.tables.lock().expect("store lock");
        tables.instruments = snapshot.instruments;
        tables.orders = snapshot.orders.into_iter().map(|o| (o.id, o)).collect();
        tables.balances = snapshot
            .balances
            .into_iter()
            .map(|row| ((row.user_id, row.instrument_id), row.amount))
            .collect();
        tables.trades = snapshot.trades;
        tables.next_order_id = snapshot.next_order_id;
        tables.next_trade_id = snapshot.next_trade_id;
        tables.next_instrument_id = snapshot.next_instrument_id;
        tables.next_seq = snapshot.next_seq;
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable form of the store state (Vec-shaped for JSON).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoreSnapshot {
    pub instruments: Vec<Instrument>,
    pub orders: Vec<OrderRecord>,
    pub balances: Vec<BalanceRow>,
    pub trades: Vec<TradeRecord>,
    pub next_order_id: u64,
    pub next_trade_id: u64,
    pub next_instrument_id: u64,
    pub next_seq: u64,
}

/// One balance row in a snapshot.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BalanceRow {
    pub user_id: UserId,
    pub instrument_id: InstrumentId,
    pub amount: Decimal,
}

/// Transaction handle: all reads see current state, all writes are undone
/// unless [`Txn::commit`] is called.
#[derive(Debug)]
pub struct Txn<'a> {
    tables: MutexGuard<'a, Tables>,
    undo: Vec<Undo>,
    saved_counters: [u64; 4],
    committed: bool,
}

impl Txn<'_> {
    /// Makes every mutation of this transaction permanent.
    pub fn commit(mut self) {
        self.committed = true;
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.tables.next_seq;
        self.tables.next_seq += 1;
        seq
    }

    // --- instrument directory ---

    /// Ticker → instrument id.
    pub fn resolve_instrument(&self, ticker: &str) -> Result<InstrumentId> {
        self.tables
            .instruments
            .iter()
            .find(|i| i.ticker == ticker)
            .map(|i| i.id)
            .ok_or_else(|| ExchangeError::NotFound(format!("instrument {ticker}")))
    }

    pub fn instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.tables.instruments.iter().find(|i| i.id == id)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.tables.instruments
    }

    /// Lists an instrument. Ticker and name must both be new.
    pub fn register_instrument(&mut self, ticker: &str, name: &str) -> Result<InstrumentId> {
        if self
            .tables
            .instruments
            .iter()
            .any(|i| i.ticker == ticker || i.name == name)
        {
            return Err(ExchangeError::Conflict(format!(
                "instrument with ticker {ticker} or name {name} already exists"
            )));
        }
        let id = InstrumentId(self.tables.next_instrument_id);
        self.tables.next_instrument_id += 1;
        self.tables.instruments.push(Instrument {
            id,
            ticker: ticker.to_string(),
            name: name.to_string(),
        });
        self.undo.push(Undo::InstrumentInsert(id));
        Ok(id)
    }

    /// Delists an instrument. Refused while any order still rests on it.
    pub fn remove_instrument(&mut self, ticker: &str) -> Result<()> {
        let index = self
            .tables
            .instruments
            .iter()
            .position(|i| i.ticker == ticker)
            .ok_or_else(|| ExchangeError::NotFound(format!("instrument {ticker}")))?;
        let id = self.tables.instruments[index].id;
        if self.has_resting_orders(id) {
            return Err(ExchangeError::Conflict(format!(
                "instrument {ticker} has resting orders"
            )));
        }
        let instrument = self.tables.instruments.remove(index);
        self.undo.push(Undo::InstrumentRemove { index, instrument });
        Ok(())
    }

    // --- orders ---

    /// Persists a new order: assigned id and timestamp, status New, filled 0.
    pub fn insert_order(
        &mut self,
        user_id: UserId,
        instrument_id: InstrumentId,
        body: OrderBody,
    ) -> OrderRecord {
        let id = OrderId(self.tables.next_order_id);
        self.tables.next_order_id += 1;
        let timestamp = self.next_seq();
        let record = OrderRecord {
            id,
            user_id,
            instrument_id,
            body,
            filled: Decimal::ZERO,
            status: Status::New,
            timestamp,
        };
        self.tables.orders.insert(id, record.clone());
        self.undo.push(Undo::OrderInsert(id));
        record
    }

    pub fn order(&self, id: OrderId) -> Option<&OrderRecord> {
        self.tables.orders.get(&id)
    }

    /// All orders ever created by `user_id`, oldest first.
    pub fn orders_by_owner(&self, user_id: UserId) -> Vec<OrderRecord> {
        self.tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Resting limit orders for one instrument and direction, in id order.
    /// Market orders carry no price and never rest as makers.
    pub fn resting_limit_orders(
        &self,
        instrument_id: InstrumentId,
        direction: crate::types::Direction,
    ) -> Vec<OrderRecord> {
        self.tables
            .orders
            .values()
            .filter(|o| {
                o.instrument_id == instrument_id
                    && o.body.direction() == direction
                    && o.body.is_limit()
                    && o.is_resting()
            })
            .cloned()
            .collect()
    }

    pub fn has_resting_orders(&self, instrument_id: InstrumentId) -> bool {
        self.tables
            .orders
            .values()
            .any(|o| o.instrument_id == instrument_id && o.is_resting())
    }

    /// Applies a fill to an order: filled += qty, status recomputed.
    pub fn apply_fill(&mut self, id: OrderId, qty: Decimal) -> Result<()> {
        let order = self
            .tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| ExchangeError::NotFound(format!("order {}", id.0)))?;
        self.undo.push(Undo::OrderState {
            id,
            filled: order.filled,
            status: order.status,
        });
        order.filled += qty;
        order.status = Status::from_filled(order.filled, order.body.quantity());
        Ok(())
    }

    /// Sets an order's status directly (cancel path).
    pub fn set_order_status(&mut self, id: OrderId, status: Status) -> Result<()> {
        let order = self
            .tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| ExchangeError::NotFound(format!("order {}", id.0)))?;
        self.undo.push(Undo::OrderState {
            id,
            filled: order.filled,
            status: order.status,
        });
        order.status = status;
        Ok(())
    }

    // --- balances ---

    /// Current available amount; zero when no row exists.
    pub fn balance(&self, user_id: UserId, instrument_id: InstrumentId) -> Decimal {
        self.tables
            .balances
            .get(&(user_id, instrument_id))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Upsert-or-add: creates the row on first deposit.
    pub fn credit(&mut self, user_id: UserId, instrument_id: InstrumentId, amount: Decimal) {
        let key = (user_id, instrument_id);
        let prev = self.tables.balances.get(&key).copied();
        self.undo.push(Undo::BalanceSet {
            user_id,
            instrument_id,
            prev,
        });
        *self.tables.balances.entry(key).or_insert(Decimal::ZERO) += amount;
    }

    /// Check-then-decrement under the exclusive store hold. The row never
    /// goes negative; a short row is left untouched.
    pub fn debit(
        &mut self,
        user_id: UserId,
        instrument_id: InstrumentId,
        amount: Decimal,
    ) -> Result<()> {
        let key = (user_id, instrument_id);
        let available = self.tables.balances.get(&key).copied().unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(ExchangeError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.undo.push(Undo::BalanceSet {
            user_id,
            instrument_id,
            prev: Some(available),
        });
        self.tables.balances.insert(key, available - amount);
        Ok(())
    }

    /// All balances of `user_id` with amount > 0, instrument id order.
    pub fn balances_of(&self, user_id: UserId) -> Vec<(InstrumentId, Decimal)> {
        self.tables
            .balances
            .iter()
            .filter(|(&(uid, _), &amount)| uid == user_id && amount > Decimal::ZERO)
            .map(|(&(_, instrument_id), &amount)| (instrument_id, amount))
            .collect()
    }

    // --- trades ---

    /// Appends an immutable trade record.
    pub fn record_trade(
        &mut self,
        instrument_id: InstrumentId,
        price: Decimal,
        amount: Decimal,
    ) -> TradeId {
        let id = TradeId(self.tables.next_trade_id);
        self.tables.next_trade_id += 1;
        let timestamp = self.next_seq();
        self.tables.trades.push(TradeRecord {
            id,
            instrument_id,
            price,
            amount,
            timestamp,
        });
        self.undo.push(Undo::TradeAppend);
        id
    }

    /// Most recent trades for one instrument, newest first, up to `limit`.
    pub fn trades_for(&self, instrument_id: InstrumentId, limit: usize) -> Vec<TradeRecord> {
        self.tables
            .trades
            .iter()
            .rev()
            .filter(|t| t.instrument_id == instrument_id)
            .take(limit)
            .cloned()
            .collect()
    }
}

impl Drop for Txn<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::OrderInsert(id) => {
                    self.tables.orders.remove(&id);
                }
                Undo::OrderState { id, filled, status } => {
                    if let Some(order) = self.tables.orders.get_mut(&id) {
                        order.filled = filled;
                        order.status = status;
                    }
                }
                Undo::InstrumentInsert(id) => {
                    self.tables.instruments.retain(|i| i.id != id);
                }
                Undo::InstrumentRemove { index, instrument } => {
                    self.tables.instruments.insert(index, instrument);
                }
                Undo::BalanceSet {
                    user_id,
                    instrument_id,
                    prev,
                } => match prev {
                    Some(amount) => {
                        self.tables.balances.insert((user_id, instrument_id), amount);
                    }
                    None => {
                        self.tables.balances.remove(&(user_id, instrument_id));
                    }
                },
                Undo::TradeAppend => {
                    self.tables.trades.pop();
                }
            }
        }
        let [order, trade, instrument, seq] = self.saved_counters;
        self.tables.next_order_id = order;
        self.tables.next_trade_id = trade;
        self.tables.next_instrument_id = instrument;
        self.tables.next_seq = seq;
    }
}
