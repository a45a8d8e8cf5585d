//! Order book projection: read-only bid/ask listing of resting limit orders.
//!
//! Entries are individual resting orders reporting `(price, unfilled qty)` —
//! two orders at the same price appear as two entries, they are not summed
//! into per-price levels. Market orders carry no price and never appear.

use rust_decimal::Decimal;

use crate::store::Txn;
use crate::types::{Direction, InstrumentId};

/// One resting order's visible slice of the book.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub qty: Decimal,
}

/// Bid/ask listing: bids price-descending, asks price-ascending.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrderBookView {
    pub bid_levels: Vec<BookLevel>,
    pub ask_levels: Vec<BookLevel>,
}

/// Assembles the book for one instrument from current store state, up to
/// `limit` entries per side. Ties at one price list earliest order first.
pub fn project_order_book(txn: &Txn<'_>, instrument_id: InstrumentId, limit: usize) -> OrderBookView {
    let mut bids = txn.resting_limit_orders(instrument_id, Direction::Buy);
    bids.sort_by(|a, b| {
        b.body
            .price()
            .cmp(&a.body.price())
            .then(a.timestamp.cmp(&b.timestamp))
    });
    let mut asks = txn.resting_limit_orders(instrument_id, Direction::Sell);
    asks.sort_by(|a, b| {
        a.body
            .price()
            .cmp(&b.body.price())
            .then(a.timestamp.cmp(&b.timestamp))
    });

    let to_level = |o: &crate::types::OrderRecord| BookLevel {
        price: o.body.price().unwrap_or(Decimal::ZERO),
        qty: o.remaining(),
    };
    OrderBookView {
        bid_levels: bids.iter().take(limit).map(to_level).collect(),
        ask_levels: asks.iter().take(limit).map(to_level).collect(),
    }
}
