//! Price-time priority matching.
//!
//! [`match_order`] runs one incoming order against the resting opposite side
//! inside the caller's transaction: selects eligible candidates, consumes
//! them best price first (earliest first on ties), mutates their fill state,
//! and appends one trade per fill at the maker's price.

use rust_decimal::Decimal;

use crate::error::Result;
use crate::store::Txn;
use crate::types::{Direction, OrderId, OrderRecord};

/// One fill applied to a resting (maker) order.
#[derive(Clone, Debug)]
pub struct Fill {
    pub maker_order_id: OrderId,
    /// The maker's limit price; the trade executes at this price.
    pub price: Decimal,
    pub quantity: Decimal,
    /// True if this fill exhausted the maker's remaining quantity.
    pub maker_fully_filled: bool,
}

/// Matches `taker` against resting opposite-side limit orders.
///
/// Candidates: same instrument, opposite direction, resting status, and
/// price-eligible — a buy taker accepts asks at or below its limit, a sell
/// taker accepts bids at or above its limit, a market taker accepts any
/// price. Candidates are consumed in price-time priority: best price first
/// (lowest ask for a buy, highest bid for a sell), earliest timestamp on
/// ties. Each fill updates the maker's filled/status and appends a trade at
/// the maker's price. The taker record itself is not mutated here; the
/// caller settles it from the returned fills.
pub fn match_order(txn: &mut Txn<'_>, taker: &OrderRecord) -> Result<Vec<Fill>> {
    let direction = taker.body.direction();
    let mut candidates = txn.resting_limit_orders(taker.instrument_id, direction.opposite());

    if let Some(limit) = taker.body.price() {
        candidates.retain(|c| match direction {
            Direction::Buy => c.body.price().is_some_and(|ask| ask <= limit),
            Direction::Sell => c.body.price().is_some_and(|bid| bid >= limit),
        });
    }

    match direction {
        // Buy taker: lowest ask first.
        Direction::Buy => candidates.sort_by(|a, b| {
            a.body
                .price()
                .cmp(&b.body.price())
                .then(a.timestamp.cmp(&b.timestamp))
        }),
        // Sell taker: highest bid first.
        Direction::Sell => candidates.sort_by(|a, b| {
            b.body
                .price()
                .cmp(&a.body.price())
                .then(a.timestamp.cmp(&b.timestamp))
        }),
    }

    let mut remaining = taker.body.quantity();
    let mut fills = Vec::new();
    for candidate in candidates {
        if remaining <= Decimal::ZERO {
            break;
        }
        let Some(price) = candidate.body.price() else {
            continue;
        };
        let fill_qty = remaining.min(candidate.remaining());
        if fill_qty <= Decimal::ZERO {
            continue;
        }
        txn.apply_fill(candidate.id, fill_qty)?;
        txn.record_trade(taker.instrument_id, price, fill_qty);
        remaining -= fill_qty;
        fills.push(Fill {
            maker_order_id: candidate.id,
            price,
            quantity: fill_qty,
            maker_fully_filled: fill_qty >= candidate.remaining(),
        });
    }
    Ok(fills)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::types::{OrderBody, Status, UserId};

    fn limit(direction: Direction, qty: i64, price: i64) -> OrderBody {
        OrderBody::Limit {
            direction,
            quantity: Decimal::from(qty),
            price: Decimal::from(price),
        }
    }

    fn market(direction: Direction, qty: i64) -> OrderBody {
        OrderBody::Market {
            direction,
            quantity: Decimal::from(qty),
        }
    }

    #[test]
    fn equal_price_full_match() {
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        let maker = txn.insert_order(UserId(1), btc, limit(Direction::Sell, 10, 100));
        let taker = txn.insert_order(UserId(2), btc, limit(Direction::Buy, 10, 100));

        let fills = match_order(&mut txn, &taker).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].quantity, Decimal::from(10));
        assert_eq!(fills[0].price, Decimal::from(100));
        assert!(fills[0].maker_fully_filled);

        let maker = txn.order(maker.id).unwrap();
        assert_eq!(maker.status, Status::Executed);
        assert_eq!(maker.filled, Decimal::from(10));
        assert_eq!(txn.trades_for(btc, 10).len(), 1);
    }

    #[test]
    fn partial_fill_executes_at_maker_price() {
        // resting SELL 5@100; incoming BUY 10@101 fills 5 at 100
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        let maker = txn.insert_order(UserId(1), btc, limit(Direction::Sell, 5, 100));
        let taker = txn.insert_order(UserId(2), btc, limit(Direction::Buy, 10, 101));

        let fills = match_order(&mut txn, &taker).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, Decimal::from(100));
        assert_eq!(fills[0].quantity, Decimal::from(5));
        assert_eq!(txn.order(maker.id).unwrap().status, Status::Executed);

        let trades = txn.trades_for(btc, 10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Decimal::from(100));
    }

    #[test]
    fn buy_taker_consumes_lowest_ask_first() {
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        let worse = txn.insert_order(UserId(1), btc, limit(Direction::Sell, 5, 102));
        let best = txn.insert_order(UserId(1), btc, limit(Direction::Sell, 5, 100));
        let taker = txn.insert_order(UserId(2), btc, limit(Direction::Buy, 5, 105));

        let fills = match_order(&mut txn, &taker).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].maker_order_id, best.id);
        assert_eq!(txn.order(worse.id).unwrap().filled, Decimal::ZERO);
    }

    #[test]
    fn sell_taker_consumes_highest_bid_first() {
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        let worse = txn.insert_order(UserId(1), btc, limit(Direction::Buy, 5, 98));
        let best = txn.insert_order(UserId(1), btc, limit(Direction::Buy, 5, 101));
        let taker = txn.insert_order(UserId(2), btc, limit(Direction::Sell, 5, 97));

        let fills = match_order(&mut txn, &taker).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].maker_order_id, best.id);
        assert_eq!(fills[0].price, Decimal::from(101));
        assert_eq!(txn.order(worse.id).unwrap().filled, Decimal::ZERO);
    }

    #[test]
    fn equal_prices_fill_in_timestamp_order() {
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        let first = txn.insert_order(UserId(1), btc, limit(Direction::Sell, 5, 100));
        let second = txn.insert_order(UserId(2), btc, limit(Direction::Sell, 5, 100));
        let taker = txn.insert_order(UserId(3), btc, limit(Direction::Buy, 7, 100));

        let fills = match_order(&mut txn, &taker).unwrap();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].maker_order_id, first.id);
        assert_eq!(fills[0].quantity, Decimal::from(5));
        assert_eq!(fills[1].maker_order_id, second.id);
        assert_eq!(fills[1].quantity, Decimal::from(2));
        assert_eq!(txn.order(second.id).unwrap().status, Status::PartiallyExecuted);
    }

    #[test]
    fn price_ineligible_candidates_not_touched() {
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        txn.insert_order(UserId(1), btc, limit(Direction::Sell, 5, 105));
        let taker = txn.insert_order(UserId(2), btc, limit(Direction::Buy, 5, 100));

        let fills = match_order(&mut txn, &taker).unwrap();
        assert!(fills.is_empty());
        assert!(txn.trades_for(btc, 10).is_empty());
    }

    #[test]
    fn market_taker_accepts_any_price_and_walks_the_book() {
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        txn.insert_order(UserId(1), btc, limit(Direction::Sell, 3, 100));
        txn.insert_order(UserId(1), btc, limit(Direction::Sell, 3, 200));
        let taker = txn.insert_order(UserId(2), btc, market(Direction::Buy, 5));

        let fills = match_order(&mut txn, &taker).unwrap();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].price, Decimal::from(100));
        assert_eq!(fills[1].price, Decimal::from(200));
        assert_eq!(fills[1].quantity, Decimal::from(2));
    }

    #[test]
    fn resting_market_orders_are_never_makers() {
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        let resting_market = txn.insert_order(UserId(1), btc, market(Direction::Sell, 5));
        let taker = txn.insert_order(UserId(2), btc, limit(Direction::Buy, 5, 100));

        let fills = match_order(&mut txn, &taker).unwrap();
        assert!(fills.is_empty());
        assert_eq!(txn.order(resting_market.id).unwrap().filled, Decimal::ZERO);
    }

    #[test]
    fn fill_quantities_conserve_taker_consumption() {
        let store = Store::new();
        let mut txn = store.begin();
        let btc = txn.register_instrument("BTC", "Bitcoin").unwrap();
        for (qty, price) in [(4i64, 99i64), (4, 100), (4, 101)] {
            txn.insert_order(UserId(1), btc, limit(Direction::Sell, qty, price));
        }
        let taker = txn.insert_order(UserId(2), btc, limit(Direction::Buy, 10, 101));

        let fills = match_order(&mut txn, &taker).unwrap();
        let total: Decimal = fills.iter().map(|f| f.quantity).sum();
        assert_eq!(total, Decimal::from(10));
        let trade_total: Decimal = txn.trades_for(btc, 10).iter().map(|t| t.amount).sum();
        assert_eq!(trade_total, Decimal::from(10));
    }
}
