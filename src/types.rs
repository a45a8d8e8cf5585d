//! Core data model: ids, order/trade records, instruments.
//!
//! All identifiers are newtype wrappers. [`OrderBody`] is the tagged
//! market/limit variant the matching logic inspects; [`OrderRecord`] is the
//! durable order row with its lifecycle state.

use rust_decimal::Decimal;

/// Unique order identifier (store-assigned).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct OrderId(pub u64);

/// User identifier. Resolved from credentials by the caller; the core never
/// parses credentials itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct UserId(pub u64);

/// Instrument identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct InstrumentId(pub u64);

/// Trade identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TradeId(pub u64);

/// Order direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// The side an incoming order matches against.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

/// Order lifecycle status. `Executed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Status {
    New,
    PartiallyExecuted,
    Executed,
    Cancelled,
}

impl Status {
    /// Status as the exact function of filled quantity.
    pub fn from_filled(filled: Decimal, quantity: Decimal) -> Status {
        if filled >= quantity {
            Status::Executed
        } else if filled > Decimal::ZERO {
            Status::PartiallyExecuted
        } else {
            Status::New
        }
    }
}

/// Order body: market (take whatever is available) or limit (with price).
///
/// Matching inspects the variant tag; a limit price must be positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind")]
pub enum OrderBody {
    Market {
        direction: Direction,
        quantity: Decimal,
    },
    Limit {
        direction: Direction,
        quantity: Decimal,
        price: Decimal,
    },
}

impl OrderBody {
    pub fn direction(&self) -> Direction {
        match self {
            OrderBody::Market { direction, .. } | OrderBody::Limit { direction, .. } => *direction,
        }
    }

    pub fn quantity(&self) -> Decimal {
        match self {
            OrderBody::Market { quantity, .. } | OrderBody::Limit { quantity, .. } => *quantity,
        }
    }

    /// Limit price; `None` for market orders.
    pub fn price(&self) -> Option<Decimal> {
        match self {
            OrderBody::Market { .. } => None,
            OrderBody::Limit { price, .. } => Some(*price),
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(self, OrderBody::Limit { .. })
    }
}

/// Durable order row. Never physically deleted; history is retained.
///
/// `timestamp` is a store-assigned strictly-increasing logical sequence used
/// for time priority and reported to callers as the creation instant.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub instrument_id: InstrumentId,
    pub body: OrderBody,
    pub filled: Decimal,
    pub status: Status,
    pub timestamp: u64,
}

impl OrderRecord {
    /// Quantity not yet filled.
    pub fn remaining(&self) -> Decimal {
        self.body.quantity() - self.filled
    }

    /// Resting orders are the only match candidates and cancel targets.
    pub fn is_resting(&self) -> bool {
        matches!(self.status, Status::New | Status::PartiallyExecuted)
    }
}

/// Listed instrument. Ticker and name are unique across the catalog.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub ticker: String,
    pub name: String,
}

/// Anonymous fill record: no back-reference to the matched orders.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TradeRecord {
    pub id: TradeId,
    pub instrument_id: InstrumentId,
    pub price: Decimal,
    pub amount: Decimal,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_exact_function_of_filled() {
        let qty = Decimal::from(10);
        assert_eq!(Status::from_filled(Decimal::ZERO, qty), Status::New);
        assert_eq!(Status::from_filled(Decimal::from(3), qty), Status::PartiallyExecuted);
        assert_eq!(Status::from_filled(qty, qty), Status::Executed);
    }

    #[test]
    fn order_body_accessors() {
        let limit = OrderBody::Limit {
            direction: Direction::Buy,
            quantity: Decimal::from(5),
            price: Decimal::from(100),
        };
        assert!(limit.is_limit());
        assert_eq!(limit.price(), Some(Decimal::from(100)));
        assert_eq!(limit.direction(), Direction::Buy);

        let market = OrderBody::Market {
            direction: Direction::Sell,
            quantity: Decimal::from(5),
        };
        assert!(!market.is_limit());
        assert_eq!(market.price(), None);
        assert_eq!(market.quantity(), Decimal::from(5));
    }

    #[test]
    fn direction_opposite() {
        assert_eq!(Direction::Buy.opposite(), Direction::Sell);
        assert_eq!(Direction::Sell.opposite(), Direction::Buy);
    }
}
