//! # spotmatch
//!
//! Spot exchange core: per-user instrument balances and an order matching
//! engine with price-time priority, partial fills, and an append-only trade
//! history. Every public operation is one atomic transaction over the store.
//!
//! ## Entry point
//!
//! Use [`Exchange`] as the single entry point: create with [`Exchange::new`],
//! list instruments, then [`Exchange::submit_order`],
//! [`Exchange::cancel_order`], and the balance operations.
//!
//! ## Example
//!
//! ```rust
//! use spotmatch::{Direction, Exchange, OrderBody, Status, UserId};
//! use rust_decimal::Decimal;
//!
//! let exchange = Exchange::new();
//! exchange.register_instrument("BTC", "Bitcoin").unwrap();
//! let result = exchange
//!     .submit_order(
//!         UserId(1),
//!         "BTC",
//!         OrderBody::Limit {
//!             direction: Direction::Sell,
//!             quantity: Decimal::from(10),
//!             price: Decimal::from(100),
//!         },
//!     )
//!     .unwrap();
//! assert_eq!(result.status, Status::New); // rests on the book
//! ```
//!
//! ## Lower-level API
//!
//! [`store::Store`] and [`matching::match_order`] can be used directly if
//! you manage transactions yourself.

pub mod api;
pub mod audit;
pub mod auth;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod matching;
pub mod order_book;
pub mod persistence;
pub mod sim;
pub mod store;
pub mod types;

pub use auth::{AuthConfig, AuthUser, Role};
pub use engine::{Exchange, OrderDetail, SubmitResult, TradeTick};
pub use error::{ExchangeError, Result};
pub use matching::{match_order, Fill};
pub use order_book::{BookLevel, OrderBookView};
pub use store::{Store, StoreSnapshot};
pub use types::{
    Direction, Instrument, InstrumentId, OrderBody, OrderId, OrderRecord, Status, TradeId,
    TradeRecord, UserId,
};
