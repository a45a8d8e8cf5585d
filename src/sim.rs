//! Synthetic order stream generator.
//!
//! Deterministic, configurable submissions for replay tests, demos, and the
//! benchmarks. Same seed ⇒ same stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::engine::SubmitResult;
use crate::error::Result;
use crate::types::{Direction, OrderBody, UserId};
use crate::Exchange;

/// Configuration for the synthetic stream. All ranges are inclusive.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// RNG seed. Same seed ⇒ same submissions.
    pub seed: u64,
    /// Number of submissions to generate when collecting.
    pub num_orders: usize,
    /// Probability of Buy (0.0..=1.0). Sell otherwise.
    pub buy_ratio: f64,
    /// Probability of a limit order (0.0..=1.0). Market otherwise.
    pub limit_ratio: f64,
    /// Price range for limit orders.
    pub price_min: i64,
    pub price_max: i64,
    /// Quantity range, whole units.
    pub quantity_min: u64,
    pub quantity_max: u64,
    /// Number of distinct user ids (1..=num_users).
    pub num_users: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_orders: 1000,
            buy_ratio: 0.5,
            limit_ratio: 0.9,
            price_min: 95,
            price_max: 105,
            quantity_min: 1,
            quantity_max: 100,
            num_users: 5,
        }
    }
}

/// Deterministic submission stream: (user, order body) pairs.
pub struct OrderStream {
    rng: StdRng,
    config: StreamConfig,
}

impl OrderStream {
    pub fn new(config: StreamConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { rng, config }
    }

    /// Generates the next submission, advancing the RNG.
    pub fn next_submission(&mut self) -> (UserId, OrderBody) {
        let direction = if self.rng.gen::<f64>() < self.config.buy_ratio {
            Direction::Buy
        } else {
            Direction::Sell
        };
        let quantity = Decimal::from(
            self.rng
                .gen_range(self.config.quantity_min..=self.config.quantity_max),
        );
        let body = if self.rng.gen::<f64>() < self.config.limit_ratio {
            let price = Decimal::from(
                self.rng
                    .gen_range(self.config.price_min..=self.config.price_max),
            );
            OrderBody::Limit {
                direction,
                quantity,
                price,
            }
        } else {
            OrderBody::Market {
                direction,
                quantity,
            }
        };
        let user = UserId(self.rng.gen_range(1..=self.config.num_users.max(1)));
        (user, body)
    }

    /// Exactly `n` submissions, advancing the stream.
    pub fn take_submissions(&mut self, n: usize) -> Vec<(UserId, OrderBody)> {
        (0..n).map(|_| self.next_submission()).collect()
    }

    /// The full stream as defined by `config.num_orders`.
    pub fn all_submissions(&mut self) -> Vec<(UserId, OrderBody)> {
        self.take_submissions(self.config.num_orders)
    }
}

/// Replays submissions against one ticker, returning every submit result
/// (or the first error).
pub fn replay_into_exchange(
    exchange: &Exchange,
    ticker: &str,
    submissions: impl IntoIterator<Item = (UserId, OrderBody)>,
) -> Result<Vec<SubmitResult>> {
    let mut results = Vec::new();
    for (user, body) in submissions {
        results.push(exchange.submit_order(user, ticker, body)?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let config = StreamConfig {
            seed: 42,
            num_orders: 10,
            ..Default::default()
        };
        let a = OrderStream::new(config.clone()).all_submissions();
        let b = OrderStream::new(config).all_submissions();
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_stream() {
        let a = OrderStream::new(StreamConfig {
            seed: 1,
            num_orders: 5,
            ..Default::default()
        })
        .all_submissions();
        let b = OrderStream::new(StreamConfig {
            seed: 2,
            num_orders: 5,
            ..Default::default()
        })
        .all_submissions();
        assert_ne!(a, b, "different seeds should produce different submissions");
    }

    #[test]
    fn replay_submits_every_order() {
        let exchange = Exchange::new();
        exchange.register_instrument("BTC", "Bitcoin").unwrap();
        let submissions = OrderStream::new(StreamConfig {
            seed: 123,
            num_orders: 20,
            ..Default::default()
        })
        .all_submissions();
        let results = replay_into_exchange(&exchange, "BTC", submissions).unwrap();
        assert_eq!(results.len(), 20);
    }
}
