//! File persistence: save and load the store snapshot as one JSON file.
//! Enables recovery after restart: instruments, orders, balances, trades, and
//! id counters are all restored.

use std::path::Path;

use crate::error::{ExchangeError, Result};
use crate::store::StoreSnapshot;

/// One-file JSON persistence. Save after state changes; load on startup.
#[derive(Clone, Debug)]
pub struct FilePersistence {
    path: std::path::PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Saves the snapshot, overwriting any existing file.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ExchangeError::Storage(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| ExchangeError::Storage(e.to_string()))
    }

    /// Loads a snapshot. `None` when the file does not exist yet.
    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ExchangeError::Storage(e.to_string())),
        };
        let snapshot =
            serde_json::from_str(&data).map_err(|e| ExchangeError::Storage(e.to_string()))?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, OrderBody, UserId};
    use crate::Exchange;
    use rust_decimal::Decimal;

    #[test]
    fn save_load_round_trip() {
        let exchange = Exchange::new();
        exchange.register_instrument("BTC", "Bitcoin").unwrap();
        exchange
            .deposit(UserId(1), "BTC", Decimal::from(25))
            .unwrap();
        exchange
            .submit_order(
                UserId(1),
                "BTC",
                OrderBody::Limit {
                    direction: Direction::Sell,
                    quantity: Decimal::from(5),
                    price: Decimal::from(100),
                },
            )
            .unwrap();

        let path = std::env::temp_dir().join(format!("spotmatch-persist-{}.json", std::process::id()));
        let persistence = FilePersistence::new(&path);
        persistence.save(&exchange.snapshot()).unwrap();

        let loaded = persistence.load().unwrap().expect("snapshot present");
        let recovered = Exchange::new();
        recovered.restore(loaded);
        assert_eq!(
            recovered.balances(UserId(1)).get("BTC"),
            Some(&Decimal::from(25))
        );
        assert_eq!(recovered.list_orders(UserId(1)).len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_missing_file_is_none() {
        let persistence = FilePersistence::new("/nonexistent-dir/never-here.json");
        assert!(persistence.load().unwrap().is_none());
    }
}
