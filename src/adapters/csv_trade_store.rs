//! CSV-backed trade store.
//!
//! The whole file is rewritten on every save. A missing file reads as an
//! empty store.

use crate::domain::error::TradesimError;
use crate::domain::trade_log::TradeLogEntry;
use crate::ports::trade_store_port::TradeStorePort;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvTradeStore {
    path: PathBuf,
}

impl CsvTradeStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, trades: &[TradeLogEntry]) -> Result<(), TradesimError> {
        let file = File::create(&self.path).map_err(|e| TradesimError::Store {
            reason: format!("failed to write {}: {}", self.path.display(), e),
        })?;
        let mut wtr = csv::Writer::from_writer(file);
        for trade in trades {
            wtr.serialize(trade).map_err(|e| TradesimError::Store {
                reason: format!("CSV write error: {}", e),
            })?;
        }
        wtr.flush().map_err(|e| TradesimError::Store {
            reason: format!("failed to flush {}: {}", self.path.display(), e),
        })?;
        Ok(())
    }
}

impl TradeStorePort for CsvTradeStore {
    fn load_trades(&self) -> Result<Vec<TradeLogEntry>, TradesimError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(TradesimError::Store {
                    reason: format!("failed to read {}: {}", self.path.display(), e),
                });
            }
        };

        let mut rdr = csv::Reader::from_reader(file);
        let mut trades = Vec::new();
        for result in rdr.deserialize::<TradeLogEntry>() {
            let trade = result.map_err(|e| TradesimError::Store {
                reason: format!("CSV parse error: {}", e),
            })?;
            trades.push(trade);
        }
        Ok(trades)
    }

    fn save_trade(&self, trade: &TradeLogEntry) -> Result<(), TradesimError> {
        let mut trades = self.load_trades()?;
        match trades.iter_mut().find(|t| t.id == trade.id) {
            Some(existing) => *existing = trade.clone(),
            None => trades.push(trade.clone()),
        }
        debug!(id = %trade.id, path = %self.path.display(), "trade saved");
        self.write_all(&trades)
    }

    fn save_all(&self, trades: &[TradeLogEntry]) -> Result<(), TradesimError> {
        let mut stored = self.load_trades()?;
        for trade in trades {
            match stored.iter_mut().find(|t| t.id == trade.id) {
                Some(existing) => *existing = trade.clone(),
                None => stored.push(trade.clone()),
            }
        }
        debug!(count = trades.len(), path = %self.path.display(), "trades saved");
        self.write_all(&stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade_log::TradeSide;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn entry(id: &str, side: TradeSide, volume: u64) -> TradeLogEntry {
        TradeLogEntry {
            id: id.to_string(),
            turn: 1,
            timestamp: NaiveDate::from_ymd_opt(2023, 2, 1),
            side,
            price: 12_500.0,
            volume,
            balance_after: 8_750_000.0,
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path().join("trades.csv"));
        assert!(store.load_trades().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path().join("trades.csv"));
        store.save_trade(&entry("a", TradeSide::Buy, 100)).unwrap();
        store.save_trade(&entry("b", TradeSide::Sell, 40)).unwrap();

        let loaded = store.load_trades().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], entry("a", TradeSide::Buy, 100));
        assert_eq!(loaded[1].side, TradeSide::Sell);
    }

    #[test]
    fn same_id_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path().join("trades.csv"));
        store.save_trade(&entry("a", TradeSide::Buy, 100)).unwrap();
        store.save_trade(&entry("b", TradeSide::Buy, 10)).unwrap();
        store.save_trade(&entry("a", TradeSide::Buy, 300)).unwrap();

        let loaded = store.load_trades().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
        assert_eq!(loaded[0].volume, 300);
    }

    #[test]
    fn save_all_upserts_batch() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path().join("trades.csv"));
        store.save_trade(&entry("a", TradeSide::Buy, 1)).unwrap();
        store
            .save_all(&[entry("a", TradeSide::Buy, 2), entry("c", TradeSide::Sell, 2)])
            .unwrap();
        let ids: Vec<_> = store.load_trades().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn missing_timestamp_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path().join("trades.csv"));
        let mut trade = entry("x", TradeSide::Buy, 5);
        trade.timestamp = None;
        store.save_trade(&trade).unwrap();
        assert_eq!(store.load_trades().unwrap()[0].timestamp, None);
    }

    #[test]
    fn garbage_file_is_store_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        std::fs::write(&path, "id,turn\nx,not_a_number\n").unwrap();
        let err = CsvTradeStore::new(path).load_trades().unwrap_err();
        assert!(matches!(err, TradesimError::Store { .. }));
    }
}
