//! Flat trade-record store port trait.
//!
//! Records are keyed by trade id. Writes are last-write-wins; the store is not
//! assumed to reflect a session until a save call has returned.

use crate::domain::error::TradesimError;
use crate::domain::trade_log::TradeLogEntry;

pub trait TradeStorePort {
    fn load_trades(&self) -> Result<Vec<TradeLogEntry>, TradesimError>;

    /// Insert the trade, or replace the stored record with the same id.
    fn save_trade(&self, trade: &TradeLogEntry) -> Result<(), TradesimError>;

    /// Default implementation: upserts each trade in order.
    fn save_all(&self, trades: &[TradeLogEntry]) -> Result<(), TradesimError> {
        for trade in trades {
            self.save_trade(trade)?;
        }
        Ok(())
    }
}
