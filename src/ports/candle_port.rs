//! Candle source port trait.

use crate::domain::candle::Candle;
use crate::domain::error::TradesimError;

pub trait CandlePort {
    /// The full ordered series. Validation happens when the series is loaded
    /// into a session, not here.
    fn fetch_candles(&self) -> Result<Vec<Candle>, TradesimError>;
}
