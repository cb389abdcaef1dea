//! Bundled demo chart: 30 days of history followed by 50 playable days.
//! The first candle after the history opens at 12,500. The CLI defaults the
//! lookback to [`DEMO_HISTORY_LEN`] for this source so play starts there.

use crate::adapters::csv_adapter::read_candles;
use crate::domain::candle::Candle;
use crate::domain::error::TradesimError;
use crate::ports::candle_port::CandlePort;

const DEMO_CSV: &str = include_str!("../../data/demo_candles.csv");

/// History candles preceding the first playable turn.
pub const DEMO_HISTORY_LEN: usize = 30;

#[derive(Debug, Default, Clone, Copy)]
pub struct DemoCandleAdapter;

impl CandlePort for DemoCandleAdapter {
    fn fetch_candles(&self) -> Result<Vec<Candle>, TradesimError> {
        read_candles(DEMO_CSV.as_bytes())
    }
}
