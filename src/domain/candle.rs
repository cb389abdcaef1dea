//! Candle representation and validated candle series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::TradesimError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: Option<NaiveDate>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Candle {
            time: None,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn with_time(mut self, time: NaiveDate) -> Self {
        self.time = Some(time);
        self
    }

    fn check(&self, index: usize) -> Result<(), TradesimError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(invalid(format!(
                "candle {index} has a non-positive or non-finite price"
            )));
        }
        if self.high < self.low {
            return Err(invalid(format!("candle {index} has high below low")));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(invalid(format!("candle {index} has an invalid volume")));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> TradesimError {
    TradesimError::InvalidCandleSeries { reason }
}

/// A non-empty, time-ordered sequence of well-formed candles.
///
/// Every price computation in the engine indexes into this series, so bad
/// data is rejected here instead of surfacing later as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self, TradesimError> {
        if candles.is_empty() {
            return Err(invalid("candle series is empty".into()));
        }

        for (i, candle) in candles.iter().enumerate() {
            candle.check(i)?;
        }

        for (i, pair) in candles.windows(2).enumerate() {
            if let (Some(prev), Some(next)) = (pair[0].time, pair[1].time) {
                if next <= prev {
                    return Err(invalid(format!(
                        "candle {} at {next} is not after {prev}",
                        i + 1
                    )));
                }
            }
        }

        Ok(CandleSeries { candles })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.candles.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn into_inner(self) -> Vec<Candle> {
        self.candles
    }
}

impl TryFrom<Vec<Candle>> for CandleSeries {
    type Error = TradesimError;

    fn try_from(candles: Vec<Candle>) -> Result<Self, Self::Error> {
        CandleSeries::new(candles)
    }
}
