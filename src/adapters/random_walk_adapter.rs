//! Synthetic candle source: a bounded random walk of closes.
//!
//! Each candle opens at the previous close and closes within
//! `±volatility` of it. Wicks extend up to 1% beyond the body.

use crate::domain::candle::Candle;
use crate::domain::error::TradesimError;
use crate::ports::candle_port::CandlePort;
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_COUNT: usize = 80;
pub const DEFAULT_START_PRICE: f64 = 12_500.0;
pub const DEFAULT_VOLATILITY: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct RandomWalkAdapter {
    pub count: usize,
    pub start_price: f64,
    /// Max fractional close-to-close move, in `[0, 1)`.
    pub volatility: f64,
    /// Same seed, same series. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Date of the first candle; later candles are one day apart.
    pub start_date: Option<NaiveDate>,
}

impl Default for RandomWalkAdapter {
    fn default() -> Self {
        RandomWalkAdapter {
            count: DEFAULT_COUNT,
            start_price: DEFAULT_START_PRICE,
            volatility: DEFAULT_VOLATILITY,
            seed: None,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1),
        }
    }
}

impl RandomWalkAdapter {
    pub fn generate(&self) -> Result<Vec<Candle>, TradesimError> {
        if self.count == 0 {
            return Err(invalid("count must be at least 1"));
        }
        if !self.start_price.is_finite() || self.start_price <= 0.0 {
            return Err(invalid("start_price must be positive"));
        }
        if !(0.0..1.0).contains(&self.volatility) {
            return Err(invalid("volatility must be between 0 and 1"));
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut candles = Vec::with_capacity(self.count);
        let mut price = self.start_price;

        for i in 0..self.count {
            let change = (rng.gen_range(0.0_f64..1.0) - 0.5) * 2.0 * self.volatility;
            let open = price;
            let close = price * (1.0 + change);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0_f64..1.0) * 0.01);
            let low = open.min(close) * (1.0 - rng.gen_range(0.0_f64..1.0) * 0.01);
            let volume = (100_000.0 * (1.0 + rng.gen_range(0.0_f64..1.0))).round();

            let mut candle = Candle::new(open, high, low, close, volume);
            if let Some(date) = self
                .start_date
                .and_then(|d| d.checked_add_days(Days::new(i as u64)))
            {
                candle = candle.with_time(date);
            }
            candles.push(candle);
            price = close;
        }

        Ok(candles)
    }
}

fn invalid(reason: &str) -> TradesimError {
    TradesimError::Data {
        reason: format!("random walk: {reason}"),
    }
}

impl CandlePort for RandomWalkAdapter {
    fn fetch_candles(&self) -> Result<Vec<Candle>, TradesimError> {
        self.generate()
    }
}
