#![allow(dead_code)]

use chrono::NaiveDate;
use tradesim::domain::candle::Candle;
use tradesim::domain::error::TradesimError;
use tradesim::domain::session::{GameConfig, GameSession};
use tradesim::domain::trade_log::SequentialIds;
use tradesim::ports::candle_port::CandlePort;

pub struct MockCandlePort {
    pub candles: Vec<Candle>,
    pub error: Option<String>,
}

impl MockCandlePort {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles,
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            candles: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl CandlePort for MockCandlePort {
    fn fetch_candles(&self) -> Result<Vec<Candle>, TradesimError> {
        match &self.error {
            Some(reason) => Err(TradesimError::Data {
                reason: reason.clone(),
            }),
            None => Ok(self.candles.clone()),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One candle per close, dated consecutively from 2024-01-01.
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Candle::new(c, c * 1.01, c * 0.99, c, 1_000.0)
                .with_time(date(2024, 1, 1) + chrono::Days::new(i as u64))
        })
        .collect()
}

/// No history window, no turn cap, deterministic trade ids.
pub fn play_config() -> GameConfig {
    GameConfig {
        lookback: 0,
        ..GameConfig::default()
    }
}

pub fn session_with(config: GameConfig, closes: &[f64]) -> GameSession<SequentialIds> {
    let mut session = GameSession::with_ids(config, SequentialIds::new());
    session.load_candles(make_candles(closes)).unwrap();
    session
}

pub fn session(closes: &[f64]) -> GameSession<SequentialIds> {
    session_with(play_config(), closes)
}
