//! Chart indicators over the candle series.
//!
//! Each function returns one value per candle; `None` marks warm-up bars
//! where the window is not yet full.

use super::candle::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Simple moving average of closes.
///
/// Warmup: first (period-1) bars are `None`.
pub fn sma(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; candles.len()];
    }

    let mut values = Vec::with_capacity(candles.len());
    let mut sum = 0.0;
    for (i, candle) in candles.iter().enumerate() {
        sum += candle.close;
        if i >= period {
            sum -= candles[i - period].close;
        }
        if i + 1 >= period {
            values.push(Some(sum / period as f64));
        } else {
            values.push(None);
        }
    }
    values
}

/// Relative Strength Index using plain averages of the gains and losses in
/// the trailing window (no Wilder smoothing).
///
/// Warmup: first `period` bars are `None`. A window with no losses is 100.
pub fn rsi(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    if period == 0 || candles.len() < period + 1 {
        return vec![None; candles.len()];
    }

    let changes: Vec<f64> = candles.windows(2).map(|w| w[1].close - w[0].close).collect();

    let mut values = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        if i < period {
            values.push(None);
            continue;
        }

        let window = &changes[i - period..i];
        let gains: f64 = window.iter().filter(|c| **c > 0.0).sum();
        let losses: f64 = window.iter().filter(|c| **c < 0.0).map(|c| c.abs()).sum();

        let avg_gain = gains / period as f64;
        let avg_loss = losses / period as f64;

        if avg_loss == 0.0 {
            values.push(Some(100.0));
        } else {
            let rs = avg_gain / avg_loss;
            values.push(Some(100.0 - 100.0 / (1.0 + rs)));
        }
    }
    values
}

/// Bollinger Bands: SMA middle band +/- `multiplier` population standard
/// deviations of the closes in the window.
pub fn bollinger(candles: &[Candle], period: usize, multiplier: f64) -> BollingerBands {
    let middle = sma(candles, period);
    let mut upper = Vec::with_capacity(candles.len());
    let mut lower = Vec::with_capacity(candles.len());

    for (i, mid) in middle.iter().enumerate() {
        match mid {
            Some(mean) => {
                let window = &candles[i + 1 - period..=i];
                let variance: f64 = window
                    .iter()
                    .map(|c| {
                        let diff = c.close - mean;
                        diff * diff
                    })
                    .sum::<f64>()
                    / period as f64;
                let stddev = variance.sqrt();
                upper.push(Some(mean + multiplier * stddev));
                lower.push(Some(mean - multiplier * stddev));
            }
            None => {
                upper.push(None);
                lower.push(None);
            }
        }
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}
