//! CSV file candle adapter.
//!
//! Expected header: `date,open,high,low,close,volume`. The `date` column is
//! optional (it may be missing or empty); when present it must be
//! `YYYY-MM-DD`. Rows are returned in file order.

use crate::domain::candle::Candle;
use crate::domain::error::TradesimError;
use crate::ports::candle_port::CandlePort;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct CandleRecord {
    #[serde(default, alias = "time")]
    date: Option<String>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct CsvCandleAdapter {
    path: PathBuf,
}

impl CsvCandleAdapter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CandlePort for CsvCandleAdapter {
    fn fetch_candles(&self) -> Result<Vec<Candle>, TradesimError> {
        let file = File::open(&self.path).map_err(|e| TradesimError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        read_candles(file)
    }
}

/// Parse candles from any CSV source.
pub fn read_candles<R: io::Read>(reader: R) -> Result<Vec<Candle>, TradesimError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles = Vec::new();

    for (i, result) in rdr.deserialize::<CandleRecord>().enumerate() {
        // header is line 1
        let row = i + 2;
        let record = result.map_err(|e| TradesimError::Data {
            reason: format!("CSV parse error on line {}: {}", row, e),
        })?;

        let mut candle = Candle::new(
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        );
        if let Some(date_str) = record.date.as_deref().filter(|s| !s.is_empty()) {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                TradesimError::Data {
                    reason: format!("invalid date '{}' on line {}: {}", date_str, row, e),
                }
            })?;
            candle = candle.with_time(date);
        }
        candles.push(candle);
    }

    Ok(candles)
}

/// Write candles in the same format [`read_candles`] accepts.
pub fn write_candles<W: io::Write>(writer: W, candles: &[Candle]) -> Result<(), TradesimError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for candle in candles {
        wtr.serialize(CandleRecord {
            date: candle.time.map(|d| d.format("%Y-%m-%d").to_string()),
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
        })
        .map_err(|e| TradesimError::Data {
            reason: format!("CSV write error: {}", e),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
