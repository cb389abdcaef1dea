//! Configuration validation.
//!
//! Validates all config fields before a game starts.

use crate::domain::error::TradesimError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_game_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_initial_cash(config)?;
    validate_non_negative_int(config, "game", "lookback")?;
    validate_non_negative_int(config, "game", "max_turns")?;
    validate_shares_per_trade(config)?;
    Ok(())
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_non_negative_int(config, "analysis", "high_frequency_threshold")?;
    validate_risk_free_rate(config)?;
    validate_periods_per_year(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "demo".to_string());

    match source.trim().to_lowercase().as_str() {
        "demo" => Ok(()),
        "csv" => match config.get_string("data", "path") {
            Some(p) if !p.trim().is_empty() => Ok(()),
            _ => Err(TradesimError::ConfigMissing {
                section: "data".to_string(),
                key: "path".to_string(),
            }),
        },
        "random" => validate_random_walk(config),
        other => Err(TradesimError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: format!("unknown source '{other}', expected demo, csv or random"),
        }),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("game", "initial_cash", 10_000_000.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(TradesimError::ConfigInvalid {
            section: "game".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_shares_per_trade(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_int("game", "shares_per_trade", 100);
    if value <= 0 {
        return Err(TradesimError::ConfigInvalid {
            section: "game".to_string(),
            key: "shares_per_trade".to_string(),
            reason: "shares_per_trade must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_non_negative_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), TradesimError> {
    if config.get_int(section, key, 0) < 0 {
        return Err(TradesimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be non-negative"),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("analysis", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(TradesimError::ConfigInvalid {
            section: "analysis".to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("analysis", "periods_per_year", 252.0);
    if value <= 0.0 {
        return Err(TradesimError::ConfigInvalid {
            section: "analysis".to_string(),
            key: "periods_per_year".to_string(),
            reason: "periods_per_year must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_random_walk(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if config.get_int("data", "count", 80) <= 0 {
        return Err(TradesimError::ConfigInvalid {
            section: "data".to_string(),
            key: "count".to_string(),
            reason: "count must be at least 1".to_string(),
        });
    }
    if config.get_double("data", "start_price", 12_500.0) <= 0.0 {
        return Err(TradesimError::ConfigInvalid {
            section: "data".to_string(),
            key: "start_price".to_string(),
            reason: "start_price must be positive".to_string(),
        });
    }
    let volatility = config.get_double("data", "volatility", 0.02);
    if !(0.0..1.0).contains(&volatility) {
        return Err(TradesimError::ConfigInvalid {
            section: "data".to_string(),
            key: "volatility".to_string(),
            reason: "volatility must be between 0 and 1".to_string(),
        });
    }
    if let Some(s) = config.get_string("data", "start_date") {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            TradesimError::ConfigInvalid {
                section: "data".to_string(),
                key: "start_date".to_string(),
                reason: "invalid start_date format, expected YYYY-MM-DD".to_string(),
            }
        })?;
    }
    Ok(())
}
