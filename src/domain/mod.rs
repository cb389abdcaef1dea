//! Core domain types and logic.

pub mod candle;
pub mod wallet;
pub mod trade_log;
pub mod session;
pub mod command;
pub mod analytics;
pub mod persona;
pub mod indicator;
pub mod config_validation;
pub mod error;
