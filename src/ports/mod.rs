//! Port traits the domain depends on.

pub mod candle_port;
pub mod config_port;
pub mod trade_store_port;
