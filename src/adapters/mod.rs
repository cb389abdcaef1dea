//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_trade_store;
pub mod demo_adapter;
pub mod file_config_adapter;
pub mod random_walk_adapter;
