//! tradesim — candle-chart trading game engine and trading-style analytics.
//!
//! Hexagonal architecture: game rules and analytics in [`domain`], port traits
//! in [`ports`], concrete candle sources and stores in [`adapters`], and the
//! command-line front end in [`cli`].
pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
