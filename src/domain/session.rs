//! Game session: the portfolio engine state machine.
//!
//! A session owns the candle series, the wallet, the append-only trade log
//! and a per-turn equity curve. It is mutated only through [`GameSession::buy`],
//! [`GameSession::sell`], [`GameSession::advance_turn`], [`GameSession::reset`]
//! and [`GameSession::load_candles`]; every rejected command leaves it untouched.

use serde::Serialize;
use tracing::{debug, info};

use super::analytics::{self, AnalysisConfig, AnalysisReport};
use super::candle::{Candle, CandleSeries};
use super::error::{GameError, TradesimError};
use super::trade_log::{IdGenerator, TradeLogEntry, TradeSide, UuidIds};
use super::wallet::Wallet;

pub const DEFAULT_INITIAL_CASH: f64 = 10_000_000.0;
pub const DEFAULT_LOOKBACK: usize = 20;
pub const DEFAULT_SHARES_PER_TRADE: u64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub initial_cash: f64,
    /// Candles shown as history before the first playable turn.
    pub lookback: usize,
    /// Fixed turn budget; `None` plays until the last candle.
    pub max_turns: Option<usize>,
    pub shares_per_trade: u64,
    /// Sell any open position at the final close before the game ends.
    pub auto_liquidate: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            initial_cash: DEFAULT_INITIAL_CASH,
            lookback: DEFAULT_LOOKBACK,
            max_turns: None,
            shares_per_trade: DEFAULT_SHARES_PER_TRADE,
            auto_liquidate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    NotStarted,
    Playing,
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub index: usize,
    pub turn: usize,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Advanced { turn: usize },
    GameOver { liquidation: Option<TradeLogEntry> },
}

/// Read-only copy of the session handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub current_index: usize,
    pub turn: usize,
    pub current_price: Option<f64>,
    pub wallet: Wallet,
    pub trade_history: Vec<TradeLogEntry>,
    pub realized_profit: f64,
    pub unrealized_profit: f64,
    pub total_assets: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub is_playing: bool,
    pub is_game_over: bool,
}

#[derive(Debug, Clone)]
pub struct GameSession<G: IdGenerator = UuidIds> {
    config: GameConfig,
    candles: Option<CandleSeries>,
    current_index: usize,
    wallet: Wallet,
    trade_history: Vec<TradeLogEntry>,
    equity_curve: Vec<EquityPoint>,
    realized_profit: f64,
    state: SessionState,
    ids: G,
}

impl GameSession<UuidIds> {
    pub fn new(config: GameConfig) -> Self {
        GameSession::with_ids(config, UuidIds)
    }
}

impl<G: IdGenerator> GameSession<G> {
    pub fn with_ids(config: GameConfig, ids: G) -> Self {
        let wallet = Wallet::new(config.initial_cash);
        GameSession {
            config,
            candles: None,
            current_index: 0,
            wallet,
            trade_history: Vec::new(),
            equity_curve: Vec::new(),
            realized_profit: 0.0,
            state: SessionState::NotStarted,
            ids,
        }
    }

    /// Validate and install a candle series, then start a fresh game.
    /// On error the session is left as it was.
    pub fn load_candles(&mut self, candles: Vec<Candle>) -> Result<(), TradesimError> {
        let series = CandleSeries::new(candles)?;
        self.load_series(series);
        Ok(())
    }

    pub fn load_series(&mut self, series: CandleSeries) {
        info!(candles = series.len(), "candle series loaded");
        self.candles = Some(series);
        self.reset();
    }

    /// Return to the initial state. Safe to call at any point.
    pub fn reset(&mut self) {
        self.wallet = Wallet::new(self.config.initial_cash);
        self.trade_history.clear();
        self.equity_curve.clear();
        self.realized_profit = 0.0;
        self.current_index = self.start_index();

        if self.candles.is_some() {
            self.state = SessionState::Playing;
            self.mark_equity();
        } else {
            self.state = SessionState::NotStarted;
        }
    }

    pub fn buy(&mut self, quantity: u64) -> Result<TradeLogEntry, GameError> {
        let price = self.playing_price()?;
        if quantity == 0 {
            return reject(GameError::InvalidQuantity);
        }

        let required = price * quantity as f64;
        if required > self.wallet.cash {
            return reject(GameError::InsufficientFunds {
                required,
                available: self.wallet.cash,
            });
        }

        self.wallet.apply_buy(price, quantity);
        let entry = self.record(TradeSide::Buy, price, quantity);
        debug!(price, quantity, cash = self.wallet.cash, "buy filled");
        Ok(entry)
    }

    pub fn sell(&mut self, quantity: u64) -> Result<TradeLogEntry, GameError> {
        let price = self.playing_price()?;
        if quantity == 0 {
            return reject(GameError::InvalidQuantity);
        }
        if quantity > self.wallet.holdings {
            return reject(GameError::InsufficientHoldings {
                requested: quantity,
                held: self.wallet.holdings,
            });
        }

        let profit = self.wallet.apply_sell(price, quantity);
        self.realized_profit += profit;
        let entry = self.record(TradeSide::Sell, price, quantity);
        debug!(price, quantity, profit, cash = self.wallet.cash, "sell filled");
        Ok(entry)
    }

    pub fn sell_all(&mut self) -> Result<TradeLogEntry, GameError> {
        self.sell(self.wallet.holdings)
    }

    /// Move to the next candle, or end the game when the boundary is reached.
    pub fn advance_turn(&mut self) -> Result<TurnOutcome, GameError> {
        self.playing_price()?;

        if self.at_boundary() {
            let liquidation = if self.config.auto_liquidate && self.wallet.has_position() {
                info!(holdings = self.wallet.holdings, "liquidating open position");
                Some(self.sell_all()?)
            } else {
                None
            };
            self.state = SessionState::GameOver;
            info!(
                turn = self.turn(),
                trades = self.trade_history.len(),
                realized_profit = self.realized_profit,
                "game over"
            );
            return Ok(TurnOutcome::GameOver { liquidation });
        }

        self.current_index += 1;
        self.mark_equity();
        Ok(TurnOutcome::Advanced { turn: self.turn() })
    }

    /// The analysis report, available once the game is over.
    pub fn final_report(&self, config: &AnalysisConfig) -> Option<AnalysisReport> {
        if self.state != SessionState::GameOver {
            return None;
        }
        Some(analytics::analyze_session(self, config))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            current_index: self.current_index,
            turn: self.turn(),
            current_price: self.current_price(),
            wallet: self.wallet.clone(),
            trade_history: self.trade_history.clone(),
            realized_profit: self.realized_profit,
            unrealized_profit: self.unrealized_profit(),
            total_assets: self.total_assets(),
            equity_curve: self.equity_curve.clone(),
            is_playing: self.is_playing(),
            is_game_over: self.is_game_over(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn candles(&self) -> Option<&CandleSeries> {
        self.candles.as_ref()
    }

    /// Candles up to and including the current one.
    pub fn visible_candles(&self) -> &[Candle] {
        match &self.candles {
            Some(series) => &series.as_slice()[..=self.current_index],
            None => &[],
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn trade_history(&self) -> &[TradeLogEntry] {
        &self.trade_history
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn realized_profit(&self) -> f64 {
        self.realized_profit
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    pub fn is_game_over(&self) -> bool {
        self.state == SessionState::GameOver
    }

    /// 1-based turn number; turn 1 is the first candle after the lookback.
    pub fn turn(&self) -> usize {
        self.current_index.saturating_sub(self.start_index()) + 1
    }

    pub fn turns_remaining(&self) -> usize {
        let Some(series) = &self.candles else {
            return 0;
        };
        if self.is_game_over() {
            return 0;
        }
        let by_candles = series.last_index() - self.current_index;
        match self.config.max_turns {
            Some(max) => by_candles.min(max.saturating_sub(self.turn())),
            None => by_candles,
        }
    }

    pub fn current_price(&self) -> Option<f64> {
        self.candles
            .as_ref()
            .and_then(|s| s.get(self.current_index))
            .map(|c| c.close)
    }

    pub fn position_value(&self) -> f64 {
        self.current_price()
            .map(|p| self.wallet.market_value(p))
            .unwrap_or(0.0)
    }

    pub fn unrealized_profit(&self) -> f64 {
        self.current_price()
            .map(|p| self.wallet.unrealized_pnl(p))
            .unwrap_or(0.0)
    }

    pub fn total_assets(&self) -> f64 {
        self.wallet.cash + self.position_value()
    }

    /// Percentage gain of total assets over the initial cash.
    pub fn profit_rate(&self) -> f64 {
        if self.config.initial_cash <= 0.0 {
            return 0.0;
        }
        (self.total_assets() - self.config.initial_cash) / self.config.initial_cash * 100.0
    }

    /// Whether one lot of `shares_per_trade` is affordable right now.
    pub fn can_buy(&self) -> bool {
        self.is_playing()
            && self
                .current_price()
                .is_some_and(|p| p * self.config.shares_per_trade as f64 <= self.wallet.cash)
    }

    pub fn can_sell(&self) -> bool {
        self.is_playing() && self.wallet.has_position()
    }

    pub fn max_affordable(&self) -> u64 {
        self.current_price()
            .map(|p| self.wallet.max_affordable(p))
            .unwrap_or(0)
    }

    fn start_index(&self) -> usize {
        match &self.candles {
            Some(series) if series.len() > self.config.lookback => self.config.lookback,
            _ => 0,
        }
    }

    fn at_boundary(&self) -> bool {
        let Some(series) = &self.candles else {
            return true;
        };
        if self.current_index >= series.last_index() {
            return true;
        }
        self.config.max_turns.is_some_and(|max| self.turn() >= max)
    }

    fn playing_price(&self) -> Result<f64, GameError> {
        match self.state {
            SessionState::NotStarted => reject(GameError::NotStarted),
            SessionState::GameOver => reject(GameError::GameAlreadyOver),
            SessionState::Playing => self.current_price().ok_or(GameError::NotStarted),
        }
    }

    fn record(&mut self, side: TradeSide, price: f64, volume: u64) -> TradeLogEntry {
        let timestamp = self
            .candles
            .as_ref()
            .and_then(|s| s.get(self.current_index))
            .and_then(|c| c.time);

        let entry = TradeLogEntry {
            id: self.ids.next_id(),
            turn: self.turn(),
            timestamp,
            side,
            price,
            volume,
            balance_after: self.wallet.cash,
        };
        self.trade_history.push(entry.clone());
        self.mark_equity();
        entry
    }

    fn mark_equity(&mut self) {
        let Some(price) = self.current_price() else {
            return;
        };
        let point = EquityPoint {
            index: self.current_index,
            turn: self.turn(),
            equity: self.wallet.equity(price),
        };
        match self.equity_curve.last_mut() {
            Some(last) if last.index == point.index => *last = point,
            _ => self.equity_curve.push(point),
        }
    }
}

fn reject<T>(err: GameError) -> Result<T, GameError> {
    debug!(error = %err, "command rejected");
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade_log::SequentialIds;

    fn flat_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .map(|&c| Candle::new(c, c, c, c, 1_000.0))
            .collect()
    }

    fn session(closes: &[f64]) -> GameSession<SequentialIds> {
        let config = GameConfig {
            lookback: 0,
            ..GameConfig::default()
        };
        let mut s = GameSession::with_ids(config, SequentialIds::new());
        s.load_candles(flat_candles(closes)).unwrap();
        s
    }

    #[test]
    fn new_session_is_not_started() {
        let mut s = GameSession::new(GameConfig::default());
        assert_eq!(s.state(), SessionState::NotStarted);
        assert_eq!(s.buy(1), Err(GameError::NotStarted));
        assert_eq!(s.advance_turn(), Err(GameError::NotStarted));
        assert!(s.visible_candles().is_empty());
    }

    #[test]
    fn load_starts_at_lookback_offset() {
        let mut s = GameSession::with_ids(GameConfig::default(), SequentialIds::new());
        s.load_candles(flat_candles(&[100.0; 30])).unwrap();
        assert_eq!(s.current_index(), 20);
        assert_eq!(s.turn(), 1);
        assert_eq!(s.visible_candles().len(), 21);
        assert!(s.is_playing());
    }

    #[test]
    fn short_series_starts_at_zero() {
        let mut s = GameSession::with_ids(GameConfig::default(), SequentialIds::new());
        s.load_candles(flat_candles(&[100.0; 20])).unwrap();
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn load_rejects_empty_series_without_touching_state() {
        let mut s = session(&[100.0, 110.0]);
        s.buy(10).unwrap();
        let before = s.snapshot();
        assert!(s.load_candles(vec![]).is_err());
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn buy_scenario() {
        let mut s = session(&[12_500.0, 13_000.0]);
        let entry = s.buy(100).unwrap();
        assert_eq!(entry.side, TradeSide::Buy);
        assert_eq!(entry.id, "T-000001");
        assert!((entry.balance_after - 8_750_000.0).abs() < f64::EPSILON);
        assert!((s.wallet().cash - 8_750_000.0).abs() < f64::EPSILON);
        assert_eq!(s.wallet().holdings, 100);
        assert!((s.wallet().avg_price - 12_500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sell_scenario() {
        let mut s = session(&[12_500.0, 13_000.0]);
        s.buy(100).unwrap();
        s.advance_turn().unwrap();
        s.sell(100).unwrap();
        assert!((s.realized_profit() - 50_000.0).abs() < f64::EPSILON);
        assert!((s.wallet().cash - 10_050_000.0).abs() < f64::EPSILON);
        assert_eq!(s.wallet().holdings, 0);
        assert!((s.wallet().avg_price - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn weighted_average_cost() {
        let mut s = session(&[100.0, 200.0]);
        s.buy(100).unwrap();
        s.advance_turn().unwrap();
        s.buy(100).unwrap();
        assert_eq!(s.wallet().holdings, 200);
        assert!((s.wallet().avg_price - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn insufficient_funds_is_rejected() {
        let mut s = session(&[12_500.0]);
        let before = s.snapshot();
        let err = s.buy(801).unwrap_err();
        assert!(matches!(err, GameError::InsufficientFunds { .. }));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn exact_cash_buy_is_allowed() {
        let mut s = session(&[12_500.0]);
        s.buy(800).unwrap();
        assert!((s.wallet().cash - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut s = session(&[100.0]);
        assert_eq!(s.buy(0), Err(GameError::InvalidQuantity));
        assert_eq!(s.sell(0), Err(GameError::InvalidQuantity));
        assert!(s.trade_history().is_empty());
    }

    #[test]
    fn oversell_is_rejected() {
        let mut s = session(&[100.0]);
        s.buy(10).unwrap();
        assert_eq!(
            s.sell(11),
            Err(GameError::InsufficientHoldings {
                requested: 11,
                held: 10
            })
        );
        assert_eq!(s.trade_history().len(), 1);
    }

    #[test]
    fn advance_past_last_candle_ends_game() {
        let mut s = session(&[100.0, 101.0]);
        assert_eq!(s.advance_turn(), Ok(TurnOutcome::Advanced { turn: 2 }));
        assert_eq!(
            s.advance_turn(),
            Ok(TurnOutcome::GameOver { liquidation: None })
        );
        assert!(s.is_game_over());
        assert!(!s.is_playing());
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn commands_after_game_over_are_rejected() {
        let mut s = session(&[100.0]);
        s.advance_turn().unwrap();
        let before = s.snapshot();
        assert_eq!(s.buy(1), Err(GameError::GameAlreadyOver));
        assert_eq!(s.sell(1), Err(GameError::GameAlreadyOver));
        assert_eq!(s.advance_turn(), Err(GameError::GameAlreadyOver));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn max_turns_liquidates_before_game_over() {
        let config = GameConfig {
            lookback: 0,
            max_turns: Some(3),
            ..GameConfig::default()
        };
        let mut s = GameSession::with_ids(config, SequentialIds::new());
        s.load_candles(flat_candles(&[100.0, 110.0, 120.0, 130.0, 140.0]))
            .unwrap();
        s.buy(100).unwrap();
        s.advance_turn().unwrap();
        s.advance_turn().unwrap();
        assert_eq!(s.turn(), 3);

        let outcome = s.advance_turn().unwrap();
        let TurnOutcome::GameOver {
            liquidation: Some(sale),
        } = outcome
        else {
            panic!("expected liquidation, got {outcome:?}");
        };
        assert_eq!(sale.side, TradeSide::Sell);
        assert_eq!(sale.volume, 100);
        assert!((sale.price - 120.0).abs() < f64::EPSILON);
        assert!(s.is_game_over());
        assert_eq!(s.wallet().holdings, 0);
        assert!((s.realized_profit() - 2_000.0).abs() < f64::EPSILON);
        assert_eq!(s.trade_history().last().unwrap().side, TradeSide::Sell);
    }

    #[test]
    fn liquidation_can_be_disabled() {
        let config = GameConfig {
            lookback: 0,
            auto_liquidate: false,
            ..GameConfig::default()
        };
        let mut s = GameSession::with_ids(config, SequentialIds::new());
        s.load_candles(flat_candles(&[100.0])).unwrap();
        s.buy(5).unwrap();
        s.advance_turn().unwrap();
        assert!(s.is_game_over());
        assert_eq!(s.wallet().holdings, 5);
    }

    #[test]
    fn reset_restores_initial_playing_state() {
        let mut s = session(&[100.0, 110.0]);
        s.buy(10).unwrap();
        s.advance_turn().unwrap();
        s.advance_turn().unwrap();
        assert!(s.is_game_over());

        s.reset();
        assert!(s.is_playing());
        assert_eq!(s.current_index(), 0);
        assert!(s.trade_history().is_empty());
        assert!((s.realized_profit() - 0.0).abs() < f64::EPSILON);
        assert_eq!(s.wallet(), &Wallet::new(DEFAULT_INITIAL_CASH));
        assert_eq!(s.equity_curve().len(), 1);
    }

    #[test]
    fn equity_curve_tracks_each_turn() {
        let mut s = session(&[100.0, 110.0, 90.0]);
        s.buy(1_000).unwrap();
        s.advance_turn().unwrap();
        s.advance_turn().unwrap();
        let curve: Vec<f64> = s.equity_curve().iter().map(|p| p.equity).collect();
        assert_eq!(curve, vec![10_000_000.0, 10_010_000.0, 9_990_000.0]);
    }

    #[test]
    fn derived_values() {
        let mut s = session(&[100.0, 150.0]);
        s.buy(1_000).unwrap();
        s.advance_turn().unwrap();
        assert!((s.position_value() - 150_000.0).abs() < f64::EPSILON);
        assert!((s.unrealized_profit() - 50_000.0).abs() < f64::EPSILON);
        assert!((s.total_assets() - 10_050_000.0).abs() < f64::EPSILON);
        assert!((s.profit_rate() - 0.5).abs() < 1e-12);
        assert!(s.can_buy());
        assert!(s.can_sell());
    }

    #[test]
    fn turns_remaining_respects_budget() {
        let config = GameConfig {
            lookback: 0,
            max_turns: Some(2),
            ..GameConfig::default()
        };
        let mut s = GameSession::with_ids(config, SequentialIds::new());
        s.load_candles(flat_candles(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(s.turns_remaining(), 1);
        s.advance_turn().unwrap();
        assert_eq!(s.turns_remaining(), 0);
    }

    #[test]
    fn final_report_only_after_game_over() {
        let mut s = session(&[100.0]);
        assert!(s.final_report(&AnalysisConfig::default()).is_none());
        s.advance_turn().unwrap();
        assert!(s.final_report(&AnalysisConfig::default()).is_some());
    }

    #[test]
    fn trade_timestamp_comes_from_candle() {
        let date = chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut s = GameSession::with_ids(
            GameConfig {
                lookback: 0,
                ..GameConfig::default()
            },
            SequentialIds::new(),
        );
        s.load_candles(vec![Candle::new(10.0, 10.0, 10.0, 10.0, 1.0).with_time(date)])
            .unwrap();
        let entry = s.buy(1).unwrap();
        assert_eq!(entry.timestamp, Some(date));
    }
}
