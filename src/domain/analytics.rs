//! Performance analytics over a finished game.
//!
//! Closed-trade statistics are always derived by replaying the trade log with
//! weighted-average cost. Risk metrics (volatility, Sharpe, drawdown) come
//! from the per-turn equity curve when it spans at least two turns; otherwise a
//! return-driven approximation is used and the report says so.

use super::persona::{self, Persona, StrategyRecommendation};
use super::session::{EquityPoint, GameSession};
use super::trade_log::{IdGenerator, TradeLogEntry, TradeSide};

pub const DEFAULT_HIGH_FREQUENCY_THRESHOLD: usize = 15;
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// More trades than this counts as high-frequency.
    pub high_frequency_threshold: usize,
    /// Annual risk-free rate as a fraction (0.05 = 5%).
    pub risk_free_rate: f64,
    /// Turns per year, used to annualize the Sharpe ratio.
    pub periods_per_year: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            high_frequency_threshold: DEFAULT_HIGH_FREQUENCY_THRESHOLD,
            risk_free_rate: 0.0,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsMode {
    /// Risk metrics computed from the per-turn equity curve.
    EquityCurve,
    /// Risk metrics approximated from the return rate and trade count.
    Heuristic,
}

impl MetricsMode {
    pub fn label(&self) -> &'static str {
        match self {
            MetricsMode::EquityCurve => "equity curve",
            MetricsMode::Heuristic => "heuristic",
        }
    }
}

/// One SELL matched against the average cost of the position it closed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub turn: usize,
    pub quantity: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Percent.
    pub return_rate: f64,
    pub turnover: usize,
    /// Percent per turn.
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Percent.
    pub mdd: f64,
    /// Percent of closed trades with positive P&L.
    pub win_rate: f64,
    pub profit_factor: f64,
    pub persona: Persona,
    pub strategy_recommendation: StrategyRecommendation,
    pub mode: MetricsMode,
    pub closed_trades: Vec<ClosedTrade>,
}

pub fn analyze_session<G: IdGenerator>(
    session: &GameSession<G>,
    config: &AnalysisConfig,
) -> AnalysisReport {
    analyze(
        session.trade_history(),
        session.total_assets(),
        session.config().initial_cash,
        Some(session.equity_curve()),
        config,
    )
}

pub fn analyze(
    trade_history: &[TradeLogEntry],
    final_equity: f64,
    initial_cash: f64,
    equity_curve: Option<&[EquityPoint]>,
    config: &AnalysisConfig,
) -> AnalysisReport {
    let total_trades = trade_history.len();
    let return_rate = if initial_cash > 0.0 {
        (final_equity - initial_cash) / initial_cash * 100.0
    } else {
        0.0
    };

    let closed_trades = reconstruct_closed_trades(trade_history);
    let (win_rate, profit_factor) = trade_stats(&closed_trades);

    let (mode, volatility, sharpe_ratio, mdd) = match equity_curve {
        Some(curve) if curve.len() >= 2 => {
            let rf_per_period = if config.periods_per_year > 0.0 {
                config.risk_free_rate / config.periods_per_year
            } else {
                0.0
            };
            let (volatility, sharpe) =
                compute_risk_adjusted(curve, rf_per_period, config.periods_per_year);
            let mdd = compute_drawdown(curve) * 100.0;
            (MetricsMode::EquityCurve, volatility, sharpe, mdd)
        }
        _ => {
            let (volatility, sharpe, mdd) = heuristic_risk(return_rate, total_trades);
            (MetricsMode::Heuristic, volatility, sharpe, mdd)
        }
    };

    let kind = persona::classify(return_rate, total_trades, config.high_frequency_threshold);

    AnalysisReport {
        return_rate,
        turnover: total_trades,
        volatility,
        sharpe_ratio,
        mdd,
        win_rate,
        profit_factor,
        persona: kind.persona(),
        strategy_recommendation: kind.recommendation(),
        mode,
        closed_trades,
    }
}

/// Replay the log and price each SELL against the running average cost.
///
/// Sells larger than the replayed position (possible with logs that were
/// edited in an external store) are matched only up to what was held.
pub fn reconstruct_closed_trades(trade_history: &[TradeLogEntry]) -> Vec<ClosedTrade> {
    let mut holdings = 0u64;
    let mut avg_price = 0.0_f64;
    let mut closed = Vec::new();

    for entry in trade_history {
        match entry.side {
            TradeSide::Buy => {
                if entry.volume == 0 {
                    continue;
                }
                let total_cost = avg_price * holdings as f64 + entry.amount();
                holdings += entry.volume;
                avg_price = total_cost / holdings as f64;
            }
            TradeSide::Sell => {
                let quantity = entry.volume.min(holdings);
                if quantity == 0 {
                    continue;
                }
                closed.push(ClosedTrade {
                    turn: entry.turn,
                    quantity,
                    entry_price: avg_price,
                    exit_price: entry.price,
                    pnl: (entry.price - avg_price) * quantity as f64,
                });
                holdings -= quantity;
                if holdings == 0 {
                    avg_price = 0.0;
                }
            }
        }
    }

    closed
}

fn trade_stats(closed_trades: &[ClosedTrade]) -> (f64, f64) {
    let mut won = 0usize;
    let mut gross_profit = 0.0_f64;
    let mut gross_loss = 0.0_f64;

    for trade in closed_trades {
        if trade.pnl > 0.0 {
            won += 1;
            gross_profit += trade.pnl;
        } else if trade.pnl < 0.0 {
            gross_loss += trade.pnl.abs();
        }
    }

    let win_rate = if closed_trades.is_empty() {
        0.0
    } else {
        won as f64 / closed_trades.len() as f64 * 100.0
    };

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    (win_rate, profit_factor)
}

/// Largest peak-to-trough decline as a fraction of the peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// (volatility in percent, annualized Sharpe ratio) from per-turn returns.
fn compute_risk_adjusted(
    equity_curve: &[EquityPoint],
    rf_per_period: f64,
    periods_per_year: f64,
) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let sharpe = if stddev > 0.0 {
        (mean - rf_per_period) / stddev * periods_per_year.max(0.0).sqrt()
    } else {
        0.0
    };

    (stddev * 100.0, sharpe)
}

/// Return-driven approximation used when no equity curve is available.
/// Returns (volatility, sharpe, mdd).
fn heuristic_risk(return_rate: f64, total_trades: usize) -> (f64, f64, f64) {
    let volatility = return_rate.abs() / (total_trades.max(1) as f64).sqrt();
    let sharpe = if volatility == 0.0 {
        0.0
    } else {
        return_rate / volatility
    };
    let mdd = if return_rate < 0.0 {
        return_rate.abs() * 1.2
    } else {
        return_rate.abs() * 0.3
    };
    (volatility, sharpe, mdd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::persona::PersonaKind;
    use approx::assert_abs_diff_eq;

    fn entry(turn: usize, side: TradeSide, price: f64, volume: u64) -> TradeLogEntry {
        TradeLogEntry {
            id: format!("T-{turn}"),
            turn,
            timestamp: None,
            side,
            price,
            volume,
            balance_after: 0.0,
        }
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                index: i,
                turn: i + 1,
                equity,
            })
            .collect()
    }

    #[test]
    fn return_rate_and_turnover() {
        let history = vec![
            entry(1, TradeSide::Buy, 100.0, 10),
            entry(2, TradeSide::Sell, 110.0, 10),
        ];
        let report = analyze(&history, 1_100.0, 1_000.0, None, &AnalysisConfig::default());
        assert_abs_diff_eq!(report.return_rate, 10.0, epsilon = 1e-9);
        assert_eq!(report.turnover, 2);
    }

    #[test]
    fn replay_uses_weighted_average_cost() {
        let history = vec![
            entry(1, TradeSide::Buy, 100.0, 100),
            entry(2, TradeSide::Buy, 200.0, 100),
            entry(3, TradeSide::Sell, 180.0, 50),
            entry(4, TradeSide::Sell, 120.0, 150),
        ];
        let closed = reconstruct_closed_trades(&history);
        assert_eq!(closed.len(), 2);
        assert_abs_diff_eq!(closed[0].entry_price, 150.0);
        assert_abs_diff_eq!(closed[0].pnl, 1_500.0);
        assert_abs_diff_eq!(closed[1].pnl, -4_500.0);
    }

    #[test]
    fn replay_clamps_oversized_sells() {
        let history = vec![
            entry(1, TradeSide::Sell, 100.0, 10),
            entry(2, TradeSide::Buy, 100.0, 5),
            entry(3, TradeSide::Sell, 120.0, 10),
        ];
        let closed = reconstruct_closed_trades(&history);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].quantity, 5);
        assert_abs_diff_eq!(closed[0].pnl, 100.0);
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let history = vec![
            entry(1, TradeSide::Buy, 100.0, 10),
            entry(2, TradeSide::Sell, 120.0, 10),
            entry(3, TradeSide::Buy, 100.0, 10),
            entry(4, TradeSide::Sell, 90.0, 10),
            entry(5, TradeSide::Buy, 100.0, 10),
            entry(6, TradeSide::Sell, 130.0, 10),
        ];
        let report = analyze(&history, 0.0, 1.0, None, &AnalysisConfig::default());
        assert_abs_diff_eq!(report.win_rate, 200.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.profit_factor, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let history = vec![
            entry(1, TradeSide::Buy, 100.0, 10),
            entry(2, TradeSide::Sell, 120.0, 10),
        ];
        let report = analyze(&history, 0.0, 1.0, None, &AnalysisConfig::default());
        assert!(report.profit_factor.is_infinite());
    }

    #[test]
    fn no_closed_trades_means_zero_stats() {
        let history = vec![entry(1, TradeSide::Buy, 100.0, 10)];
        let report = analyze(&history, 1.0, 1.0, None, &AnalysisConfig::default());
        assert_abs_diff_eq!(report.win_rate, 0.0);
        assert_abs_diff_eq!(report.profit_factor, 0.0);
    }

    #[test]
    fn max_drawdown_from_curve() {
        let c = curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_abs_diff_eq!(compute_drawdown(&c), (110.0 - 80.0) / 110.0, epsilon = 1e-12);
    }

    #[test]
    fn flat_curve_has_no_risk() {
        let c = curve(&[100.0, 100.0, 100.0]);
        let (vol, sharpe) = compute_risk_adjusted(&c, 0.0, 252.0);
        assert_abs_diff_eq!(vol, 0.0);
        assert_abs_diff_eq!(sharpe, 0.0);
    }

    #[test]
    fn volatility_is_population_stddev_of_returns() {
        // returns: +10%, -10%
        let c = curve(&[100.0, 110.0, 99.0]);
        let (vol, sharpe) = compute_risk_adjusted(&c, 0.0, 1.0);
        assert_abs_diff_eq!(vol, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sharpe, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn rising_curve_has_positive_sharpe() {
        let values: Vec<f64> = (0..30).map(|i| 1_000.0 * (1.0 + 0.001 * (i * i) as f64)).collect();
        let report = analyze(
            &[],
            *values.last().unwrap(),
            1_000.0,
            Some(&curve(&values)),
            &AnalysisConfig::default(),
        );
        assert_eq!(report.mode, MetricsMode::EquityCurve);
        assert!(report.sharpe_ratio > 0.0);
        assert_abs_diff_eq!(report.mdd, 0.0);
    }

    #[test]
    fn heuristic_mode_without_curve() {
        let history = vec![
            entry(1, TradeSide::Buy, 100.0, 10),
            entry(2, TradeSide::Sell, 80.0, 10),
            entry(3, TradeSide::Buy, 100.0, 10),
            entry(4, TradeSide::Sell, 80.0, 10),
        ];
        let report = analyze(&history, 900.0, 1_000.0, None, &AnalysisConfig::default());
        assert_eq!(report.mode, MetricsMode::Heuristic);
        // r = -10%, 4 trades
        assert_abs_diff_eq!(report.volatility, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.sharpe_ratio, -2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.mdd, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn heuristic_mode_for_empty_curve() {
        let report = analyze(&[], 1_000.0, 1_000.0, Some(&[]), &AnalysisConfig::default());
        assert_eq!(report.mode, MetricsMode::Heuristic);
        assert_abs_diff_eq!(report.volatility, 0.0);
        assert_abs_diff_eq!(report.sharpe_ratio, 0.0);
    }

    #[test]
    fn single_point_curve_falls_back_to_heuristic() {
        let history = vec![
            entry(1, TradeSide::Buy, 100.0, 10),
            entry(1, TradeSide::Sell, 90.0, 10),
        ];
        let c = curve(&[900.0]);
        let report = analyze(&history, 900.0, 1_000.0, Some(&c), &AnalysisConfig::default());
        assert_eq!(report.mode, MetricsMode::Heuristic);
        // r = -10%, 2 trades
        assert_abs_diff_eq!(report.volatility, 10.0 / 2.0_f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(report.mdd, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn no_trades_is_observer() {
        let report = analyze(&[], 2_000.0, 1_000.0, None, &AnalysisConfig::default());
        assert_eq!(report.persona.kind, PersonaKind::Observer);
        assert_eq!(report.persona.code, "NNN");
    }

    #[test]
    fn zero_initial_cash_does_not_divide() {
        let report = analyze(&[], 0.0, 0.0, None, &AnalysisConfig::default());
        assert!(report.return_rate.is_finite());
        assert_abs_diff_eq!(report.return_rate, 0.0);
    }

    #[test]
    fn analysis_is_idempotent() {
        let history = vec![
            entry(1, TradeSide::Buy, 100.0, 10),
            entry(2, TradeSide::Sell, 105.0, 5),
        ];
        let c = curve(&[1_000.0, 1_020.0, 1_010.0]);
        let config = AnalysisConfig::default();
        let a = analyze(&history, 1_010.0, 1_000.0, Some(&c), &config);
        let b = analyze(&history, 1_010.0, 1_000.0, Some(&c), &config);
        assert_eq!(a, b);
    }
}
