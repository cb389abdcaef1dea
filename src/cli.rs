//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::{write_candles, CsvCandleAdapter};
use crate::adapters::csv_trade_store::CsvTradeStore;
use crate::adapters::demo_adapter::{DemoCandleAdapter, DEMO_HISTORY_LEN};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::random_walk_adapter::{self, RandomWalkAdapter};
use crate::domain::analytics::{self, AnalysisConfig, AnalysisReport};
use crate::domain::candle::CandleSeries;
use crate::domain::command::{parse_script, CommandOutcome};
use crate::domain::config_validation::{
    validate_analysis_config, validate_data_config, validate_game_config,
};
use crate::domain::error::TradesimError;
use crate::domain::indicator;
use crate::domain::session::{
    GameConfig, GameSession, DEFAULT_INITIAL_CASH, DEFAULT_LOOKBACK, DEFAULT_SHARES_PER_TRADE,
};
use crate::domain::trade_log::{IdGenerator, TradeLogEntry, TradeSide};
use crate::ports::candle_port::CandlePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::trade_store_port::TradeStorePort;

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Candle chart trading game")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a game by replaying a command script
    Play {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Command script; reads stdin when omitted
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Candle CSV, overrides [data] in the config
        #[arg(long)]
        candles: Option<PathBuf>,
        /// Trade store CSV, overrides [store] trades_path
        #[arg(long)]
        trades_out: Option<PathBuf>,
    },
    /// Analyze a stored trade log
    Analyze {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        trades: Option<PathBuf>,
        /// Final total assets; estimated from the log when omitted
        #[arg(long)]
        final_equity: Option<f64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Summarize a candle series with chart indicators
    Info {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        candles: Option<PathBuf>,
    },
    /// Write a random-walk candle series as CSV
    Generate {
        #[arg(long, default_value_t = random_walk_adapter::DEFAULT_COUNT)]
        count: usize,
        #[arg(long, default_value_t = random_walk_adapter::DEFAULT_START_PRICE)]
        start_price: f64,
        #[arg(long, default_value_t = random_walk_adapter::DEFAULT_VOLATILITY)]
        volatility: f64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// Output file; writes stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Play {
            config,
            script,
            candles,
            trades_out,
        } => run_play(
            config.as_ref(),
            script.as_ref(),
            candles.as_ref(),
            trades_out.as_ref(),
        ),
        Command::Analyze {
            config,
            trades,
            final_equity,
        } => run_analyze(config.as_ref(), trades.as_ref(), final_equity),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, candles } => run_info(config.as_ref(), candles.as_ref()),
        Command::Generate {
            count,
            start_price,
            volatility,
            seed,
            start_date,
            output,
        } => {
            let generator = RandomWalkAdapter {
                count,
                start_price,
                volatility,
                seed,
                start_date: start_date.or(RandomWalkAdapter::default().start_date),
            };
            run_generate(&generator, output.as_ref())
        }
    }
}

fn fail(err: TradesimError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        fail(TradesimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })
    })
}

/// Without a config file every setting takes its default.
fn load_optional_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            load_config(p)
        }
        None => FileConfigAdapter::from_string("").map_err(|reason| {
            fail(TradesimError::ConfigParse {
                file: "<defaults>".to_string(),
                reason,
            })
        }),
    }
}

/// The demo chart carries its own history window, so play starts right after
/// it unless `[game] lookback` says otherwise.
fn default_lookback(config: &dyn ConfigPort, candles_override: Option<&PathBuf>) -> usize {
    let demo_source = candles_override.is_none()
        && config
            .get_string("data", "source")
            .is_none_or(|s| s.trim().eq_ignore_ascii_case("demo"));
    if demo_source {
        DEMO_HISTORY_LEN
    } else {
        DEFAULT_LOOKBACK
    }
}

pub fn build_game_config(
    config: &dyn ConfigPort,
    candles_override: Option<&PathBuf>,
) -> Result<GameConfig, TradesimError> {
    validate_game_config(config)?;

    let fallback_lookback = default_lookback(config, candles_override);
    let lookback = config.get_int("game", "lookback", fallback_lookback as i64);
    let max_turns = config.get_int("game", "max_turns", 0);
    let shares = config.get_int("game", "shares_per_trade", DEFAULT_SHARES_PER_TRADE as i64);

    Ok(GameConfig {
        initial_cash: config.get_double("game", "initial_cash", DEFAULT_INITIAL_CASH),
        lookback: usize::try_from(lookback).unwrap_or(fallback_lookback),
        max_turns: usize::try_from(max_turns).ok().filter(|n| *n > 0),
        shares_per_trade: u64::try_from(shares).unwrap_or(DEFAULT_SHARES_PER_TRADE),
        auto_liquidate: config.get_bool("game", "auto_liquidate", true),
    })
}

pub fn build_analysis_config(config: &dyn ConfigPort) -> Result<AnalysisConfig, TradesimError> {
    validate_analysis_config(config)?;

    let defaults = AnalysisConfig::default();
    let threshold = config.get_int(
        "analysis",
        "high_frequency_threshold",
        defaults.high_frequency_threshold as i64,
    );

    Ok(AnalysisConfig {
        high_frequency_threshold: usize::try_from(threshold)
            .unwrap_or(defaults.high_frequency_threshold),
        risk_free_rate: config.get_double("analysis", "risk_free_rate", defaults.risk_free_rate),
        periods_per_year: config.get_double(
            "analysis",
            "periods_per_year",
            defaults.periods_per_year,
        ),
    })
}

/// Resolve the candle source: an explicit CSV path wins over `[data]`.
pub fn build_candle_port(
    config: &dyn ConfigPort,
    candles_override: Option<&PathBuf>,
) -> Result<Box<dyn CandlePort>, TradesimError> {
    if let Some(path) = candles_override {
        return Ok(Box::new(CsvCandleAdapter::new(path)));
    }

    validate_data_config(config)?;
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "demo".to_string());

    match source.trim().to_lowercase().as_str() {
        "csv" => {
            let path = config
                .get_string("data", "path")
                .ok_or_else(|| TradesimError::ConfigMissing {
                    section: "data".into(),
                    key: "path".into(),
                })?;
            Ok(Box::new(CsvCandleAdapter::new(path.trim())))
        }
        "random" => {
            let defaults = RandomWalkAdapter::default();
            let start_date = match config.get_string("data", "start_date") {
                Some(s) => Some(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(
                    |_| TradesimError::ConfigInvalid {
                        section: "data".into(),
                        key: "start_date".into(),
                        reason: "invalid date format (expected YYYY-MM-DD)".into(),
                    },
                )?),
                None => defaults.start_date,
            };
            let seed = config
                .get_string("data", "seed")
                .and_then(|s| s.trim().parse::<u64>().ok());

            Ok(Box::new(RandomWalkAdapter {
                count: usize::try_from(config.get_int("data", "count", defaults.count as i64))
                    .unwrap_or(defaults.count),
                start_price: config.get_double("data", "start_price", defaults.start_price),
                volatility: config.get_double("data", "volatility", defaults.volatility),
                seed,
                start_date,
            }))
        }
        _ => Ok(Box::new(DemoCandleAdapter)),
    }
}

fn resolve_trades_path(config: &dyn ConfigPort, override_path: Option<&PathBuf>) -> Option<PathBuf> {
    override_path.cloned().or_else(|| {
        config
            .get_string("store", "trades_path")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    })
}

fn run_play(
    config_path: Option<&PathBuf>,
    script_path: Option<&PathBuf>,
    candles_path: Option<&PathBuf>,
    trades_out: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let game_config = match build_game_config(&adapter, candles_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let analysis_config = match build_analysis_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    // Stage 2: Load candles into a fresh session
    let candle_port = match build_candle_port(&adapter, candles_path) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let candles = match candle_port.fetch_candles() {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let mut session = GameSession::new(game_config);
    if let Err(e) = session.load_candles(candles) {
        return fail(e);
    }
    eprintln!(
        "Loaded {} candles, starting at turn 1 (price {:.2})",
        session.candles().map(|s| s.len()).unwrap_or(0),
        session.current_price().unwrap_or(0.0)
    );

    // Stage 3: Parse the command script
    let script = match read_script(script_path) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let commands = match parse_script(&script) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e.display_with_context(&script));
            return (&TradesimError::Script(e)).into();
        }
    };

    // Stage 4: Replay
    let mut rejected = 0usize;
    for command in &commands {
        match session.apply(command) {
            Ok(outcome) => print_outcome(command, &outcome),
            Err(e) => {
                rejected += 1;
                eprintln!("  {command}: rejected: {e}");
            }
        }
    }
    if rejected > 0 {
        eprintln!("{} of {} commands rejected", rejected, commands.len());
    }

    // Stage 5: Summary and report
    print_session_summary(&session);
    match session.final_report(&analysis_config) {
        Some(report) => print_report(&report),
        None => eprintln!(
            "\nGame in progress: {} turns remaining",
            session.turns_remaining()
        ),
    }

    // Stage 6: Persist the trade log
    if let Some(path) = resolve_trades_path(&adapter, trades_out) {
        let store = CsvTradeStore::new(&path);
        if let Err(e) = store.save_all(session.trade_history()) {
            return fail(e);
        }
        eprintln!("\nTrades written to: {}", path.display());
    }

    ExitCode::SUCCESS
}

fn read_script(path: Option<&PathBuf>) -> Result<String, TradesimError> {
    match path {
        Some(p) => fs::read_to_string(p).map_err(TradesimError::from),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn print_outcome(command: &crate::domain::command::Command, outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Traded(trade) => eprintln!(
            "  {command}: {} {} @ {:.2} (cash {:.2})",
            trade.side, trade.volume, trade.price, trade.balance_after
        ),
        CommandOutcome::Advanced { turn } => eprintln!("  {command}: turn {turn}"),
        CommandOutcome::GameOver { liquidation } => {
            if let Some(sale) = liquidation {
                eprintln!(
                    "  {command}: liquidated {} @ {:.2}",
                    sale.volume, sale.price
                );
            }
            eprintln!("  {command}: game over");
        }
        CommandOutcome::Reset => eprintln!("  {command}: session reset"),
    }
}

fn print_session_summary<G: IdGenerator>(session: &GameSession<G>) {
    let wallet = session.wallet();
    eprintln!("\n=== Session ===");
    eprintln!("Turn:             {}", session.turn());
    eprintln!("Price:            {:.2}", session.current_price().unwrap_or(0.0));
    eprintln!("Cash:             {:.2}", wallet.cash);
    eprintln!("Holdings:         {}", wallet.holdings);
    eprintln!("Average Price:    {:.2}", wallet.avg_price);
    eprintln!("Realized P&L:     {:.2}", session.realized_profit());
    eprintln!("Unrealized P&L:   {:.2}", session.unrealized_profit());
    eprintln!("Total Assets:     {:.2}", session.total_assets());
    eprintln!("Profit Rate:      {:.2}%", session.profit_rate());
    eprintln!("Trades:           {}", session.trade_history().len());
}

fn print_report(report: &AnalysisReport) {
    eprintln!("\n=== Analysis ({}) ===", report.mode.label());
    eprintln!("Return:           {:.2}%", report.return_rate);
    eprintln!("Turnover:         {}", report.turnover);
    eprintln!("Volatility:       {:.2}%", report.volatility);
    eprintln!("Sharpe Ratio:     {:.2}", report.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", report.mdd);
    eprintln!("Win Rate:         {:.1}%", report.win_rate);
    eprintln!("Profit Factor:    {:.2}", report.profit_factor);

    let persona = &report.persona;
    eprintln!(
        "\n{} {} [{}]",
        persona.emoji, persona.name, persona.code
    );
    eprintln!("{}", persona.description);
    eprintln!("\nRecommended: {}", report.strategy_recommendation.title);
    eprintln!("{}", report.strategy_recommendation.content);
}

/// Cash after the last trade plus the replayed position valued at the last
/// traded price.
pub fn estimate_final_equity(trades: &[TradeLogEntry], initial_cash: f64) -> f64 {
    let Some(last) = trades.last() else {
        return initial_cash;
    };
    let holdings = trades.iter().fold(0u64, |held, t| match t.side {
        TradeSide::Buy => held + t.volume,
        TradeSide::Sell => held.saturating_sub(t.volume),
    });
    last.balance_after + holdings as f64 * last.price
}

fn run_analyze(
    config_path: Option<&PathBuf>,
    trades_path: Option<&PathBuf>,
    final_equity: Option<f64>,
) -> ExitCode {
    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let game_config = match build_game_config(&adapter, None) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let analysis_config = match build_analysis_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let Some(path) = resolve_trades_path(&adapter, trades_path) else {
        return fail(TradesimError::ConfigMissing {
            section: "store".into(),
            key: "trades_path".into(),
        });
    };
    eprintln!("Loading trades from {}", path.display());
    let trades = match CsvTradeStore::new(&path).load_trades() {
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    let final_equity =
        final_equity.unwrap_or_else(|| estimate_final_equity(&trades, game_config.initial_cash));
    eprintln!(
        "{} trades, final equity {:.2}",
        trades.len(),
        final_equity
    );

    let report = analytics::analyze(
        &trades,
        final_equity,
        game_config.initial_cash,
        None,
        &analysis_config,
    );
    print_report(&report);
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let game = match build_game_config(&adapter, None) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let analysis = match build_analysis_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = validate_data_config(&adapter) {
        return fail(e);
    }

    eprintln!("\n[game]");
    eprintln!("  initial_cash:     {:.2}", game.initial_cash);
    eprintln!("  lookback:         {}", game.lookback);
    match game.max_turns {
        Some(n) => eprintln!("  max_turns:        {n}"),
        None => eprintln!("  max_turns:        unlimited"),
    }
    eprintln!("  shares_per_trade: {}", game.shares_per_trade);
    eprintln!("  auto_liquidate:   {}", game.auto_liquidate);
    eprintln!("\n[analysis]");
    eprintln!("  high_frequency_threshold: {}", analysis.high_frequency_threshold);
    eprintln!("  risk_free_rate:           {}", analysis.risk_free_rate);
    eprintln!("  periods_per_year:         {}", analysis.periods_per_year);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: Option<&PathBuf>, candles_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let candles = match build_candle_port(&adapter, candles_path).and_then(|p| p.fetch_candles())
    {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let series = match CandleSeries::new(candles) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let candles = series.as_slice();
    let last = series.last_index();
    let fmt_opt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
    let fmt_date =
        |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());

    let bands = indicator::bollinger(candles, 20, 2.0);
    println!("candles:   {}", series.len());
    println!(
        "range:     {} .. {}",
        fmt_date(candles[0].time),
        fmt_date(candles[last].time)
    );
    println!("last:      {:.2}", candles[last].close);
    println!("sma(5):    {}", fmt_opt(indicator::sma(candles, 5)[last]));
    println!("sma(20):   {}", fmt_opt(indicator::sma(candles, 20)[last]));
    println!("rsi(14):   {}", fmt_opt(indicator::rsi(candles, 14)[last]));
    println!(
        "bb(20,2):  {} / {} / {}",
        fmt_opt(bands.upper[last]),
        fmt_opt(bands.middle[last]),
        fmt_opt(bands.lower[last])
    );
    ExitCode::SUCCESS
}

fn run_generate(generator: &RandomWalkAdapter, output: Option<&PathBuf>) -> ExitCode {
    let candles = match generator.generate() {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let written = match output {
        Some(path) => File::create(path)
            .map_err(TradesimError::from)
            .and_then(|f| write_candles(f, &candles)),
        None => write_candles(io::stdout().lock(), &candles),
    };
    if let Err(e) = written {
        return fail(e);
    }

    if let Some(path) = output {
        eprintln!("{} candles written to: {}", candles.len(), path.display());
    }
    ExitCode::SUCCESS
}
