//! Game commands and the line-based command script format.
//!
//! One command per line; blank lines and `#` comments are ignored:
//!
//! ```text
//! buy 100      # explicit share count
//! buy          # one lot (shares_per_trade)
//! buy max      # as many shares as cash allows
//! sell all
//! next 5       # advance five turns
//! reset
//! end          # advance until the game is over
//! ```

use std::fmt;

use super::error::{GameError, ParseError};
use super::session::{GameSession, TurnOutcome};
use super::trade_log::{IdGenerator, TradeLogEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Shares(u64),
    /// The configured shares-per-trade lot.
    Lot,
    /// Everything: max affordable for a buy, full holdings for a sell.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Buy(Quantity),
    Sell(Quantity),
    Next(usize),
    Reset,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Traded(TradeLogEntry),
    Advanced { turn: usize },
    GameOver { liquidation: Option<TradeLogEntry> },
    Reset,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Shares(n) => write!(f, " {n}"),
            Quantity::Lot => Ok(()),
            Quantity::All => write!(f, " all"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Buy(q) => write!(f, "buy{q}"),
            Command::Sell(q) => write!(f, "sell{q}"),
            Command::Next(1) => write!(f, "next"),
            Command::Next(n) => write!(f, "next {n}"),
            Command::Reset => write!(f, "reset"),
            Command::End => write!(f, "end"),
        }
    }
}

pub fn parse_script(input: &str) -> Result<Vec<Command>, ParseError> {
    let mut commands = Vec::new();
    for (i, raw) in input.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        commands.push(parse_line(line, i + 1)?);
    }
    Ok(commands)
}

pub fn parse_line(line: &str, line_no: usize) -> Result<Command, ParseError> {
    let err = |message: String| ParseError {
        message,
        line: line_no,
    };

    let mut words = line.split_whitespace();
    let keyword = words
        .next()
        .ok_or_else(|| err("empty command".into()))?
        .to_lowercase();
    let arg = words.next();
    if let Some(extra) = words.next() {
        return Err(err(format!("unexpected argument '{extra}'")));
    }

    let no_arg = |cmd: Command| match arg {
        Some(a) => Err(err(format!("'{keyword}' takes no argument, found '{a}'"))),
        None => Ok(cmd),
    };

    match keyword.as_str() {
        "buy" => Ok(Command::Buy(parse_quantity(arg).map_err(err)?)),
        "sell" => Ok(Command::Sell(parse_quantity(arg).map_err(err)?)),
        "next" => match arg {
            None => Ok(Command::Next(1)),
            Some(a) => match a.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Command::Next(n)),
                _ => Err(err(format!("expected a positive turn count, found '{a}'"))),
            },
        },
        "reset" => no_arg(Command::Reset),
        "end" => no_arg(Command::End),
        other => Err(err(format!("unknown command '{other}'"))),
    }
}

fn parse_quantity(arg: Option<&str>) -> Result<Quantity, String> {
    match arg.map(str::to_lowercase).as_deref() {
        None => Ok(Quantity::Lot),
        Some("all") | Some("max") => Ok(Quantity::All),
        Some(a) => match a.parse::<u64>() {
            Ok(n) if n > 0 => Ok(Quantity::Shares(n)),
            _ => Err(format!("expected a positive whole share count, found '{a}'")),
        },
    }
}

impl<G: IdGenerator> GameSession<G> {
    /// Execute one command against the session.
    pub fn apply(&mut self, command: &Command) -> Result<CommandOutcome, GameError> {
        match *command {
            Command::Buy(quantity) => {
                let shares = match quantity {
                    Quantity::Shares(n) => n,
                    Quantity::Lot => self.config().shares_per_trade,
                    Quantity::All => self.max_affordable(),
                };
                self.buy(shares).map(CommandOutcome::Traded)
            }
            Command::Sell(quantity) => {
                let shares = match quantity {
                    Quantity::Shares(n) => n,
                    Quantity::Lot => self.config().shares_per_trade,
                    Quantity::All => self.wallet().holdings,
                };
                self.sell(shares).map(CommandOutcome::Traded)
            }
            Command::Next(turns) => {
                if turns == 0 {
                    return Err(GameError::InvalidQuantity);
                }
                let mut outcome = self.advance_turn()?;
                for _ in 1..turns {
                    if matches!(outcome, TurnOutcome::GameOver { .. }) {
                        break;
                    }
                    outcome = self.advance_turn()?;
                }
                Ok(outcome.into())
            }
            Command::Reset => {
                self.reset();
                Ok(CommandOutcome::Reset)
            }
            Command::End => loop {
                if let TurnOutcome::GameOver { liquidation } = self.advance_turn()? {
                    break Ok(CommandOutcome::GameOver { liquidation });
                }
            },
        }
    }
}

impl From<TurnOutcome> for CommandOutcome {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Advanced { turn } => CommandOutcome::Advanced { turn },
            TurnOutcome::GameOver { liquidation } => CommandOutcome::GameOver { liquidation },
        }
    }
}
