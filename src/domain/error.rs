//! Domain error types.

/// A parse error with line information for command scripts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error on line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    /// Format the error together with the offending script line.
    pub fn display_with_context(&self, input: &str) -> String {
        let source = input
            .lines()
            .nth(self.line.saturating_sub(1))
            .unwrap_or_default();
        format!("{:>4} | {}\n{err}", self.line, source, err = self)
    }
}

/// A rejected game command. The session is never mutated when one of these
/// is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("quantity must be a positive whole number of shares")]
    InvalidQuantity,

    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("insufficient holdings: requested {requested}, holding {held}")]
    InsufficientHoldings { requested: u64, held: u64 },

    #[error("game is over; reset to play again")]
    GameAlreadyOver,

    #[error("no candles loaded")]
    NotStarted,
}

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("invalid candle series: {reason}")]
    InvalidCandleSeries { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("trade store error: {reason}")]
    Store { reason: String },

    #[error(transparent)]
    Script(#[from] ParseError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        let code: u8 = match err {
            TradesimError::Io(_) => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::ConfigInvalid { .. } => 2,
            TradesimError::Data { .. } | TradesimError::Store { .. } => 3,
            TradesimError::Script(_) => 4,
            TradesimError::InvalidCandleSeries { .. } => 5,
            TradesimError::Game(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}
