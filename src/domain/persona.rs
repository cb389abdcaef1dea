//! Trading persona classification.
//!
//! A 2x2 table over (profitable, high-frequency) plus a dedicated category
//! for players who never traded. Every input maps to exactly one persona.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonaKind {
    /// Profitable, high-frequency.
    Sniper,
    /// Profitable, low-frequency.
    Strategist,
    /// Unprofitable, high-frequency.
    Gambler,
    /// Unprofitable, low-frequency.
    Believer,
    /// No trades at all.
    Observer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub kind: PersonaKind,
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub emoji: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRecommendation {
    pub title: &'static str,
    pub content: &'static str,
}

pub fn classify(return_rate: f64, total_trades: usize, high_frequency_threshold: usize) -> PersonaKind {
    if total_trades == 0 {
        return PersonaKind::Observer;
    }

    let is_profitable = return_rate > 0.0;
    let is_high_frequency = total_trades > high_frequency_threshold;

    match (is_profitable, is_high_frequency) {
        (true, true) => PersonaKind::Sniper,
        (true, false) => PersonaKind::Strategist,
        (false, true) => PersonaKind::Gambler,
        (false, false) => PersonaKind::Believer,
    }
}

impl PersonaKind {
    pub const ALL: [PersonaKind; 5] = [
        PersonaKind::Sniper,
        PersonaKind::Strategist,
        PersonaKind::Gambler,
        PersonaKind::Believer,
        PersonaKind::Observer,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PersonaKind::Sniper => "HPP",
            PersonaKind::Strategist => "LPP",
            PersonaKind::Gambler => "HIL",
            PersonaKind::Believer => "LIL",
            PersonaKind::Observer => "NNN",
        }
    }

    pub fn persona(&self) -> Persona {
        let (name, description, emoji) = match self {
            PersonaKind::Sniper => (
                "The Sniper",
                "Quick judgement and decisive execution turn market swings into \
                 opportunities. Your instincts are tuned for short-term trading.",
                "🎯",
            ),
            PersonaKind::Strategist => (
                "The Strategist",
                "You read the bigger trend and wait patiently. You avoid needless \
                 trades and commit when the opportunity is clear.",
                "♟️",
            ),
            PersonaKind::Gambler => (
                "The Gambler",
                "You fight the market, and frequent trading keeps stacking up \
                 losses. Emotion tends to drive your decisions.",
                "🎲",
            ),
            PersonaKind::Believer => (
                "The Believer",
                "Once you buy you rarely sell, and end up an accidental long-term \
                 holder. Cutting losses may feel like defeat.",
                "🙏",
            ),
            PersonaKind::Observer => (
                "The Observer",
                "You have not started trading yet. Watching the market is part of \
                 investing too.",
                "🔭",
            ),
        };

        Persona {
            kind: *self,
            code: self.code(),
            name,
            description,
            emoji,
        }
    }

    pub fn recommendation(&self) -> StrategyRecommendation {
        let (title, content) = match self {
            PersonaKind::Sniper => (
                "Sharpen your momentum trading",
                "Keep your instincts but focus harder on the risk/reward ratio. A \
                 high win rate means little if one large loss wipes it out. Turn \
                 your scalping or day-trading habits into a written system.",
            ),
            PersonaKind::Strategist => (
                "Trend following and swing trading",
                "Well done. Keep trading with the trend. Sizing positions through \
                 money management will let you compound gains, and adding \
                 fundamental analysis will strengthen your conviction.",
            ),
            PersonaKind::Gambler => (
                "Limit trade count and stop impulse trading",
                "Pause. Set a rule of at most three trades per game, and write down \
                 why you are buying before every entry. Revisit the basics of \
                 technical analysis such as support and resistance.",
            ),
            PersonaKind::Believer => (
                "Set stop-loss rules and scale into positions",
                "A stop-loss protects your capital; it is not a failure. Decide your \
                 exit price when you enter, and practise dollar-cost averaging \
                 instead of committing all your cash at once.",
            ),
            PersonaKind::Observer => (
                "Start with a practice trade",
                "Even a small buy and sell teaches you how the market feels. Use \
                 money you can afford to lose to build that sense.",
            ),
        };

        StrategyRecommendation { title, content }
    }
}
