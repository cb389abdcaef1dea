//! Wallet state and weighted-average cost accounting.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub cash: f64,
    pub holdings: u64,
    pub avg_price: f64,
}

impl Wallet {
    pub fn new(initial_cash: f64) -> Self {
        Wallet {
            cash: initial_cash,
            holdings: 0,
            avg_price: 0.0,
        }
    }

    pub fn has_position(&self) -> bool {
        self.holdings > 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.holdings as f64 * price
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.market_value(price)
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        if self.holdings == 0 {
            return 0.0;
        }
        self.holdings as f64 * (price - self.avg_price)
    }

    /// Whole shares purchasable with current cash at `price`.
    pub fn max_affordable(&self, price: f64) -> u64 {
        if price <= 0.0 || self.cash <= 0.0 {
            return 0;
        }
        let mut quantity = (self.cash / price).floor() as u64;
        // floor() on the ratio can overshoot by one when cash is an exact
        // multiple of a price that is not representable in binary.
        while quantity > 0 && price * quantity as f64 > self.cash {
            quantity -= 1;
        }
        quantity
    }

    /// Apply a fill bought at `price`. The caller has checked funds.
    pub(crate) fn apply_buy(&mut self, price: f64, quantity: u64) -> f64 {
        let cost = price * quantity as f64;
        let new_holdings = self.holdings + quantity;
        let total_cost = self.avg_price * self.holdings as f64 + cost;
        self.avg_price = total_cost / new_holdings as f64;
        self.holdings = new_holdings;
        self.cash -= cost;
        cost
    }

    /// Apply a fill sold at `price` and return the realized profit. The
    /// caller has checked holdings.
    pub(crate) fn apply_sell(&mut self, price: f64, quantity: u64) -> f64 {
        let revenue = price * quantity as f64;
        let profit = (price - self.avg_price) * quantity as f64;
        self.holdings -= quantity;
        self.cash += revenue;
        if self.holdings == 0 {
            self.avg_price = 0.0;
        }
        profit
    }
}
