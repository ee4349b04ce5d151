//! Portfolio Engine — Client-side portfolio aggregation
//!
//! Implements spec §4.9 (Account Aggregates) with deterministic computation.
//! Uses `BTreeMap` for sorted iteration per spec §12.3.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::account::Balance;
use types::ids::AccountId;
use types::numeric::Price;
use types::position::{Position, PositionSide};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Internal precision for intermediate calculations (spec §12, 18 dp).
const INTERNAL_DP: u32 = 18;

/// Display precision for output values (8 dp, spec §7.2).
const DISPLAY_DP: u32 = 8;

// ---------------------------------------------------------------------------
// Portfolio struct
// ---------------------------------------------------------------------------

/// Client-side portfolio snapshot.
///
/// All fields use deterministic containers (`BTreeMap`) so iteration order
/// is identical across nodes and runs (spec §12.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Owning account
    pub account_id: AccountId,

    /// Per-asset balances keyed by asset symbol (sorted)
    pub balances: BTreeMap<String, Balance>,

    /// Open positions keyed by symbol (sorted)
    pub positions: BTreeMap<String, Position>,

    /// Mark / index prices keyed by symbol (sorted)
    pub prices: BTreeMap<String, Price>,
}

// ---------------------------------------------------------------------------
// Portfolio summary (serialization bridge)
// ---------------------------------------------------------------------------

/// Lightweight summary suitable for JSON transport to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub account_id: AccountId,
    pub total_equity: Decimal,
    pub total_balance_value: Decimal,
    pub total_unrealized_pnl: Decimal,
    pub total_realized_pnl: Decimal,
    pub position_count: usize,
    pub asset_count: usize,
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl Portfolio {
    /// Create an empty portfolio for the given account.
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            balances: BTreeMap::new(),
            positions: BTreeMap::new(),
            prices: BTreeMap::new(),
        }
    }

    // -- mutators ----------------------------------------------------------

    /// Insert or replace a balance entry.
    pub fn set_balance(&mut self, balance: Balance) {
        self.balances.insert(balance.asset.clone(), balance);
    }

    /// Insert or replace a position entry.
    pub fn set_position(&mut self, position: Position) {
        self.positions
            .insert(position.symbol.as_str().to_owned(), position);
    }

    /// Insert or replace a price entry.
    pub fn set_price(&mut self, symbol: &str, price: Price) {
        self.prices.insert(symbol.to_owned(), price);
    }

    // -- balance queries ---------------------------------------------------

    /// Retrieve balance for a single asset.
    pub fn get_balance(&self, asset: &str) -> Option<&Balance> {
        self.balances.get(asset)
    }

    /// Compute the total value of all balances in quote terms.
    ///
    /// For each asset, value = `balance.total × price`.  If no price is
    /// available the asset is treated as a stablecoin with price = 1.
    ///
    /// Rounding: intermediate at `INTERNAL_DP`, final at `DISPLAY_DP` HALF_UP.
    pub fn total_balance_value(&self) -> Decimal {
        let mut total = Decimal::ZERO;
        for (asset, balance) in &self.balances {
            let price = self
                .prices
                .get(asset)
                .map(|p| p.as_decimal())
                .unwrap_or(Decimal::ONE);
            let value = balance.total * price;
            total += value
                .round_dp_with_strategy(INTERNAL_DP, RoundingStrategy::MidpointAwayFromZero);
        }
        round_display(total)
    }

    // -- position aggregation ---------------------------------------------

    /// All positions sorted deterministically by symbol.
    pub fn sorted_positions(&self) -> Vec<&Position> {
        self.positions.values().collect()
    }

    /// Number of open positions.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    // -- PnL computation --------------------------------------------------

    /// Total unrealized PnL across every open position.
    ///
    /// Per spec §4.4.3:
    ///   LONG:  (mark_price − entry_price) × size
    ///   SHORT: (entry_price − mark_price) × size
    pub fn total_unrealized_pnl(&self) -> Decimal {
        let mut total = Decimal::ZERO;
        for position in self.positions.values() {
            total += compute_unrealized_pnl(position);
        }
        round_display(total)
    }

    /// Total realized PnL across every open position.
    ///
    /// This is the sum of `position.realized_pnl` for all tracked positions.
    pub fn total_realized_pnl(&self) -> Decimal {
        let mut total = Decimal::ZERO;
        for position in self.positions.values() {
            total += position.realized_pnl;
        }
        round_display(total)
    }

    // -- equity ------------------------------------------------------------

    /// Total equity per spec §4.9.1:
    ///
    /// ```text
    /// portfolio_value = Σ(balance[asset] × price[asset])
    ///                 + Σ(position[symbol].unrealized_pnl)
    /// ```
    pub fn total_equity(&self) -> Decimal {
        let balance_value = self.total_balance_value();
        let unrealized = self.total_unrealized_pnl();
        round_display(balance_value + unrealized)
    }

    // -- serialization bridge ----------------------------------------------

    /// Produce a lightweight summary for JSON transport.
    pub fn summary(&self) -> PortfolioSummary {
        PortfolioSummary {
            account_id: self.account_id,
            total_equity: self.total_equity(),
            total_balance_value: self.total_balance_value(),
            total_unrealized_pnl: self.total_unrealized_pnl(),
            total_realized_pnl: self.total_realized_pnl(),
            position_count: self.positions.len(),
            asset_count: self.balances.len(),
        }
    }

    /// Serialize the full portfolio to deterministic JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a portfolio from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Compute unrealized PnL for a single position (spec §4.4.3).
fn compute_unrealized_pnl(position: &Position) -> Decimal {
    let size = position.size.as_decimal();
    let entry = position.entry_price.as_decimal();
    let mark = position.mark_price.as_decimal();

    let pnl = match position.side {
        PositionSide::LONG => (mark - entry) * size,
        PositionSide::SHORT => (entry - mark) * size,
    };

    pnl.round_dp_with_strategy(INTERNAL_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a value to display precision using HALF_UP (spec §12.4.2).
fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DP, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
