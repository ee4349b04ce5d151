//! Risk Engine — orchestrator
//!
//! Ties together margin, exposure, liquidation, validation,
//! and event emission per specs §5, §6, §9.3.6.

use rust_decimal::Decimal;
use types::account::Account;
use types::ids::AccountId;
use types::order::Order;
use types::position::Position;
use types::risk::RiskCheckResult;

use crate::events::{self, RiskEvent};
use crate::exposure;
use crate::liquidation;
use crate::margin;
use crate::validator;

/// Risk engine configuration
#[derive(Debug, Clone)]
pub struct RiskEngineConfig {
    /// Default leverage for futures accounts
    pub default_futures_leverage: u8,
    /// Margin ratio threshold for warning events
    pub warning_threshold: Decimal,
    /// Margin ratio threshold for margin call events
    pub margin_call_threshold: Decimal,
    /// Margin ratio threshold for liquidation
    pub liquidation_threshold: Decimal,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            default_futures_leverage: 10,
            warning_threshold: Decimal::from_str_exact("2.0").unwrap(),
            margin_call_threshold: Decimal::from_str_exact("1.2").unwrap(),
            liquidation_threshold: Decimal::from_str_exact("1.1").unwrap(),
        }
    }
}

/// Risk engine service
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: RiskEngineConfig,
}

impl RiskEngine {
    /// Create a new risk engine with default configuration
    pub fn new() -> Self {
        Self {
            config: RiskEngineConfig::default(),
        }
    }

    /// Create a new risk engine with custom configuration
    pub fn with_config(config: RiskEngineConfig) -> Self {
        Self { config }
    }

    /// Pre-trade risk check per spec §9.3.6
    ///
    /// Validates an incoming order and returns Pass or rejection reason.
    /// If rejected, also returns a RiskCheckFailed event.
    pub fn check_pre_trade(
        &self,
        account: &Account,
        order: &Order,
        positions: &[Position],
        timestamp: i64,
    ) -> (RiskCheckResult, Vec<RiskEvent>) {
        let result = validator::validate_order(account, order, positions);

        let mut risk_events = Vec::new();
        if result != RiskCheckResult::Pass {
            risk_events.push(events::risk_check_failed_event(
                account.account_id,
                format!("{:?}", result),
                timestamp,
            ));
        }

        (result, risk_events)
    }

    /// Evaluate account health and generate risk events.
    ///
    /// Called periodically or on mark price updates per spec §6.2.2.
    pub fn evaluate_account(
        &self,
        account: &Account,
        positions: &[Position],
        timestamp: i64,
    ) -> Vec<RiskEvent> {
        if positions.is_empty() {
            return Vec::new();
        }

        let total_balance: Decimal = account
            .balances
            .values()
            .map(|b| b.total)
            .sum();

        let total_upnl = exposure::total_unrealized_pnl(positions);
        let eq = exposure::equity(total_balance, total_upnl);
        let total_mm = exposure::total_maintenance_margin(positions);
        let ratio = margin::margin_ratio(eq, total_mm);
        let health = liquidation::health_status(ratio);

        events::events_for_health(
            account.account_id,
            health,
            ratio,
            eq,
            total_mm,
            timestamp,
        )
    }

    /// Post-trade update: re-evaluate account after a trade executes.
    ///
    /// Returns any risk events triggered by the new position state.
    pub fn post_trade_update(
        &self,
        account: &Account,
        positions: &[Position],
        timestamp: i64,
    ) -> Vec<RiskEvent> {
        self.evaluate_account(account, positions, timestamp)
    }

    /// Calculate margin requirement for an order.
    pub fn compute_order_margin(
        &self,
        quantity: Decimal,
        price: Decimal,
        leverage: u8,
    ) -> Decimal {
        margin::order_margin(quantity, price, leverage)
    }

    /// Get current margin ratio for an account.
    pub fn get_margin_ratio(
        &self,
        account: &Account,
        positions: &[Position],
    ) -> Decimal {
        let total_balance: Decimal = account
            .balances
            .values()
            .map(|b| b.total)
            .sum();

        let total_upnl = exposure::total_unrealized_pnl(positions);
        let eq = exposure::equity(total_balance, total_upnl);
        let total_mm = exposure::total_maintenance_margin(positions);

        margin::margin_ratio(eq, total_mm)
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}
