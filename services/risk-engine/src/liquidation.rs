//! Liquidation calculations
//!
//! Deterministic liquidation threshold, bankruptcy price, and fee
//! calculations per spec §6 (Liquidation Process).

use rust_decimal::Decimal;
use types::numeric::Price;
use types::position::PositionSide;

// ── Health levels per spec §5.3.3 ────────────────────────────────────────

/// Account health classification per spec §5.3.3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthLevel {
    /// margin_ratio >= 2.0 — no action needed
    Healthy,
    /// 1.5 <= margin_ratio < 2.0 — emit warning
    Warning,
    /// 1.1 <= margin_ratio < 1.5 — danger, reduce recommended
    Danger,
    /// margin_ratio < 1.1 — liquidation triggered
    Liquidation,
}

/// Classify health level from margin ratio per spec §5.3.3
pub fn health_status(margin_ratio: Decimal) -> HealthLevel {
    let threshold_liquidation = Decimal::from_str_exact("1.1").unwrap();
    let threshold_danger = Decimal::from_str_exact("1.5").unwrap();
    let threshold_warning = Decimal::from_str_exact("2.0").unwrap();

    if margin_ratio < threshold_liquidation {
        HealthLevel::Liquidation
    } else if margin_ratio < threshold_danger {
        HealthLevel::Danger
    } else if margin_ratio < threshold_warning {
        HealthLevel::Warning
    } else {
        HealthLevel::Healthy
    }
}

/// Check if liquidation should trigger per spec §6.2.1
///
/// `margin_ratio < 1.1` → true
pub fn should_liquidate(margin_ratio: Decimal) -> bool {
    margin_ratio < Decimal::from_str_exact("1.1").unwrap()
}

// ── Bankruptcy price per spec §6.4.3 ─────────────────────────────────────

/// Calculate bankruptcy price per spec §6.4.3
///
/// LONG:  `bankruptcy_price = entry_price - (initial_margin / size)`
/// SHORT: `bankruptcy_price = entry_price + (initial_margin / size)`
///
/// Returns None if the result would be non-positive (for LONG positions
/// with very high leverage).
pub fn bankruptcy_price(
    side: PositionSide,
    entry_price: Price,
    initial_margin: Decimal,
    size: Decimal,
) -> Option<Price> {
    assert!(size > Decimal::ZERO, "Position size must be positive");
    let margin_per_unit = initial_margin / size;

    match side {
        PositionSide::LONG => {
            let bp = entry_price.as_decimal() - margin_per_unit;
            Price::try_new(bp)
        }
        PositionSide::SHORT => {
            let bp = entry_price.as_decimal() + margin_per_unit;
            Price::try_new(bp)
        }
    }
}

/// Calculate liquidation price (slightly inside bankruptcy price).
///
/// LONG:  `liq_price = entry_price - ((initial_margin - maintenance_margin) / size)`
/// SHORT: `liq_price = entry_price + ((initial_margin - maintenance_margin) / size)`
///
/// Liquidation triggers before bankruptcy to protect insurance fund.
pub fn liquidation_price(
    side: PositionSide,
    entry_price: Price,
    initial_margin: Decimal,
    maintenance_margin: Decimal,
    size: Decimal,
) -> Option<Price> {
    assert!(size > Decimal::ZERO, "Position size must be positive");
    let margin_diff = initial_margin - maintenance_margin;
    let offset = margin_diff / size;

    match side {
        PositionSide::LONG => {
            let lp = entry_price.as_decimal() - offset;
            Price::try_new(lp)
        }
        PositionSide::SHORT => {
            let lp = entry_price.as_decimal() + offset;
            Price::try_new(lp)
        }
    }
}

// ── Liquidation fee per spec §6.7.1 ──────────────────────────────────────

/// Calculate liquidation fee per spec §6.7.1
///
/// | Margin ratio at liquidation | Fee rate |
/// |-----------------------------|----------|
/// | 1.05 – 1.10                | 0.50%    |
/// | 0.50 – 1.05                | 1.00%    |
/// | < 0.50                     | 2.00%    |
///
/// Fee is capped at 5% of position value (§6.7.3).
pub fn liquidation_fee(position_value: Decimal, margin_ratio: Decimal) -> Decimal {
    let rate = if margin_ratio >= Decimal::from_str_exact("1.05").unwrap() {
        Decimal::from_str_exact("0.005").unwrap()
    } else if margin_ratio >= Decimal::from_str_exact("0.5").unwrap() {
        Decimal::from_str_exact("0.01").unwrap()
    } else {
        Decimal::from_str_exact("0.02").unwrap()
    };

    let fee = position_value * rate;
    let cap = position_value * Decimal::from_str_exact("0.05").unwrap();

    if fee > cap { cap } else { fee }
}

// ── Tests ────────────────────────────────────────────────────────────────
