//! Exposure and position value calculations
//!
//! Deterministic computation of position value, equity,
//! unrealized PnL, and total exposure per specs §4.4.3 and §5.3.

use rust_decimal::Decimal;
use types::numeric::{Price, Quantity};
use types::position::{Position, PositionSide};

/// Calculate notional position value per spec §5.3.2
///
/// `position_value = size × mark_price`
pub fn position_value(size: Quantity, mark_price: Price) -> Decimal {
    size.as_decimal() * mark_price.as_decimal()
}

/// Calculate account equity per spec §5.3.3
///
/// `equity = total_balance + unrealized_pnl`
pub fn equity(total_balance: Decimal, unrealized_pnl: Decimal) -> Decimal {
    total_balance + unrealized_pnl
}

/// Calculate unrealized PnL per spec §4.4.3
///
/// LONG:  `(mark_price - entry_price) × size`
/// SHORT: `(entry_price - mark_price) × size`
pub fn unrealized_pnl(
    side: PositionSide,
    entry_price: Price,
    mark_price: Price,
    size: Quantity,
) -> Decimal {
    let size_d = size.as_decimal();
    match side {
        PositionSide::LONG => {
            (mark_price.as_decimal() - entry_price.as_decimal()) * size_d
        }
        PositionSide::SHORT => {
            (entry_price.as_decimal() - mark_price.as_decimal()) * size_d
        }
    }
}

/// Calculate total exposure across all positions.
///
/// `total_exposure = Σ (position.size × position.mark_price)`
pub fn total_exposure(positions: &[Position]) -> Decimal {
    positions.iter().fold(Decimal::ZERO, |acc, pos| {
        acc + position_value(pos.size, pos.mark_price)
    })
}

/// Calculate total unrealized PnL across all positions.
///
/// `total_upnl = Σ position.unrealized_pnl`
pub fn total_unrealized_pnl(positions: &[Position]) -> Decimal {
    positions.iter().fold(Decimal::ZERO, |acc, pos| {
        acc + pos.unrealized_pnl
    })
}

/// Calculate total maintenance margin across all positions.
///
/// `total_mm = Σ position.maintenance_margin`
pub fn total_maintenance_margin(positions: &[Position]) -> Decimal {
    positions.iter().fold(Decimal::ZERO, |acc, pos| {
        acc + pos.maintenance_margin
    })
}
