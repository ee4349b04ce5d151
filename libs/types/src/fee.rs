//! Platform fee policy
//!
//! The platform keeps a percentage of every captured amount, subject to a
//! minimum. All fee math is exact decimal, rounded half-up to whole cents.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Fee split for one escrow amount
///
/// `platform_fee + seller_amount == amount` always holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub amount: Decimal,
    pub platform_fee: Decimal,
    pub seller_amount: Decimal,
}

/// Platform fee schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub rate: Decimal,        // Fraction of the amount (0.10 = 10%)
    pub minimum_fee: Decimal, // Floor in currency units
}

impl FeeSchedule {
    /// Fee for a captured amount
    ///
    /// `rate x amount`, rounded half-up to cents, floored at `minimum_fee`,
    /// capped at the amount itself so the seller share never goes negative.
    pub fn platform_fee(&self, amount: Decimal) -> Decimal {
        let raw = (amount * self.rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        raw.max(self.minimum_fee).min(amount)
    }

    /// Split an amount into platform fee and seller proceeds
    pub fn split(&self, amount: Decimal) -> FeeBreakdown {
        let platform_fee = self.platform_fee(amount);
        FeeBreakdown {
            amount,
            platform_fee,
            seller_amount: amount - platform_fee,
        }
    }

    /// Amount returned to the buyer when a captured transaction is refunded
    ///
    /// Payouts release only after completion and refunds happen only before
    /// it, so the full captured amount goes back.
    pub fn refund_amount(&self, captured: Decimal) -> Decimal {
        captured
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            rate: Decimal::from_str_exact("0.10").unwrap(), // 10%
            minimum_fee: Decimal::from_str_exact("0.50").unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_platform_fee_percentage() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.platform_fee(dec("200.00")), dec("20.00"));
    }

    #[test]
    fn test_platform_fee_minimum_applies() {
        let fees = FeeSchedule::default();
        // 10% of 3.00 is 0.30, below the 0.50 floor
        assert_eq!(fees.platform_fee(dec("3.00")), dec("0.50"));
    }

    #[test]
    fn test_platform_fee_capped_at_amount() {
        let fees = FeeSchedule::default();
        // Floor exceeds the whole amount; seller gets nothing but never owes
        let breakdown = fees.split(dec("0.40"));
        assert_eq!(breakdown.platform_fee, dec("0.40"));
        assert_eq!(breakdown.seller_amount, Decimal::ZERO);
    }

    #[test]
    fn test_platform_fee_rounds_half_up() {
        let fees = FeeSchedule::default();
        // 10% of 90.25 is 9.025, which rounds up to 9.03
        assert_eq!(fees.platform_fee(dec("90.25")), dec("9.03"));
    }

    #[test]
    fn test_split_preserves_amount() {
        let fees = FeeSchedule::default();
        let breakdown = fees.split(dec("151.99"));
        assert_eq!(
            breakdown.platform_fee + breakdown.seller_amount,
            breakdown.amount
        );
    }

    #[test]
    fn test_refund_amount_is_full_capture() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.refund_amount(dec("120.00")), dec("120.00"));
    }
}
