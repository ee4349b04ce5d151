//! Monetary and quantity value types
//!
//! All money is decimal with at most two fractional digits. Floating point
//! never touches a price; `rust_decimal` arithmetic is exact.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive monetary amount with at most two decimal places
///
/// Used for listing prices, offer caps, and escrow amounts. Construction
/// validates positivity and scale; once built a Price is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Try to create a Price, returning None if non-positive or finer
    /// than two decimal places
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO && value.normalize().scale() <= 2 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create from whole currency units
    ///
    /// # Panics
    /// Panics if `units` is zero
    pub fn from_units(units: u64) -> Self {
        assert!(units > 0, "Price must be positive");
        Self(Decimal::from(units))
    }

    /// Parse from a decimal string, returning None if invalid
    pub fn parse(s: &str) -> Option<Self> {
        Decimal::from_str_exact(s).ok().and_then(Self::try_new)
    }

    /// Get the inner decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A positive ticket count
///
/// Offers and listings always cover at least one ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Try to create a Quantity, returning None if zero
    pub fn try_new(count: u32) -> Option<Self> {
        if count > 0 {
            Some(Self(count))
        } else {
            None
        }
    }

    /// Create a Quantity
    ///
    /// # Panics
    /// Panics if `count` is zero
    pub fn new(count: u32) -> Self {
        assert!(count > 0, "Quantity must be positive");
        Self(count)
    }

    /// Get the ticket count
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Ticket count as a decimal, for price arithmetic
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
