//! Seller listing lifecycle types

use crate::ids::{EventId, ListingId, SectionId, UserId};
use crate::money::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Listing status
///
/// RESERVED is the in-escrow hold: the listing is off the market while a
/// transaction on it is in flight, and comes back if that transaction dies
/// before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListingStatus {
    /// On the market
    ACTIVE,
    /// Held by an in-flight transaction
    RESERVED,
    /// Transaction completed or refunded after delivery (terminal)
    SOLD,
    /// Withdrawn by the seller or expired (terminal)
    CANCELLED,
}

impl ListingStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ListingStatus::SOLD | ListingStatus::CANCELLED)
    }
}

/// A seller's concrete tickets for sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: ListingId,
    pub seller_id: UserId,
    pub event_id: EventId,

    // What is being sold
    pub section_id: SectionId,
    pub row: Option<String>,
    pub seats: Vec<String>, // One label per ticket, seats.len() == quantity
    pub price: Price,       // Per ticket
    pub quantity: Quantity,

    pub status: ListingStatus,
    pub expires_at: Option<i64>, // Unix nanos; None = never goes stale

    // Timestamps
    pub created_at: i64,
    pub updated_at: i64,
    pub version: u64, // Optimistic locking
}

impl Listing {
    /// Create a new active listing
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seller_id: UserId,
        event_id: EventId,
        section_id: SectionId,
        row: Option<String>,
        seats: Vec<String>,
        price: Price,
        quantity: Quantity,
        expires_at: Option<i64>,
        timestamp: i64,
    ) -> Self {
        let listing = Self {
            listing_id: ListingId::new(),
            seller_id,
            event_id,
            section_id,
            row,
            seats,
            price,
            quantity,
            status: ListingStatus::ACTIVE,
            expires_at,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        };
        assert!(listing.check_invariant(), "Seat list must match quantity");
        listing
    }

    /// Check the seat-count invariant: one seat label per ticket
    pub fn check_invariant(&self) -> bool {
        self.seats.len() == self.quantity.get() as usize
    }

    /// Check if the expiry deadline has passed
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Hold the listing for an in-flight transaction
    ///
    /// # Panics
    /// Panics unless the listing is ACTIVE
    pub fn reserve(&mut self, timestamp: i64) {
        assert_eq!(self.status, ListingStatus::ACTIVE, "Can only reserve an active listing");
        self.status = ListingStatus::RESERVED;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Put a reserved listing back on the market
    ///
    /// Used when the holding transaction is cancelled or its payment fails.
    ///
    /// # Panics
    /// Panics unless the listing is RESERVED
    pub fn release(&mut self, timestamp: i64) {
        assert_eq!(self.status, ListingStatus::RESERVED, "Can only release a reserved listing");
        self.status = ListingStatus::ACTIVE;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Close out a reserved listing whose tickets changed hands
    ///
    /// # Panics
    /// Panics unless the listing is RESERVED
    pub fn mark_sold(&mut self, timestamp: i64) {
        assert_eq!(self.status, ListingStatus::RESERVED, "Can only sell a reserved listing");
        self.status = ListingStatus::SOLD;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Withdraw the listing from the market
    ///
    /// # Panics
    /// Panics unless the listing is ACTIVE
    pub fn cancel(&mut self, timestamp: i64) {
        assert_eq!(self.status, ListingStatus::ACTIVE, "Can only cancel an active listing");
        self.status = ListingStatus::CANCELLED;
        self.updated_at = timestamp;
        self.version += 1;
    }
}
