//! Buyer offer lifecycle types

use crate::ids::{EventId, OfferId, SectionId, UserId};
use crate::money::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Offer status
///
/// An offer leaves ACTIVE exactly once, except for the single payment-failure
/// path that puts an ACCEPTED offer back on the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OfferStatus {
    /// Open to sellers
    ACTIVE,
    /// Matched to a listing; a transaction references this offer
    ACCEPTED,
    /// Expiry deadline passed before any match (terminal)
    EXPIRED,
    /// Withdrawn by the buyer or closed by the system (terminal)
    CANCELLED,
}

impl OfferStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::EXPIRED | OfferStatus::CANCELLED)
    }
}

/// A buyer's standing request for tickets
///
/// Describes what the buyer wants and the most they will pay. Sellers browse
/// open offers and accept one against a concrete listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: OfferId,
    pub buyer_id: UserId,
    pub event_id: EventId,

    // What the buyer wants
    pub max_price: Price,
    pub quantity: Quantity,
    pub section_ids: BTreeSet<SectionId>, // Empty set = any section
    pub message: Option<String>,

    pub status: OfferStatus,
    pub expires_at: i64, // Unix nanos

    // Timestamps
    pub created_at: i64,
    pub updated_at: i64,
    pub version: u64, // Optimistic locking
}

impl Offer {
    /// Create a new active offer
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buyer_id: UserId,
        event_id: EventId,
        max_price: Price,
        quantity: Quantity,
        section_ids: BTreeSet<SectionId>,
        message: Option<String>,
        expires_at: i64,
        timestamp: i64,
    ) -> Self {
        Self {
            offer_id: OfferId::new(),
            buyer_id,
            event_id,
            max_price,
            quantity,
            section_ids,
            message,
            status: OfferStatus::ACTIVE,
            expires_at,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        }
    }

    /// Check if the expiry deadline has passed
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Check if a section satisfies the buyer's constraint
    pub fn accepts_section(&self, section: &SectionId) -> bool {
        self.section_ids.is_empty() || self.section_ids.contains(section)
    }

    /// Mark the offer matched
    ///
    /// # Panics
    /// Panics unless the offer is ACTIVE
    pub fn accept(&mut self, timestamp: i64) {
        assert_eq!(self.status, OfferStatus::ACTIVE, "Can only accept an active offer");
        self.status = OfferStatus::ACCEPTED;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Expire the offer
    ///
    /// # Panics
    /// Panics unless the offer is ACTIVE
    pub fn expire(&mut self, timestamp: i64) {
        assert_eq!(self.status, OfferStatus::ACTIVE, "Can only expire an active offer");
        self.status = OfferStatus::EXPIRED;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Cancel the offer
    ///
    /// ACCEPTED offers are cancelled when their transaction dies; the buyer
    /// must post a fresh offer afterwards.
    ///
    /// # Panics
    /// Panics if the offer is already terminal
    pub fn cancel(&mut self, timestamp: i64) {
        assert!(!self.status.is_terminal(), "Cannot cancel terminal offer");
        self.status = OfferStatus::CANCELLED;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Put an accepted offer back on the market after a failed payment
    ///
    /// The only path out of ACCEPTED that is not terminal. A fresh expiry is
    /// mandatory since the original deadline may have passed while matched.
    ///
    /// # Panics
    /// Panics unless the offer is ACCEPTED
    pub fn revive(&mut self, new_expires_at: i64, timestamp: i64) {
        assert_eq!(self.status, OfferStatus::ACCEPTED, "Can only revive an accepted offer");
        self.status = OfferStatus::ACTIVE;
        self.expires_at = new_expires_at;
        self.updated_at = timestamp;
        self.version += 1;
    }
}
