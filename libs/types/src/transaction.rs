//! Escrow transaction lifecycle types
//!
//! One transaction binds one offer to one listing and walks the escrow
//! states: PENDING -> PAID -> DELIVERED -> COMPLETED, with CANCELLED and
//! REFUNDED branches. Terminal records are kept forever for audit.

use crate::fee::FeeBreakdown;
use crate::ids::{ListingId, OfferId, TransactionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Escrow transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// Match made, payment not yet captured
    PENDING,
    /// Buyer's money captured into escrow
    PAID,
    /// Seller handed the tickets over
    DELIVERED,
    /// Receipt confirmed, seller payout owed or done (terminal)
    COMPLETED,
    /// Died before delivery (terminal)
    CANCELLED,
    /// Money returned to the buyer after delivery (terminal)
    REFUNDED,
}

impl TransactionStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::COMPLETED
                | TransactionStatus::CANCELLED
                | TransactionStatus::REFUNDED
        )
    }
}

/// Who confirmed receipt on the DELIVERED -> COMPLETED edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmSource {
    Buyer,
    System,
}

/// Who cancelled the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelSource {
    Buyer,
    Seller,
    Admin,
    System,
}

/// Complete escrow transaction record
///
/// Amounts are fixed at creation from the listing price and fee policy;
/// the lifecycle only ever moves money, never reprices it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub transaction_id: TransactionId,
    pub offer_id: OfferId,
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,

    // Money, fixed at match time
    pub amount: Decimal,        // listing price x quantity
    pub platform_fee: Decimal,  // fee policy cut
    pub seller_amount: Decimal, // amount - platform_fee

    pub status: TransactionStatus,

    // Payment capture
    pub paid_at: Option<i64>,        // Unix nanos
    pub gateway_ref: Option<String>, // Capture reference, needed for refunds

    // Delivery
    pub tickets_delivered: bool,
    pub tickets_delivered_at: Option<i64>,

    // Confirmation
    pub buyer_confirmed: bool,
    pub confirmed_by: Option<ConfirmSource>,

    // Payout
    pub seller_paid_out: bool,
    pub seller_paid_out_at: Option<i64>,
    pub payout_in_flight: bool, // Claim bit, at most one live transfer call

    // Teardown
    pub canceled_by: Option<CancelSource>,
    pub cancel_reason: Option<String>,
    pub refund_reason: Option<String>,

    // Timestamps
    pub created_at: i64,
    pub updated_at: i64,
    pub version: u64, // Optimistic locking
}

impl EscrowTransaction {
    /// Create a new pending transaction from a successful match
    pub fn new(
        offer_id: OfferId,
        listing_id: ListingId,
        buyer_id: UserId,
        seller_id: UserId,
        money: FeeBreakdown,
        timestamp: i64,
    ) -> Self {
        let txn = Self {
            transaction_id: TransactionId::new(),
            offer_id,
            listing_id,
            buyer_id,
            seller_id,
            amount: money.amount,
            platform_fee: money.platform_fee,
            seller_amount: money.seller_amount,
            status: TransactionStatus::PENDING,
            paid_at: None,
            gateway_ref: None,
            tickets_delivered: false,
            tickets_delivered_at: None,
            buyer_confirmed: false,
            confirmed_by: None,
            seller_paid_out: false,
            seller_paid_out_at: None,
            payout_in_flight: false,
            canceled_by: None,
            cancel_reason: None,
            refund_reason: None,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        };
        assert!(txn.check_invariant(), "Fee split must sum to amount");
        txn
    }

    /// Check the monetary invariant: the split always sums exactly
    pub fn check_invariant(&self) -> bool {
        self.seller_amount + self.platform_fee == self.amount
            && self.amount > Decimal::ZERO
            && self.platform_fee >= Decimal::ZERO
            && self.seller_amount >= Decimal::ZERO
    }

    // Gateway idempotency keys derive from the transaction id, so every
    // retry of the same step presents the same key.

    pub fn capture_key(&self) -> String {
        format!("capture-{}", self.transaction_id)
    }

    pub fn payout_key(&self) -> String {
        format!("payout-{}", self.transaction_id)
    }

    pub fn refund_key(&self) -> String {
        format!("refund-{}", self.transaction_id)
    }

    /// Check if the payment window has lapsed without a capture
    pub fn payment_overdue(&self, window: i64, now: i64) -> bool {
        self.status == TransactionStatus::PENDING && now - self.created_at >= window
    }

    /// Check if the buyer's confirmation window has lapsed
    pub fn confirmation_overdue(&self, window: i64, now: i64) -> bool {
        self.status == TransactionStatus::DELIVERED
            && !self.buyer_confirmed
            && match self.tickets_delivered_at {
                Some(delivered_at) => now - delivered_at >= window,
                None => false,
            }
    }

    /// Check if a refund request is still within the dispute window
    pub fn within_dispute_window(&self, window: i64, now: i64) -> bool {
        match self.tickets_delivered_at {
            Some(delivered_at) => now - delivered_at < window,
            None => false,
        }
    }

    /// Record a successful payment capture
    ///
    /// # Panics
    /// Panics unless the transaction is PENDING
    pub fn mark_paid(&mut self, gateway_ref: String, timestamp: i64) {
        assert_eq!(self.status, TransactionStatus::PENDING, "Capture requires PENDING");
        self.status = TransactionStatus::PAID;
        self.paid_at = Some(timestamp);
        self.gateway_ref = Some(gateway_ref);
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Record ticket handover
    ///
    /// # Panics
    /// Panics unless the transaction is PAID
    pub fn mark_delivered(&mut self, timestamp: i64) {
        assert_eq!(self.status, TransactionStatus::PAID, "Delivery requires PAID");
        self.status = TransactionStatus::DELIVERED;
        self.tickets_delivered = true;
        self.tickets_delivered_at = Some(timestamp);
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Confirm receipt and close the escrow
    ///
    /// `buyer_confirmed` only becomes true when the buyer themself confirmed;
    /// a system release after the window records SYSTEM attribution instead.
    ///
    /// # Panics
    /// Panics unless the transaction is DELIVERED
    pub fn complete(&mut self, source: ConfirmSource, timestamp: i64) {
        assert_eq!(self.status, TransactionStatus::DELIVERED, "Completion requires DELIVERED");
        self.status = TransactionStatus::COMPLETED;
        self.confirmed_by = Some(source);
        self.buyer_confirmed = source == ConfirmSource::Buyer;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Claim the right to run the payout transfer
    ///
    /// Returns true for exactly one caller between payout attempts; everyone
    /// else sees false and must not call the gateway.
    pub fn claim_payout(&mut self, timestamp: i64) -> bool {
        if self.status != TransactionStatus::COMPLETED
            || self.seller_paid_out
            || self.payout_in_flight
        {
            return false;
        }
        self.payout_in_flight = true;
        self.updated_at = timestamp;
        self.version += 1;
        true
    }

    /// Release a payout claim after a failed transfer so a retry can reclaim
    ///
    /// # Panics
    /// Panics if no claim is held
    pub fn clear_payout_claim(&mut self, timestamp: i64) {
        assert!(self.payout_in_flight, "No payout claim to clear");
        self.payout_in_flight = false;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Record a successful seller payout
    ///
    /// # Panics
    /// Panics unless COMPLETED with an outstanding claim
    pub fn record_payout(&mut self, timestamp: i64) {
        assert_eq!(self.status, TransactionStatus::COMPLETED, "Payout requires COMPLETED");
        assert!(self.payout_in_flight, "Payout must be claimed first");
        assert!(!self.seller_paid_out, "Seller already paid out");
        self.seller_paid_out = true;
        self.seller_paid_out_at = Some(timestamp);
        self.payout_in_flight = false;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Cancel before delivery
    ///
    /// # Panics
    /// Panics unless the transaction is PENDING or PAID
    pub fn cancel(&mut self, by: CancelSource, reason: Option<String>, timestamp: i64) {
        assert!(
            matches!(self.status, TransactionStatus::PENDING | TransactionStatus::PAID),
            "Cancel requires PENDING or PAID"
        );
        self.status = TransactionStatus::CANCELLED;
        self.canceled_by = Some(by);
        self.cancel_reason = reason;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Refund after delivery
    ///
    /// # Panics
    /// Panics unless the transaction is DELIVERED
    pub fn refund(&mut self, reason: Option<String>, timestamp: i64) {
        assert_eq!(self.status, TransactionStatus::DELIVERED, "Refund requires DELIVERED");
        self.status = TransactionStatus::REFUNDED;
        self.refund_reason = reason;
        self.updated_at = timestamp;
        self.version += 1;
    }
}
