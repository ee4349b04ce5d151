//! Concurrent record store
//!
//! Reference in-memory implementation of the transactional surface the
//! marketplace core needs: atomic conditional updates, the one-shot match
//! primitive, and bounded range scans for the sweep loops. Records are
//! never deleted; terminal states stay queryable for audit.

use dashmap::DashMap;
use tracing::debug;
use types::errors::{ConflictError, MarketError, RecordKind};
use types::ids::{EventId, ListingId, OfferId, TransactionId};
use types::listing::{Listing, ListingStatus};
use types::offer::{Offer, OfferStatus};
use types::transaction::{EscrowTransaction, TransactionStatus};

use crate::audit::TransitionLog;

/// Shared marketplace store
///
/// Lock discipline: whenever an operation touches more than one map, it
/// acquires them in declaration order (offers, listings, txn_by_offer,
/// txn_by_listing, transactions). `execute_match` is the only operation
/// holding two record guards at once.
#[derive(Debug, Default)]
pub struct MarketStore {
    offers: DashMap<OfferId, Offer>,
    listings: DashMap<ListingId, Listing>,

    // Unique 1:1 match indexes. Entries are only ever added, and only
    // while execute_match holds both record guards.
    txn_by_offer: DashMap<OfferId, TransactionId>,
    txn_by_listing: DashMap<ListingId, TransactionId>,

    transactions: DashMap<TransactionId, EscrowTransaction>,

    audit: TransitionLog,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition audit log, one record per status change
    pub fn audit(&self) -> &TransitionLog {
        &self.audit
    }

    // ── Inserts ─────────────────────────────────────────────────────

    pub fn insert_offer(&self, offer: Offer) {
        self.audit.record(
            RecordKind::Offer,
            offer.offer_id.to_string(),
            "NONE".to_string(),
            format!("{:?}", offer.status),
            offer.created_at,
        );
        self.offers.insert(offer.offer_id, offer);
    }

    pub fn insert_listing(&self, listing: Listing) {
        self.audit.record(
            RecordKind::Listing,
            listing.listing_id.to_string(),
            "NONE".to_string(),
            format!("{:?}", listing.status),
            listing.created_at,
        );
        self.listings.insert(listing.listing_id, listing);
    }

    // ── Snapshot reads ──────────────────────────────────────────────

    pub fn offer(&self, id: &OfferId) -> Result<Offer, MarketError> {
        self.offers
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| MarketError::not_found(RecordKind::Offer, id))
    }

    pub fn listing(&self, id: &ListingId) -> Result<Listing, MarketError> {
        self.listings
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| MarketError::not_found(RecordKind::Listing, id))
    }

    pub fn transaction(&self, id: &TransactionId) -> Result<EscrowTransaction, MarketError> {
        self.transactions
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| MarketError::not_found(RecordKind::Transaction, id))
    }

    /// Transaction bound to an offer, if one was ever created
    ///
    /// Offers carry no back-pointer; the unique index is the only link.
    pub fn transaction_for_offer(&self, id: &OfferId) -> Option<EscrowTransaction> {
        let txn_id = self.txn_by_offer.get(id).map(|t| *t)?;
        self.transactions.get(&txn_id).map(|t| t.clone())
    }

    /// Transaction bound to a listing, if one was ever created
    pub fn transaction_for_listing(&self, id: &ListingId) -> Option<EscrowTransaction> {
        let txn_id = self.txn_by_listing.get(id).map(|t| *t)?;
        self.transactions.get(&txn_id).map(|t| t.clone())
    }

    // ── Atomic updates ──────────────────────────────────────────────
    //
    // The closure works on a draft clone; the stored record only changes
    // if the closure succeeds, so a rejected update leaves no trace. The
    // record guard is held for the whole read-modify-write.

    pub fn update_offer<F>(&self, id: &OfferId, f: F) -> Result<Offer, MarketError>
    where
        F: FnOnce(&mut Offer) -> Result<(), MarketError>,
    {
        let mut entry = self
            .offers
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found(RecordKind::Offer, id))?;

        let mut draft = entry.clone();
        f(&mut draft)?;

        let from = entry.status;
        *entry = draft;
        if entry.status != from {
            self.audit.record(
                RecordKind::Offer,
                id.to_string(),
                format!("{:?}", from),
                format!("{:?}", entry.status),
                entry.updated_at,
            );
        }
        Ok(entry.clone())
    }

    pub fn update_listing<F>(&self, id: &ListingId, f: F) -> Result<Listing, MarketError>
    where
        F: FnOnce(&mut Listing) -> Result<(), MarketError>,
    {
        let mut entry = self
            .listings
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found(RecordKind::Listing, id))?;

        let mut draft = entry.clone();
        f(&mut draft)?;

        let from = entry.status;
        *entry = draft;
        if entry.status != from {
            self.audit.record(
                RecordKind::Listing,
                id.to_string(),
                format!("{:?}", from),
                format!("{:?}", entry.status),
                entry.updated_at,
            );
        }
        Ok(entry.clone())
    }

    pub fn update_transaction<F>(
        &self,
        id: &TransactionId,
        f: F,
    ) -> Result<EscrowTransaction, MarketError>
    where
        F: FnOnce(&mut EscrowTransaction) -> Result<(), MarketError>,
    {
        let mut entry = self
            .transactions
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found(RecordKind::Transaction, id))?;

        let mut draft = entry.clone();
        f(&mut draft)?;

        let from = entry.status;
        *entry = draft;
        if entry.status != from {
            self.audit.record(
                RecordKind::Transaction,
                id.to_string(),
                format!("{:?}", from),
                format!("{:?}", entry.status),
                entry.updated_at,
            );
        }
        Ok(entry.clone())
    }

    // ── Match primitive ─────────────────────────────────────────────

    /// Atomically bind an offer to a listing and create their transaction.
    ///
    /// Both records are locked (offer first, then listing), re-checked as
    /// ACTIVE, and validated by the caller's closure against current state.
    /// On success the offer becomes ACCEPTED, the listing RESERVED, and the
    /// built PENDING transaction is installed together with both unique
    /// index entries. A concurrent winner leaves losers with ConflictError;
    /// at most one transaction can ever exist per offer and per listing.
    pub fn execute_match<F>(
        &self,
        offer_id: &OfferId,
        listing_id: &ListingId,
        now: i64,
        build: F,
    ) -> Result<EscrowTransaction, MarketError>
    where
        F: FnOnce(&Offer, &Listing) -> Result<EscrowTransaction, MarketError>,
    {
        let mut offer = self
            .offers
            .get_mut(offer_id)
            .ok_or_else(|| MarketError::not_found(RecordKind::Offer, offer_id))?;
        let mut listing = self
            .listings
            .get_mut(listing_id)
            .ok_or_else(|| MarketError::not_found(RecordKind::Listing, listing_id))?;

        // Losers of a race observe the winner's transition here
        if offer.status != OfferStatus::ACTIVE {
            return Err(ConflictError::OfferUnavailable.into());
        }
        if listing.status != ListingStatus::ACTIVE {
            return Err(ConflictError::ListingUnavailable.into());
        }

        // The revival path reuses offers, so the index double-checks that
        // no transaction ever existed for either side
        if self.txn_by_offer.contains_key(offer_id) {
            return Err(ConflictError::DuplicateMatch {
                offer_id: offer_id.to_string(),
            }
            .into());
        }
        if self.txn_by_listing.contains_key(listing_id) {
            return Err(ConflictError::ListingUnavailable.into());
        }

        let txn = build(&offer, &listing)?;
        assert_eq!(txn.offer_id, *offer_id, "Built transaction must reference the locked offer");
        assert_eq!(txn.listing_id, *listing_id, "Built transaction must reference the locked listing");
        assert_eq!(txn.status, TransactionStatus::PENDING, "Matches start PENDING");

        offer.accept(now);
        listing.reserve(now);
        self.txn_by_offer.insert(*offer_id, txn.transaction_id);
        self.txn_by_listing.insert(*listing_id, txn.transaction_id);
        self.transactions.insert(txn.transaction_id, txn.clone());

        self.audit.record(
            RecordKind::Offer,
            offer_id.to_string(),
            "ACTIVE".to_string(),
            "ACCEPTED".to_string(),
            now,
        );
        self.audit.record(
            RecordKind::Listing,
            listing_id.to_string(),
            "ACTIVE".to_string(),
            "RESERVED".to_string(),
            now,
        );
        self.audit.record(
            RecordKind::Transaction,
            txn.transaction_id.to_string(),
            "NONE".to_string(),
            "PENDING".to_string(),
            now,
        );

        debug!(
            offer_id = %offer_id,
            listing_id = %listing_id,
            transaction_id = %txn.transaction_id,
            amount = %txn.amount,
            "match executed"
        );
        Ok(txn)
    }

    // ── Sweep scans ─────────────────────────────────────────────────
    //
    // Scans return ids, not records: the sweep re-reads current state
    // through the atomic primitives before acting, so a stale scan result
    // costs a no-op, never a wrong transition.

    /// ACTIVE offers whose deadline has passed
    pub fn offers_expiring(&self, now: i64, limit: usize) -> Vec<OfferId> {
        self.offers
            .iter()
            .filter(|r| r.status == OfferStatus::ACTIVE && r.is_expired(now))
            .take(limit)
            .map(|r| r.offer_id)
            .collect()
    }

    /// ACTIVE listings whose deadline has passed
    pub fn listings_expiring(&self, now: i64, limit: usize) -> Vec<ListingId> {
        self.listings
            .iter()
            .filter(|r| r.status == ListingStatus::ACTIVE && r.is_expired(now))
            .take(limit)
            .map(|r| r.listing_id)
            .collect()
    }

    /// PENDING transactions created at or before the deadline
    pub fn transactions_pending_before(&self, deadline: i64, limit: usize) -> Vec<TransactionId> {
        self.transactions
            .iter()
            .filter(|r| r.status == TransactionStatus::PENDING && r.created_at <= deadline)
            .take(limit)
            .map(|r| r.transaction_id)
            .collect()
    }

    /// Unconfirmed DELIVERED transactions delivered at or before the deadline
    pub fn transactions_delivered_before(&self, deadline: i64, limit: usize) -> Vec<TransactionId> {
        self.transactions
            .iter()
            .filter(|r| {
                r.status == TransactionStatus::DELIVERED
                    && !r.buyer_confirmed
                    && r.tickets_delivered_at.is_some_and(|t| t <= deadline)
            })
            .take(limit)
            .map(|r| r.transaction_id)
            .collect()
    }

    /// COMPLETED transactions still owing the seller payout
    pub fn transactions_awaiting_payout(&self, limit: usize) -> Vec<TransactionId> {
        self.transactions
            .iter()
            .filter(|r| {
                r.status == TransactionStatus::COMPLETED
                    && !r.seller_paid_out
                    && !r.payout_in_flight
            })
            .take(limit)
            .map(|r| r.transaction_id)
            .collect()
    }

    /// Unexpired ACTIVE offers for one event, for seller browsing
    pub fn open_offers_for_event(&self, event_id: &EventId, now: i64) -> Vec<Offer> {
        self.offers
            .iter()
            .filter(|r| {
                r.event_id == *event_id && r.status == OfferStatus::ACTIVE && !r.is_expired(now)
            })
            .map(|r| r.clone())
            .collect()
    }

    // ── Counts ──────────────────────────────────────────────────────

    pub fn offer_count(&self) -> usize {
        self.offers.len()
    }

    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}
