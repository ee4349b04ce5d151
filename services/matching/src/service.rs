//! Offer acceptance and marketplace intake
//!
//! The service owns no state of its own; every mutation goes through the
//! store's atomic primitives, so handles can be cloned freely across
//! request handlers and background workers.

use std::sync::Arc;

use store::MarketStore;
use tracing::{debug, info};
use types::clock::Clock;
use types::errors::{AuthorizationError, ConflictError, MarketError, PreconditionError};
use types::fee::FeeSchedule;
use types::ids::{EventId, ListingId, OfferId, UserId};
use types::listing::{Listing, ListingStatus};
use types::notify::{Notice, NoticeKind, NotificationSink};
use types::offer::{Offer, OfferStatus};
use types::transaction::EscrowTransaction;

use crate::rules::{self, ListingDraft, OfferDraft};

#[derive(Clone)]
pub struct MatchingService {
    store: Arc<MarketStore>,
    clock: Arc<dyn Clock>,
    fees: FeeSchedule,
    sink: Arc<dyn NotificationSink>,
}

impl MatchingService {
    pub fn new(
        store: Arc<MarketStore>,
        clock: Arc<dyn Clock>,
        fees: FeeSchedule,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            clock,
            fees,
            sink,
        }
    }

    /// Validate and store a new buyer offer
    pub fn post_offer(&self, draft: OfferDraft) -> Result<Offer, MarketError> {
        let now = self.clock.now();
        let terms = rules::validate_new_offer(&draft, now)?;
        let offer = Offer::new(
            draft.buyer_id,
            draft.event_id,
            terms.max_price,
            terms.quantity,
            terms.sections,
            draft.message,
            draft.expires_at,
            now,
        );
        self.store.insert_offer(offer.clone());
        debug!(offer_id = %offer.offer_id, event_id = %offer.event_id, "offer posted");
        Ok(offer)
    }

    /// Validate and store a new seller listing
    pub fn post_listing(&self, draft: ListingDraft) -> Result<Listing, MarketError> {
        let now = self.clock.now();
        let terms = rules::validate_new_listing(&draft, now)?;
        let listing = Listing::new(
            draft.seller_id,
            draft.event_id,
            terms.section,
            draft.row,
            draft.seats,
            terms.price,
            terms.quantity,
            draft.expires_at,
            now,
        );
        self.store.insert_listing(listing.clone());
        debug!(listing_id = %listing.listing_id, event_id = %listing.event_id, "listing posted");
        Ok(listing)
    }

    /// A seller accepts a buyer's offer with one of their listings.
    ///
    /// The rule set runs inside the store's match primitive, under both
    /// record locks, so concurrent acceptances of one offer resolve to
    /// exactly one PENDING transaction. Payment capture is a separate
    /// engine step; the buyer is notified that escrow is open.
    pub fn accept_offer(
        &self,
        offer_id: &OfferId,
        listing_id: &ListingId,
        acting_seller: &UserId,
    ) -> Result<EscrowTransaction, MarketError> {
        let now = self.clock.now();
        let txn = self
            .store
            .execute_match(offer_id, listing_id, now, |offer, listing| {
                rules::validate_match(offer, listing, acting_seller, now)?;
                let amount = listing.price.as_decimal() * offer.quantity.as_decimal();
                Ok(EscrowTransaction::new(
                    offer.offer_id,
                    listing.listing_id,
                    offer.buyer_id,
                    listing.seller_id,
                    self.fees.split(amount),
                    now,
                ))
            })?;

        info!(
            transaction_id = %txn.transaction_id,
            offer_id = %offer_id,
            listing_id = %listing_id,
            amount = %txn.amount,
            "offer accepted"
        );
        self.sink.notify(
            txn.buyer_id,
            Notice::new(
                NoticeKind::OfferAccepted,
                serde_json::json!({
                    "transaction_id": txn.transaction_id,
                    "listing_id": txn.listing_id,
                    "amount": txn.amount,
                }),
            ),
        );
        Ok(txn)
    }

    /// Withdraw an unmatched offer
    pub fn cancel_offer(&self, offer_id: &OfferId, buyer: &UserId) -> Result<Offer, MarketError> {
        let now = self.clock.now();
        let offer = self.store.update_offer(offer_id, |offer| {
            if offer.buyer_id != *buyer {
                return Err(AuthorizationError::NotOfferOwner.into());
            }
            match offer.status {
                OfferStatus::ACTIVE => {
                    offer.cancel(now);
                    Ok(())
                }
                // A match is in flight; only the transaction path may undo it
                OfferStatus::ACCEPTED => Err(ConflictError::OfferUnavailable.into()),
                status => Err(PreconditionError::OfferNotActive {
                    status: format!("{:?}", status),
                }
                .into()),
            }
        })?;
        debug!(offer_id = %offer_id, "offer withdrawn");
        Ok(offer)
    }

    /// Withdraw an unreserved listing
    pub fn cancel_listing(
        &self,
        listing_id: &ListingId,
        seller: &UserId,
    ) -> Result<Listing, MarketError> {
        let now = self.clock.now();
        let listing = self.store.update_listing(listing_id, |listing| {
            if listing.seller_id != *seller {
                return Err(AuthorizationError::NotListingOwner.into());
            }
            match listing.status {
                ListingStatus::ACTIVE => {
                    listing.cancel(now);
                    Ok(())
                }
                ListingStatus::RESERVED => Err(ConflictError::ListingUnavailable.into()),
                status => Err(PreconditionError::ListingNotActive {
                    status: format!("{:?}", status),
                }
                .into()),
            }
        })?;
        debug!(listing_id = %listing_id, "listing withdrawn");
        Ok(listing)
    }

    /// Open offers a seller can browse for an event. Best price first,
    /// oldest first on ties.
    pub fn open_offers(&self, event_id: &EventId) -> Vec<Offer> {
        let mut offers = self.store.open_offers_for_event(event_id, self.clock.now());
        offers.sort_by(|a, b| {
            b.max_price
                .cmp(&a.max_price)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        offers
    }
}
