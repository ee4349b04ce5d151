//! Match and intake validation rules
//!
//! Pure functions over record snapshots, so every rule is testable without
//! a store. The store re-runs match validation under its record locks;
//! these functions must stay side-effect free.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use types::errors::{AuthorizationError, MarketError, PreconditionError};
use types::ids::{EventId, SectionId, UserId};
use types::listing::{Listing, ListingStatus};
use types::money::{Price, Quantity};
use types::offer::{Offer, OfferStatus};

/// Unvalidated offer intake payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferDraft {
    pub buyer_id: UserId,
    pub event_id: EventId,
    pub max_price: Decimal,
    pub quantity: u32,
    pub sections: BTreeSet<String>, // Empty = any section
    pub message: Option<String>,
    pub expires_at: i64,
}

/// Unvalidated listing intake payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDraft {
    pub seller_id: UserId,
    pub event_id: EventId,
    pub section: String,
    pub row: Option<String>,
    pub seats: Vec<String>,
    pub price: Decimal,
    pub quantity: u32,
    pub expires_at: Option<i64>,
}

/// Validated monetary fields of an offer draft
pub struct OfferTerms {
    pub max_price: Price,
    pub quantity: Quantity,
    pub sections: BTreeSet<SectionId>,
}

/// Validated monetary fields of a listing draft
pub struct ListingTerms {
    pub price: Price,
    pub quantity: Quantity,
    pub section: SectionId,
}

/// Validate a seller accepting an offer against a concrete listing
///
/// Check order mirrors the failure taxonomy: availability and ownership
/// first, then compatibility, then price.
pub fn validate_match(
    offer: &Offer,
    listing: &Listing,
    acting_seller: &UserId,
    now: i64,
) -> Result<(), MarketError> {
    if offer.status != OfferStatus::ACTIVE {
        return Err(PreconditionError::OfferNotActive {
            status: format!("{:?}", offer.status),
        }
        .into());
    }
    if offer.is_expired(now) {
        return Err(PreconditionError::OfferExpired.into());
    }
    if listing.status != ListingStatus::ACTIVE {
        return Err(PreconditionError::ListingNotActive {
            status: format!("{:?}", listing.status),
        }
        .into());
    }
    if listing.is_expired(now) {
        return Err(PreconditionError::ListingExpired.into());
    }
    if listing.seller_id != *acting_seller {
        return Err(AuthorizationError::NotListingOwner.into());
    }
    if offer.buyer_id == *acting_seller {
        return Err(PreconditionError::SelfPurchase.into());
    }
    if offer.event_id != listing.event_id {
        return Err(PreconditionError::EventMismatch.into());
    }
    if offer.quantity != listing.quantity {
        return Err(PreconditionError::QuantityMismatch {
            wanted: offer.quantity.get(),
            listed: listing.quantity.get(),
        }
        .into());
    }
    if !offer.accepts_section(&listing.section_id) {
        return Err(PreconditionError::SectionNotAcceptable {
            section: listing.section_id.to_string(),
        }
        .into());
    }
    if listing.price > offer.max_price {
        return Err(PreconditionError::PriceAboveLimit {
            price: listing.price.to_string(),
            limit: offer.max_price.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Validate an offer draft, producing its typed terms
pub fn validate_new_offer(draft: &OfferDraft, now: i64) -> Result<OfferTerms, MarketError> {
    let max_price = Price::try_new(draft.max_price).ok_or_else(|| {
        PreconditionError::InvalidPrice(format!("{} is not a positive price", draft.max_price))
    })?;
    let quantity = Quantity::try_new(draft.quantity)
        .ok_or_else(|| PreconditionError::InvalidQuantity("must be at least 1".to_string()))?;
    if draft.expires_at <= now {
        return Err(PreconditionError::InvalidExpiry("must be in the future".to_string()).into());
    }

    let mut sections = BTreeSet::new();
    for label in &draft.sections {
        let section = SectionId::try_new(label.clone())
            .ok_or_else(|| PreconditionError::InvalidSection(label.clone()))?;
        sections.insert(section);
    }

    Ok(OfferTerms {
        max_price,
        quantity,
        sections,
    })
}

/// Validate a listing draft, producing its typed terms
pub fn validate_new_listing(draft: &ListingDraft, now: i64) -> Result<ListingTerms, MarketError> {
    let price = Price::try_new(draft.price).ok_or_else(|| {
        PreconditionError::InvalidPrice(format!("{} is not a positive price", draft.price))
    })?;
    let quantity = Quantity::try_new(draft.quantity)
        .ok_or_else(|| PreconditionError::InvalidQuantity("must be at least 1".to_string()))?;
    let section = SectionId::try_new(draft.section.clone())
        .ok_or_else(|| PreconditionError::InvalidSection(draft.section.clone()))?;

    if draft.seats.len() != draft.quantity as usize {
        return Err(PreconditionError::SeatCountMismatch {
            seats: draft.seats.len(),
            quantity: draft.quantity,
        }
        .into());
    }
    if let Some(expires_at) = draft.expires_at {
        if expires_at <= now {
            return Err(
                PreconditionError::InvalidExpiry("must be in the future".to_string()).into(),
            );
        }
    }

    Ok(ListingTerms {
        price,
        quantity,
        section,
    })
}
