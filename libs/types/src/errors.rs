//! Error types for marketplace operations
//!
//! Comprehensive error taxonomy using thiserror

use std::fmt;
use thiserror::Error;

/// Top-level marketplace error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("System error: {message}")]
    System { message: String },
}

impl MarketError {
    /// Build a NotFound error from any displayable id
    pub fn not_found(kind: RecordKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Build a System error from any displayable cause
    pub fn system(cause: impl fmt::Display) -> Self {
        Self::System {
            message: cause.to_string(),
        }
    }
}

/// Record categories used in NotFound errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Offer,
    Listing,
    Transaction,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer => write!(f, "Offer"),
            Self::Listing => write!(f, "Listing"),
            Self::Transaction => write!(f, "Transaction"),
        }
    }
}

/// A business rule rejected the operation
///
/// These are deterministic rejections: retrying the same call against the
/// same state fails the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("Invalid section: {0}")]
    InvalidSection(String),

    #[error("Offer is not active: {status}")]
    OfferNotActive { status: String },

    #[error("Listing is not active: {status}")]
    ListingNotActive { status: String },

    #[error("Offer has expired")]
    OfferExpired,

    #[error("Listing has expired")]
    ListingExpired,

    #[error("Offer and listing are for different events")]
    EventMismatch,

    #[error("Quantity mismatch: offer wants {wanted}, listing has {listed}")]
    QuantityMismatch { wanted: u32, listed: u32 },

    #[error("Listing price {price} exceeds offer limit {limit}")]
    PriceAboveLimit { price: String, limit: String },

    #[error("Listing section {section} is not acceptable to the buyer")]
    SectionNotAcceptable { section: String },

    #[error("Buyer and seller are the same user")]
    SelfPurchase,

    #[error("Seat list has {seats} labels for {quantity} tickets")]
    SeatCountMismatch { seats: usize, quantity: u32 },

    #[error("Dispute window closed at {deadline}")]
    DisputeWindowClosed { deadline: i64 },

    #[error("Payout requires a completed transaction: {status}")]
    NotCompleted { status: String },
}

/// Another actor changed the record first
///
/// Conflicts are losses of a race, not rule violations. Callers may re-read
/// and decide whether the new state still needs action.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConflictError {
    #[error("Offer is no longer available")]
    OfferUnavailable,

    #[error("Listing is no longer available")]
    ListingUnavailable,

    #[error("Record changed underneath: expected {expected}, found {actual}")]
    StaleStatus { expected: String, actual: String },

    #[error("Transaction already in terminal state: {status}")]
    AlreadyTerminal { status: String },

    #[error("Payout already in flight")]
    PayoutInFlight,

    #[error("Transaction already exists for offer {offer_id}")]
    DuplicateMatch { offer_id: String },
}

/// The actor is not allowed to perform the operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthorizationError {
    #[error("Only the offer owner may do this")]
    NotOfferOwner,

    #[error("Only the listing owner may do this")]
    NotListingOwner,

    #[error("Only the transaction buyer may do this")]
    NotBuyer,

    #[error("Only the transaction seller may do this")]
    NotSeller,

    #[error("Role {role} may not perform {operation}")]
    RoleNotPermitted { role: String, operation: String },
}

/// Payment gateway failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Payment declined: {reason}")]
    Declined { reason: String },

    #[error("Gateway timed out during {operation}")]
    Timeout { operation: String },

    #[error("Gateway unavailable: {reason}")]
    Unavailable { reason: String },
}

impl GatewayError {
    /// Whether the caller may retry after reconciling gateway state
    ///
    /// Declines are final; timeouts and outages are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = MarketError::not_found(RecordKind::Offer, "abc-123");
        assert_eq!(err.to_string(), "Offer not found: abc-123");
    }

    #[test]
    fn test_precondition_price_above_limit() {
        let err = PreconditionError::PriceAboveLimit {
            price: "120.00".to_string(),
            limit: "100.00".to_string(),
        };
        assert!(err.to_string().contains("120.00"));
        assert!(err.to_string().contains("100.00"));
    }

    #[test]
    fn test_market_error_from_conflict() {
        let conflict = ConflictError::OfferUnavailable;
        let err: MarketError = conflict.into();
        assert!(matches!(err, MarketError::Conflict(_)));
        assert_eq!(err.to_string(), "Conflict: Offer is no longer available");
    }

    #[test]
    fn test_gateway_retryability() {
        let timeout = GatewayError::Timeout {
            operation: "capture".to_string(),
        };
        let declined = GatewayError::Declined {
            reason: "insufficient funds".to_string(),
        };
        assert!(timeout.is_retryable());
        assert!(!declined.is_retryable());
    }

    #[test]
    fn test_stale_status_display() {
        let err = ConflictError::StaleStatus {
            expected: "DELIVERED".to_string(),
            actual: "COMPLETED".to_string(),
        };
        assert!(err.to_string().contains("DELIVERED"));
        assert!(err.to_string().contains("COMPLETED"));
    }
}
