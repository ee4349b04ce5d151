//! Types library for the ticket resale marketplace
//!
//! This library provides all core type definitions shared across the
//! marketplace services, ensuring type safety and deterministic behavior.
//!
//! # Modules
//! - `ids`: Unique identifiers (UserId, EventId, OfferId, ListingId, TransactionId, SectionId)
//! - `money`: Monetary value types (Price, Quantity)
//! - `offer`: Buyer offer lifecycle types
//! - `listing`: Seller listing lifecycle types
//! - `transaction`: Escrow transaction lifecycle types
//! - `fee`: Platform fee policy
//! - `errors`: Error taxonomy
//! - `clock`: Injectable time source
//! - `notify`: Notification boundary

// Public modules
pub mod clock;
pub mod errors;
pub mod fee;
pub mod ids;
pub mod listing;
pub mod money;
pub mod notify;
pub mod offer;
pub mod transaction;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::errors::*;
    pub use crate::fee::*;
    pub use crate::ids::*;
    pub use crate::listing::*;
    pub use crate::money::*;
    pub use crate::notify::*;
    pub use crate::offer::*;
    pub use crate::transaction::*;
}
