//! Matching service
//!
//! Pairs buyer offers with seller listings. A seller accepts a concrete
//! offer against one of their listings; validation runs under the store's
//! record locks so every offer and every listing is matched at most once.
//!
//! - `rules`: pure validation over record snapshots
//! - `service`: intake, acceptance, withdrawal, browse

pub mod rules;
pub mod service;

pub use rules::{ListingDraft, OfferDraft};
pub use service::MatchingService;
