//! Marketplace Record Store
//!
//! Provides the shared record store for offers, listings, and escrow
//! transactions: atomic conditional updates, the one-shot offer/listing
//! match primitive, bounded sweep scans, and a checksummed transition
//! audit log.

pub mod audit;
pub mod store;

pub use audit::{AuditError, TransitionLog, TransitionRecord};
pub use store::MarketStore;
