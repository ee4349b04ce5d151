//! Escrow transaction lifecycle engine for the marketplace.

pub mod engine;
pub mod gateway;
pub mod metrics;
pub mod policy;
