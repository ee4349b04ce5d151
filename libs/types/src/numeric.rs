//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! All calculations use HALF_UP rounding per spec §3 (Trade Lifecycle).

// Placeholder - will be implemented in Phase 2
