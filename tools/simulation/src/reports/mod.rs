//! Report modules for simulation output
//!
//! Depth visualization, slippage analysis, and profitability reports.

pub mod depth;
pub mod slippage;
pub mod profitability;
