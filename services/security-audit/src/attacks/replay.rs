//! Replay attack simulation.
//! Tests that replaying the exact same signed payload or order is rejected.

use types::ids::{AccountId, MarketId, OrderId};
use types::order::{Side, TimeInForce, Order};
use types::numeric::{Price, Quantity};
use std::str::FromStr;
use std::collections::HashSet;

/// Simulates an exchange endpoint that drops replayed messages referencing the same Order ID
/// or sequence number.
pub struct ReplayDetector {
    seen_orders: HashSet<OrderId>,
}

impl ReplayDetector {
    pub fn new() -> Self {
        Self {
            seen_orders: HashSet::new(),
        }
    }

    /// Process an order. Returns true if accepted, false if it's a replay.
    pub fn process_order(&mut self, order: &Order) -> bool {
        if self.seen_orders.contains(&order.order_id) {
            return false;
        }
        self.seen_orders.insert(order.order_id);
        true
    }
}

impl Default for ReplayDetector {
    fn default() -> Self {
        Self::new()
    }
}
