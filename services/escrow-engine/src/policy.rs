//! Capability policy and escrow windows
//!
//! One table decides who may invoke which engine operation on which
//! transaction; the state machine itself stays role-agnostic. Window and
//! timeout defaults live here too.

use std::time::Duration;
use types::errors::{AuthorizationError, MarketError};
use types::ids::UserId;
use types::transaction::{CancelSource, EscrowTransaction, TransactionStatus};
use uuid::Uuid;

/// What an actor is acting as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Seller,
    Admin,
    System,
}

/// Who is asking for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn buyer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Buyer,
        }
    }

    pub fn seller(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Seller,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// The scheduler and engine-internal actor
    pub fn system() -> Self {
        Self {
            user_id: UserId::from_uuid(Uuid::nil()),
            role: Role::System,
        }
    }

    /// Cancellation attribution for this actor
    pub fn cancel_source(&self) -> CancelSource {
        match self.role {
            Role::Buyer => CancelSource::Buyer,
            Role::Seller => CancelSource::Seller,
            Role::Admin => CancelSource::Admin,
            Role::System => CancelSource::System,
        }
    }
}

/// Engine operations subject to the capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOp {
    CapturePayment,
    MarkDelivered,
    ConfirmReceipt,
    ReleasePayout,
    Cancel,
    Refund,
}

impl EngineOp {
    pub fn name(&self) -> &'static str {
        match self {
            EngineOp::CapturePayment => "capture_payment",
            EngineOp::MarkDelivered => "mark_delivered",
            EngineOp::ConfirmReceipt => "confirm_receipt",
            EngineOp::ReleasePayout => "release_payout",
            EngineOp::Cancel => "cancel_transaction",
            EngineOp::Refund => "refund_transaction",
        }
    }
}

/// Decide whether `actor` may invoke `op` on `txn`.
///
/// Ownership binds Buyer and Seller roles to the transaction's own parties;
/// Admin and System skip ownership. Cancellation narrows by status: a
/// PENDING transaction (nothing captured yet) is the seller's to walk away
/// from, a PAID one may be cancelled by either party.
pub fn permitted(actor: &Actor, op: EngineOp, txn: &EscrowTransaction) -> Result<(), MarketError> {
    match (op, actor.role) {
        (EngineOp::CapturePayment, Role::System | Role::Admin) => Ok(()),
        (EngineOp::ReleasePayout, Role::System | Role::Admin) => Ok(()),

        (EngineOp::MarkDelivered, Role::Admin) => Ok(()),
        (EngineOp::MarkDelivered, Role::Seller) => require_seller(actor, txn),

        (EngineOp::ConfirmReceipt, Role::Buyer) => require_buyer(actor, txn),

        (EngineOp::Cancel, Role::Admin | Role::System) => Ok(()),
        (EngineOp::Cancel, Role::Seller) => require_seller(actor, txn),
        (EngineOp::Cancel, Role::Buyer) => {
            require_buyer(actor, txn)?;
            if txn.status == TransactionStatus::PENDING {
                return Err(role_denied(actor, op));
            }
            Ok(())
        }

        (EngineOp::Refund, Role::Admin) => Ok(()),
        (EngineOp::Refund, Role::Buyer) => require_buyer(actor, txn),

        _ => Err(role_denied(actor, op)),
    }
}

fn require_seller(actor: &Actor, txn: &EscrowTransaction) -> Result<(), MarketError> {
    if actor.user_id == txn.seller_id {
        Ok(())
    } else {
        Err(AuthorizationError::NotSeller.into())
    }
}

fn require_buyer(actor: &Actor, txn: &EscrowTransaction) -> Result<(), MarketError> {
    if actor.user_id == txn.buyer_id {
        Ok(())
    } else {
        Err(AuthorizationError::NotBuyer.into())
    }
}

fn role_denied(actor: &Actor, op: EngineOp) -> MarketError {
    AuthorizationError::RoleNotPermitted {
        role: format!("{:?}", actor.role),
        operation: op.name().to_string(),
    }
    .into()
}

/// Time windows and bounds for the escrow lifecycle
#[derive(Debug, Clone)]
pub struct EscrowPolicy {
    /// How long a buyer has to confirm receipt before auto-release
    pub confirmation_window: Duration,
    /// How long after delivery a refund may still be opened
    pub dispute_window: Duration,
    /// How long a PENDING transaction may wait for its capture
    pub payment_window: Duration,
    /// Fresh expiry granted to an offer revived after a failed capture
    pub revived_offer_ttl: Duration,
    /// Bound on any single gateway call
    pub gateway_timeout: Duration,
}

impl Default for EscrowPolicy {
    fn default() -> Self {
        Self {
            confirmation_window: Duration::from_secs(72 * 3600),
            dispute_window: Duration::from_secs(72 * 3600),
            payment_window: Duration::from_secs(30 * 60),
            revived_offer_ttl: Duration::from_secs(24 * 3600),
            gateway_timeout: Duration::from_secs(10),
        }
    }
}

impl EscrowPolicy {
    // Record timestamps are Unix nanos; windows convert once here.

    pub fn confirmation_window_ns(&self) -> i64 {
        self.confirmation_window.as_nanos() as i64
    }

    pub fn dispute_window_ns(&self) -> i64 {
        self.dispute_window.as_nanos() as i64
    }

    pub fn payment_window_ns(&self) -> i64 {
        self.payment_window.as_nanos() as i64
    }

    pub fn revived_offer_ttl_ns(&self) -> i64 {
        self.revived_offer_ttl.as_nanos() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::fee::FeeSchedule;
    use types::ids::{ListingId, OfferId};
    use types::transaction::CancelSource;

    fn txn() -> EscrowTransaction {
        EscrowTransaction::new(
            OfferId::new(),
            ListingId::new(),
            UserId::new(),
            UserId::new(),
            FeeSchedule::default().split(rust_decimal::Decimal::from(100)),
            1_700_000_000_000_000_000,
        )
    }

    #[test]
    fn test_seller_may_deliver_own_transaction_only() {
        let t = txn();
        assert!(permitted(&Actor::seller(t.seller_id), EngineOp::MarkDelivered, &t).is_ok());

        let stranger = Actor::seller(UserId::new());
        assert!(matches!(
            permitted(&stranger, EngineOp::MarkDelivered, &t),
            Err(MarketError::Authorization(AuthorizationError::NotSeller))
        ));
    }

    #[test]
    fn test_buyer_may_not_deliver() {
        let t = txn();
        let buyer = Actor::buyer(t.buyer_id);
        assert!(matches!(
            permitted(&buyer, EngineOp::MarkDelivered, &t),
            Err(MarketError::Authorization(AuthorizationError::RoleNotPermitted { .. }))
        ));
    }

    #[test]
    fn test_confirm_is_buyer_only() {
        let t = txn();
        assert!(permitted(&Actor::buyer(t.buyer_id), EngineOp::ConfirmReceipt, &t).is_ok());
        assert!(permitted(&Actor::seller(t.seller_id), EngineOp::ConfirmReceipt, &t).is_err());
        assert!(permitted(&Actor::system(), EngineOp::ConfirmReceipt, &t).is_err());
    }

    #[test]
    fn test_buyer_cannot_cancel_pending_but_can_cancel_paid() {
        let mut t = txn();
        let buyer = Actor::buyer(t.buyer_id);
        assert!(matches!(
            permitted(&buyer, EngineOp::Cancel, &t),
            Err(MarketError::Authorization(AuthorizationError::RoleNotPermitted { .. }))
        ));

        t.mark_paid("ch_1".to_string(), 1);
        assert!(permitted(&buyer, EngineOp::Cancel, &t).is_ok());
    }

    #[test]
    fn test_seller_system_admin_cancel_pending() {
        let t = txn();
        assert!(permitted(&Actor::seller(t.seller_id), EngineOp::Cancel, &t).is_ok());
        assert!(permitted(&Actor::system(), EngineOp::Cancel, &t).is_ok());
        assert!(permitted(&Actor::admin(UserId::new()), EngineOp::Cancel, &t).is_ok());
    }

    #[test]
    fn test_refund_is_buyer_or_admin() {
        let t = txn();
        assert!(permitted(&Actor::buyer(t.buyer_id), EngineOp::Refund, &t).is_ok());
        assert!(permitted(&Actor::admin(UserId::new()), EngineOp::Refund, &t).is_ok());
        assert!(permitted(&Actor::seller(t.seller_id), EngineOp::Refund, &t).is_err());
    }

    #[test]
    fn test_capture_and_payout_are_system_operations() {
        let t = txn();
        assert!(permitted(&Actor::system(), EngineOp::CapturePayment, &t).is_ok());
        assert!(permitted(&Actor::buyer(t.buyer_id), EngineOp::CapturePayment, &t).is_err());
        assert!(permitted(&Actor::system(), EngineOp::ReleasePayout, &t).is_ok());
        assert!(permitted(&Actor::seller(t.seller_id), EngineOp::ReleasePayout, &t).is_err());
    }

    #[test]
    fn test_cancel_source_attribution() {
        assert_eq!(Actor::system().cancel_source(), CancelSource::System);
        assert_eq!(
            Actor::buyer(UserId::new()).cancel_source(),
            CancelSource::Buyer
        );
    }

    #[test]
    fn test_default_policy_windows() {
        let policy = EscrowPolicy::default();
        assert_eq!(policy.confirmation_window, Duration::from_secs(259_200));
        assert_eq!(policy.payment_window, Duration::from_secs(1_800));
        assert_eq!(policy.gateway_timeout, Duration::from_secs(10));
        assert_eq!(policy.confirmation_window_ns(), 259_200_000_000_000_000);
    }
}
