//! Payment gateway boundary
//!
//! Abstraction over payment processors like Stripe, PayPal, Adyen. Every
//! money movement carries an idempotency key derived from the transaction,
//! so a retry after a lost response can never charge or pay twice. The
//! `lookup` read exists for exactly that case: after a timeout the engine
//! asks what actually happened to the key before deciding anything.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use types::errors::GatewayError;
use uuid::Uuid;

/// Result of a successful capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReceipt {
    /// Gateway-side charge reference, required later for refunds
    pub gateway_ref: String,
}

/// Result of a successful seller transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub transfer_ref: String,
}

/// Result of a successful refund
#[derive(Debug, Clone, PartialEq)]
pub struct RefundReceipt {
    pub refund_ref: String,
}

/// Gateway-side fate of an idempotency key
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeStatus {
    /// The operation completed; `reference` is its gateway reference
    Settled { reference: String },
    /// The operation ran and was declined
    Failed { reason: String },
    /// The gateway never completed an operation under this key
    NotFound,
}

/// External payment processor
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the buyer and hold the funds in escrow
    async fn authorize_and_capture(
        &self,
        amount: Decimal,
        payment_method: &str,
        key: &str,
    ) -> Result<CaptureReceipt, GatewayError>;

    /// Transfer the seller's share out of escrow
    async fn transfer(
        &self,
        amount: Decimal,
        payout_account: &str,
        key: &str,
    ) -> Result<TransferReceipt, GatewayError>;

    /// Return captured funds to the buyer
    async fn refund(
        &self,
        gateway_ref: &str,
        amount: Decimal,
        key: &str,
    ) -> Result<RefundReceipt, GatewayError>;

    /// Reconciliation read: what happened under this key?
    async fn lookup(&self, key: &str) -> Result<ChargeStatus, GatewayError>;
}

// ── Mock gateway ────────────────────────────────────────────────────

/// One scripted behavior, consumed in order per operation
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Succeed,
    Fail(GatewayError),
    /// Never respond; the caller's timeout fires
    Hang,
    /// Apply the operation gateway-side, then never respond. Models a
    /// lost response: only `lookup` can reveal the settlement.
    SettleThenHang,
}

/// One recorded gateway invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub key: String,
    pub amount: Decimal,
    /// True when the key was already settled and no new work ran
    pub deduped: bool,
}

/// In-memory gateway for tests: scripted outcomes, per-key idempotency,
/// full call recording.
///
/// With no script queued every operation succeeds. Declines are remembered
/// against their key (a retry replays the same decline); timeouts and
/// outages are not, so a retried key runs fresh.
#[derive(Debug, Default)]
pub struct MockGateway {
    scripts: Mutex<HashMap<&'static str, VecDeque<MockOutcome>>>,
    settled: Mutex<HashMap<String, ChargeStatus>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_capture(&self, outcome: MockOutcome) {
        self.queue("capture", outcome);
    }

    pub fn queue_transfer(&self, outcome: MockOutcome) {
        self.queue("transfer", outcome);
    }

    pub fn queue_refund(&self, outcome: MockOutcome) {
        self.queue("refund", outcome);
    }

    pub fn queue_lookup(&self, outcome: MockOutcome) {
        self.queue("lookup", outcome);
    }

    fn queue(&self, operation: &'static str, outcome: MockOutcome) {
        self.scripts
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(outcome);
    }

    fn next_outcome(&self, operation: &'static str) -> MockOutcome {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(operation)
            .and_then(|q| q.pop_front())
            .unwrap_or(MockOutcome::Succeed)
    }

    /// Every invocation, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations of one operation, deduped ones included
    pub fn calls_to(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Invocations of one operation that actually ran (not key-deduped)
    pub fn executions(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation && !c.deduped)
            .count()
    }

    fn record(&self, operation: &'static str, key: &str, amount: Decimal, deduped: bool) {
        self.calls.lock().unwrap().push(RecordedCall {
            operation,
            key: key.to_string(),
            amount,
            deduped,
        });
    }

    fn settle(&self, key: &str, reference: &str) {
        self.settled.lock().unwrap().insert(
            key.to_string(),
            ChargeStatus::Settled {
                reference: reference.to_string(),
            },
        );
    }

    async fn run_keyed(
        &self,
        operation: &'static str,
        key: &str,
        amount: Decimal,
        reference: String,
    ) -> Result<String, GatewayError> {
        if let Some(status) = self.settled.lock().unwrap().get(key).cloned() {
            self.record(operation, key, amount, true);
            return match status {
                ChargeStatus::Settled { reference } => Ok(reference),
                ChargeStatus::Failed { reason } => Err(GatewayError::Declined { reason }),
                ChargeStatus::NotFound => unreachable!("NotFound is never stored"),
            };
        }
        self.record(operation, key, amount, false);

        match self.next_outcome(operation) {
            MockOutcome::Succeed => {
                self.settle(key, &reference);
                Ok(reference)
            }
            MockOutcome::Fail(err) => {
                if let GatewayError::Declined { reason } = &err {
                    self.settled.lock().unwrap().insert(
                        key.to_string(),
                        ChargeStatus::Failed {
                            reason: reason.clone(),
                        },
                    );
                }
                Err(err)
            }
            MockOutcome::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            MockOutcome::SettleThenHang => {
                self.settle(key, &reference);
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn authorize_and_capture(
        &self,
        amount: Decimal,
        _payment_method: &str,
        key: &str,
    ) -> Result<CaptureReceipt, GatewayError> {
        let reference = format!("ch_{}", Uuid::now_v7().simple());
        self.run_keyed("capture", key, amount, reference)
            .await
            .map(|gateway_ref| CaptureReceipt { gateway_ref })
    }

    async fn transfer(
        &self,
        amount: Decimal,
        _payout_account: &str,
        key: &str,
    ) -> Result<TransferReceipt, GatewayError> {
        let reference = format!("tr_{}", Uuid::now_v7().simple());
        self.run_keyed("transfer", key, amount, reference)
            .await
            .map(|transfer_ref| TransferReceipt { transfer_ref })
    }

    async fn refund(
        &self,
        _gateway_ref: &str,
        amount: Decimal,
        key: &str,
    ) -> Result<RefundReceipt, GatewayError> {
        let reference = format!("re_{}", Uuid::now_v7().simple());
        self.run_keyed("refund", key, amount, reference)
            .await
            .map(|refund_ref| RefundReceipt { refund_ref })
    }

    async fn lookup(&self, key: &str) -> Result<ChargeStatus, GatewayError> {
        match self.next_outcome("lookup") {
            MockOutcome::Succeed | MockOutcome::SettleThenHang => {}
            MockOutcome::Fail(err) => return Err(err),
            MockOutcome::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
        Ok(self
            .settled
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or(ChargeStatus::NotFound))
    }
}
