//! Escrow transaction engine
//!
//! Owns every transition of the escrow state machine. State changes go
//! through the store's atomic updates; gateway calls happen outside record
//! locks, always under a timeout, always with an idempotency key. Repeating
//! an already-applied step is a no-op success; a genuinely stale call gets
//! a `ConflictError`. After any gateway timeout the engine reconciles with
//! a `lookup` before deciding what happened.

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use store::MarketStore;
use tokio::time::timeout;
use tracing::{error, info, warn};
use types::clock::Clock;
use types::errors::{ConflictError, GatewayError, MarketError, PreconditionError};
use types::fee::FeeSchedule;
use types::ids::TransactionId;
use types::listing::ListingStatus;
use types::notify::{Notice, NoticeKind, NotificationSink};
use types::offer::OfferStatus;
use types::transaction::{CancelSource, ConfirmSource, EscrowTransaction, TransactionStatus};

use crate::gateway::{ChargeStatus, PaymentGateway};
use crate::metrics::EngineMetrics;
use crate::policy::{self, Actor, EngineOp, EscrowPolicy};

pub struct EscrowEngine {
    store: Arc<MarketStore>,
    gateway: Arc<dyn PaymentGateway>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    policy: EscrowPolicy,
    fees: FeeSchedule,
    metrics: EngineMetrics,
}

impl EscrowEngine {
    pub fn new(
        store: Arc<MarketStore>,
        gateway: Arc<dyn PaymentGateway>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        policy: EscrowPolicy,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            store,
            gateway,
            sink,
            clock,
            policy,
            fees,
            metrics: EngineMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn policy(&self) -> &EscrowPolicy {
        &self.policy
    }

    // ── Capture ─────────────────────────────────────────────────────

    /// Charge the buyer for a freshly matched transaction.
    ///
    /// PENDING becomes PAID on success. A decline unwinds the match: the
    /// transaction dies, the listing returns to the market, and the offer
    /// is revived with a fresh expiry (the one path that resurrects an
    /// accepted offer). A timeout leaves the transaction PENDING after an
    /// unresolved reconciliation; retries reuse the same capture key.
    pub async fn capture_payment(
        &self,
        txn_id: &TransactionId,
    ) -> Result<EscrowTransaction, MarketError> {
        let txn = self.store.transaction(txn_id)?;
        match txn.status {
            TransactionStatus::PENDING => {}
            TransactionStatus::PAID
            | TransactionStatus::DELIVERED
            | TransactionStatus::COMPLETED => return Ok(txn),
            status => {
                return Err(ConflictError::AlreadyTerminal {
                    status: format!("{:?}", status),
                }
                .into())
            }
        }

        let key = txn.capture_key();
        let method = txn.buyer_id.to_string();
        let outcome = self
            .gateway_call(
                "capture",
                self.gateway.authorize_and_capture(txn.amount, &method, &key),
            )
            .await;

        match outcome {
            Ok(receipt) => self.apply_capture(txn_id, receipt.gateway_ref).await,
            Err(err @ GatewayError::Timeout { .. }) => match self.reconcile(&key).await {
                Ok(ChargeStatus::Settled { reference }) => {
                    self.apply_capture(txn_id, reference).await
                }
                Ok(ChargeStatus::Failed { reason }) => Err(self.fail_capture(txn_id, reason)),
                Ok(ChargeStatus::NotFound) | Err(_) => {
                    warn!(transaction_id = %txn_id, "capture unresolved after timeout");
                    Err(MarketError::Gateway(err))
                }
            },
            Err(GatewayError::Declined { reason }) => Err(self.fail_capture(txn_id, reason)),
            Err(err) => {
                // Transient gateway trouble; the transaction stays PENDING
                warn!(transaction_id = %txn_id, error = %err, "capture attempt failed");
                Err(MarketError::Gateway(err))
            }
        }
    }

    /// Record a capture that the gateway confirmed.
    ///
    /// If the transaction died while the charge was in flight, the money
    /// is sent back under the refund key and the conflict surfaces.
    async fn apply_capture(
        &self,
        txn_id: &TransactionId,
        gateway_ref: String,
    ) -> Result<EscrowTransaction, MarketError> {
        let now = self.clock.now();
        let mut applied = false;
        let update = self.store.update_transaction(txn_id, |t| match t.status {
            TransactionStatus::PENDING => {
                t.mark_paid(gateway_ref.clone(), now);
                applied = true;
                Ok(())
            }
            TransactionStatus::PAID
            | TransactionStatus::DELIVERED
            | TransactionStatus::COMPLETED => Ok(()),
            status => Err(ConflictError::AlreadyTerminal {
                status: format!("{:?}", status),
            }
            .into()),
        });

        match update {
            Ok(txn) => {
                if applied {
                    self.metrics.record_capture();
                    info!(
                        transaction_id = %txn.transaction_id,
                        gateway_ref = %gateway_ref,
                        amount = %txn.amount,
                        "payment captured"
                    );
                    self.sink.notify(
                        txn.buyer_id,
                        Notice::new(
                            NoticeKind::PaymentCaptured,
                            json!({ "transaction_id": txn.transaction_id, "amount": txn.amount }),
                        ),
                    );
                }
                Ok(txn)
            }
            Err(MarketError::Conflict(conflict)) => {
                // The charge landed on a transaction that was cancelled
                // while it was in flight; send the money straight back
                warn!(transaction_id = %txn_id, "capture landed on a dead transaction; compensating");
                let txn = self.store.transaction(txn_id)?;
                if let Err(err) = self
                    .gateway_call(
                        "refund",
                        self.gateway
                            .refund(&gateway_ref, txn.amount, &txn.refund_key()),
                    )
                    .await
                {
                    error!(
                        transaction_id = %txn_id,
                        gateway_ref = %gateway_ref,
                        error = %err,
                        "compensating refund failed; manual reconciliation required"
                    );
                }
                self.metrics.record_conflict();
                Err(MarketError::Conflict(conflict))
            }
            Err(err) => Err(err),
        }
    }

    /// Settle a declined capture: transaction dies, match unwinds.
    ///
    /// Returns the error the caller should surface.
    fn fail_capture(&self, txn_id: &TransactionId, reason: String) -> MarketError {
        let now = self.clock.now();
        let mut applied = false;
        let result = self.store.update_transaction(txn_id, |t| match t.status {
            TransactionStatus::PENDING => {
                t.cancel(
                    CancelSource::System,
                    Some(format!("payment failed: {}", reason)),
                    now,
                );
                applied = true;
                Ok(())
            }
            TransactionStatus::CANCELLED => Ok(()),
            status => Err(ConflictError::StaleStatus {
                expected: "PENDING".to_string(),
                actual: format!("{:?}", status),
            }
            .into()),
        });

        match result {
            Ok(txn) => {
                if applied {
                    self.metrics.record_capture_failure();
                    self.revive_market(&txn, now);
                    warn!(
                        transaction_id = %txn.transaction_id,
                        reason = %reason,
                        "capture declined; match unwound"
                    );
                    self.sink.notify(
                        txn.buyer_id,
                        Notice::new(
                            NoticeKind::PaymentFailed,
                            json!({ "transaction_id": txn.transaction_id, "reason": reason }),
                        ),
                    );
                }
                MarketError::Gateway(GatewayError::Declined { reason })
            }
            Err(other) => other,
        }
    }

    // ── Delivery and confirmation ───────────────────────────────────

    /// Seller hands the tickets over. Repeats on DELIVERED are no-ops,
    /// so the first delivery timestamp is the only one.
    pub fn mark_delivered(
        &self,
        txn_id: &TransactionId,
        actor: &Actor,
    ) -> Result<EscrowTransaction, MarketError> {
        let now = self.clock.now();
        let mut applied = false;
        let txn = self.store.update_transaction(txn_id, |t| {
            policy::permitted(actor, EngineOp::MarkDelivered, t)?;
            match t.status {
                TransactionStatus::PAID => {
                    t.mark_delivered(now);
                    applied = true;
                    Ok(())
                }
                TransactionStatus::DELIVERED => Ok(()),
                status => Err(ConflictError::StaleStatus {
                    expected: "PAID".to_string(),
                    actual: format!("{:?}", status),
                }
                .into()),
            }
        })?;

        if applied {
            info!(transaction_id = %txn.transaction_id, "tickets delivered");
            self.sink.notify(
                txn.buyer_id,
                Notice::new(
                    NoticeKind::TicketsDelivered,
                    json!({
                        "transaction_id": txn.transaction_id,
                        "delivered_at": txn.tickets_delivered_at,
                    }),
                ),
            );
        }
        Ok(txn)
    }

    /// Buyer confirms receipt: the escrow closes and the payout runs.
    ///
    /// A repeat after the buyer's own confirmation is a no-op success; a
    /// confirm against a system-released transaction is a conflict, since
    /// the buyer did not cause that completion.
    pub async fn confirm_receipt(
        &self,
        txn_id: &TransactionId,
        actor: &Actor,
    ) -> Result<EscrowTransaction, MarketError> {
        let now = self.clock.now();
        let mut applied = false;
        let txn = self.store.update_transaction(txn_id, |t| {
            policy::permitted(actor, EngineOp::ConfirmReceipt, t)?;
            match t.status {
                TransactionStatus::DELIVERED => {
                    t.complete(ConfirmSource::Buyer, now);
                    applied = true;
                    Ok(())
                }
                TransactionStatus::COMPLETED
                    if t.confirmed_by == Some(ConfirmSource::Buyer) =>
                {
                    Ok(())
                }
                status => Err(ConflictError::StaleStatus {
                    expected: "DELIVERED".to_string(),
                    actual: format!("{:?}", status),
                }
                .into()),
            }
        })?;

        if !applied {
            return Ok(txn);
        }

        info!(transaction_id = %txn.transaction_id, "receipt confirmed by buyer");
        self.close_listing(&txn, now);
        self.sink.notify(
            txn.seller_id,
            Notice::new(
                NoticeKind::ReceiptConfirmed,
                json!({ "transaction_id": txn.transaction_id, "confirmed_by": txn.confirmed_by }),
            ),
        );

        if let Err(err) = self.release_payout(txn_id).await {
            // The completion stands; the sweep retries the transfer
            warn!(transaction_id = %txn_id, error = %err, "payout deferred");
        }
        self.store.transaction(txn_id)
    }

    /// Scheduler path: release the escrow when the buyer's confirmation
    /// window has lapsed. Returns whether this call performed the release.
    /// Anything not due is a quiet no-op, so sweeps can fire this blindly.
    pub async fn auto_release_if_expired(
        &self,
        txn_id: &TransactionId,
    ) -> Result<bool, MarketError> {
        let now = self.clock.now();
        let window = self.policy.confirmation_window_ns();
        let mut applied = false;
        let txn = self.store.update_transaction(txn_id, |t| {
            if t.confirmation_overdue(window, now) {
                t.complete(ConfirmSource::System, now);
                applied = true;
            }
            Ok(())
        })?;

        if !applied {
            return Ok(false);
        }

        info!(transaction_id = %txn.transaction_id, "confirmation window lapsed; releasing escrow");
        self.close_listing(&txn, now);
        self.sink.notify(
            txn.seller_id,
            Notice::new(
                NoticeKind::ReceiptConfirmed,
                json!({ "transaction_id": txn.transaction_id, "confirmed_by": txn.confirmed_by }),
            ),
        );

        if let Err(err) = self.release_payout(txn_id).await {
            warn!(transaction_id = %txn_id, error = %err, "payout deferred");
        }
        Ok(true)
    }

    // ── Payout ──────────────────────────────────────────────────────

    /// Transfer the seller's share out of escrow, exactly once.
    ///
    /// The claim bit on the record admits one live transfer at a time;
    /// concurrent callers get `PayoutInFlight` and an already-paid
    /// transaction is a no-op success. A failed transfer clears the claim
    /// so the sweep can retry with the same payout key.
    pub async fn release_payout(
        &self,
        txn_id: &TransactionId,
    ) -> Result<EscrowTransaction, MarketError> {
        let now = self.clock.now();
        let mut claimed = false;
        let txn = self.store.update_transaction(txn_id, |t| {
            if t.seller_paid_out {
                return Ok(());
            }
            if t.status != TransactionStatus::COMPLETED {
                return Err(ConflictError::StaleStatus {
                    expected: "COMPLETED".to_string(),
                    actual: format!("{:?}", t.status),
                }
                .into());
            }
            if !t.claim_payout(now) {
                return Err(ConflictError::PayoutInFlight.into());
            }
            claimed = true;
            Ok(())
        })?;

        if !claimed {
            return Ok(txn);
        }

        let key = txn.payout_key();
        let account = txn.seller_id.to_string();
        let outcome = self
            .gateway_call(
                "transfer",
                self.gateway.transfer(txn.seller_amount, &account, &key),
            )
            .await;

        match outcome {
            Ok(receipt) => self.finish_payout(txn_id, &receipt.transfer_ref),
            Err(err @ GatewayError::Timeout { .. }) => match self.reconcile(&key).await {
                Ok(ChargeStatus::Settled { reference }) => self.finish_payout(txn_id, &reference),
                _ => {
                    self.abandon_payout_claim(txn_id);
                    warn!(transaction_id = %txn_id, "payout unresolved after timeout");
                    Err(MarketError::Gateway(err))
                }
            },
            Err(err) => {
                self.abandon_payout_claim(txn_id);
                self.metrics.record_payout_failure();
                warn!(transaction_id = %txn_id, error = %err, "payout transfer failed");
                Err(MarketError::Gateway(err))
            }
        }
    }

    fn finish_payout(
        &self,
        txn_id: &TransactionId,
        transfer_ref: &str,
    ) -> Result<EscrowTransaction, MarketError> {
        let now = self.clock.now();
        let txn = self.store.update_transaction(txn_id, |t| {
            t.record_payout(now);
            Ok(())
        })?;
        self.metrics.record_payout();
        info!(
            transaction_id = %txn.transaction_id,
            transfer_ref = %transfer_ref,
            amount = %txn.seller_amount,
            "seller paid out"
        );
        self.sink.notify(
            txn.seller_id,
            Notice::new(
                NoticeKind::PayoutReleased,
                json!({ "transaction_id": txn.transaction_id, "amount": txn.seller_amount }),
            ),
        );
        Ok(txn)
    }

    fn abandon_payout_claim(&self, txn_id: &TransactionId) {
        let now = self.clock.now();
        let result = self.store.update_transaction(txn_id, |t| {
            if t.payout_in_flight {
                t.clear_payout_claim(now);
            }
            Ok(())
        });
        if let Err(err) = result {
            error!(transaction_id = %txn_id, error = %err, "payout claim stuck");
        }
    }

    // ── Teardown ────────────────────────────────────────────────────

    /// Cancel a transaction that has not reached delivery.
    ///
    /// PENDING cancels take no money movement. PAID cancels first return
    /// the full amount to the buyer under the refund key, then settle the
    /// record; the listing returns to the market and the offer dies. A
    /// repeat on CANCELLED is a no-op success.
    pub async fn cancel_transaction(
        &self,
        txn_id: &TransactionId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<EscrowTransaction, MarketError> {
        let txn = self.store.transaction(txn_id)?;
        policy::permitted(actor, EngineOp::Cancel, &txn)?;
        match txn.status {
            TransactionStatus::PENDING => self.cancel_unpaid(txn_id, actor, reason),
            TransactionStatus::PAID => self.cancel_paid(&txn, actor, reason).await,
            TransactionStatus::CANCELLED => Ok(txn),
            TransactionStatus::DELIVERED => Err(ConflictError::StaleStatus {
                expected: "PENDING or PAID".to_string(),
                actual: "DELIVERED".to_string(),
            }
            .into()),
            status => Err(ConflictError::AlreadyTerminal {
                status: format!("{:?}", status),
            }
            .into()),
        }
    }

    fn cancel_unpaid(
        &self,
        txn_id: &TransactionId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<EscrowTransaction, MarketError> {
        let now = self.clock.now();
        let source = actor.cancel_source();
        let mut applied = false;
        let txn = self.store.update_transaction(txn_id, |t| match t.status {
            TransactionStatus::PENDING => {
                t.cancel(source, reason, now);
                applied = true;
                Ok(())
            }
            TransactionStatus::CANCELLED => Ok(()),
            // A capture slipped in; the caller must cancel under PAID rules
            status => Err(ConflictError::StaleStatus {
                expected: "PENDING".to_string(),
                actual: format!("{:?}", status),
            }
            .into()),
        })?;

        if applied {
            self.metrics.record_cancellation();
            self.release_market(&txn, now);
            info!(
                transaction_id = %txn.transaction_id,
                source = ?txn.canceled_by,
                "transaction cancelled before capture"
            );
            self.notify_cancelled(&txn);
        }
        Ok(txn)
    }

    async fn cancel_paid(
        &self,
        txn: &EscrowTransaction,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<EscrowTransaction, MarketError> {
        let Some(gateway_ref) = txn.gateway_ref.clone() else {
            return Err(MarketError::system("PAID transaction has no gateway reference"));
        };
        self.issue_refund(&gateway_ref, txn.amount, &txn.refund_key())
            .await?;

        let now = self.clock.now();
        let source = actor.cancel_source();
        let mut cancelled = false;
        let mut refunded_instead = false;
        let updated = self
            .store
            .update_transaction(&txn.transaction_id, |t| match t.status {
                TransactionStatus::PAID => {
                    t.cancel(source, reason.clone(), now);
                    cancelled = true;
                    Ok(())
                }
                // Delivery won the race, but the money is already back
                // with the buyer; settle the record as a refund
                TransactionStatus::DELIVERED => {
                    t.refund(reason.clone(), now);
                    refunded_instead = true;
                    Ok(())
                }
                TransactionStatus::CANCELLED | TransactionStatus::REFUNDED => Ok(()),
                status => Err(ConflictError::AlreadyTerminal {
                    status: format!("{:?}", status),
                }
                .into()),
            })?;

        if cancelled {
            self.metrics.record_cancellation();
            self.release_market(&updated, now);
            info!(
                transaction_id = %updated.transaction_id,
                amount = %updated.amount,
                "paid transaction cancelled; buyer refunded"
            );
            self.notify_cancelled(&updated);
        } else if refunded_instead {
            self.metrics.record_refund();
            self.close_listing(&updated, now);
            self.retire_offer(&updated, now);
            warn!(
                transaction_id = %updated.transaction_id,
                "delivery raced a paid cancellation; settled as refund"
            );
            self.notify_refunded(&updated);
        }
        Ok(updated)
    }

    /// Refund a delivered transaction inside the dispute window.
    ///
    /// The only exit from DELIVERED without a completed sale. The listing
    /// is not restored: the tickets left the seller's hands.
    pub async fn refund_transaction(
        &self,
        txn_id: &TransactionId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<EscrowTransaction, MarketError> {
        let txn = self.store.transaction(txn_id)?;
        policy::permitted(actor, EngineOp::Refund, &txn)?;
        let now = self.clock.now();
        match txn.status {
            TransactionStatus::DELIVERED => {}
            TransactionStatus::REFUNDED => return Ok(txn),
            TransactionStatus::PENDING | TransactionStatus::PAID => {
                return Err(ConflictError::StaleStatus {
                    expected: "DELIVERED".to_string(),
                    actual: format!("{:?}", txn.status),
                }
                .into())
            }
            status => {
                return Err(ConflictError::AlreadyTerminal {
                    status: format!("{:?}", status),
                }
                .into())
            }
        }
        if !txn.within_dispute_window(self.policy.dispute_window_ns(), now) {
            let deadline =
                txn.tickets_delivered_at.unwrap_or(txn.created_at) + self.policy.dispute_window_ns();
            return Err(PreconditionError::DisputeWindowClosed { deadline }.into());
        }
        let Some(gateway_ref) = txn.gateway_ref.clone() else {
            return Err(MarketError::system("DELIVERED transaction has no gateway reference"));
        };

        let amount = self.fees.refund_amount(txn.amount);
        self.issue_refund(&gateway_ref, amount, &txn.refund_key())
            .await?;

        let now = self.clock.now();
        let mut applied = false;
        let result = self.store.update_transaction(txn_id, |t| match t.status {
            TransactionStatus::DELIVERED => {
                t.refund(reason, now);
                applied = true;
                Ok(())
            }
            TransactionStatus::REFUNDED => Ok(()),
            status => Err(ConflictError::AlreadyTerminal {
                status: format!("{:?}", status),
            }
            .into()),
        });

        match result {
            Ok(updated) => {
                if applied {
                    self.metrics.record_refund();
                    self.close_listing(&updated, now);
                    self.retire_offer(&updated, now);
                    info!(
                        transaction_id = %updated.transaction_id,
                        amount = %amount,
                        "transaction refunded"
                    );
                    self.notify_refunded(&updated);
                }
                Ok(updated)
            }
            Err(err) => {
                // The refund landed but the record settled another way
                // first; the money trail needs an operator's eyes
                error!(
                    transaction_id = %txn_id,
                    refund_key = %txn.refund_key(),
                    error = %err,
                    "refund issued but not recordable"
                );
                self.metrics.record_conflict();
                Err(err)
            }
        }
    }

    // ── Gateway plumbing ────────────────────────────────────────────

    async fn gateway_call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        match timeout(self.policy.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_gateway_timeout();
                Err(GatewayError::Timeout {
                    operation: operation.to_string(),
                })
            }
        }
    }

    /// Timeout aftermath: ask the gateway what actually happened
    async fn reconcile(&self, key: &str) -> Result<ChargeStatus, GatewayError> {
        match timeout(self.policy.gateway_timeout, self.gateway.lookup(key)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                operation: "lookup".to_string(),
            }),
        }
    }

    /// Keyed refund with timeout reconciliation. Ok means the money is
    /// confirmed back with the buyer.
    async fn issue_refund(
        &self,
        gateway_ref: &str,
        amount: Decimal,
        key: &str,
    ) -> Result<(), MarketError> {
        match self
            .gateway_call("refund", self.gateway.refund(gateway_ref, amount, key))
            .await
        {
            Ok(_) => Ok(()),
            Err(err @ GatewayError::Timeout { .. }) => match self.reconcile(key).await {
                Ok(ChargeStatus::Settled { .. }) => Ok(()),
                _ => {
                    warn!(key = %key, "refund unresolved after timeout");
                    Err(MarketError::Gateway(err))
                }
            },
            Err(err) => {
                warn!(key = %key, error = %err, "refund failed");
                Err(MarketError::Gateway(err))
            }
        }
    }

    // ── Market restoration ──────────────────────────────────────────
    //
    // Offer and listing follow-ups are tolerant: each re-checks current
    // status and skips silently when another path got there first.

    /// Failed capture: the match unwinds and the offer returns to the
    /// market with a fresh expiry
    fn revive_market(&self, txn: &EscrowTransaction, now: i64) {
        let revived_until = now + self.policy.revived_offer_ttl_ns();
        let offer = self.store.update_offer(&txn.offer_id, |o| {
            if o.status == OfferStatus::ACCEPTED {
                o.revive(revived_until, now);
            }
            Ok(())
        });
        if let Err(err) = offer {
            warn!(offer_id = %txn.offer_id, error = %err, "offer revival skipped");
        }
        self.release_listing(txn, now);
    }

    /// Cancelled transaction: the listing returns to the market, the
    /// offer dies and the buyer must re-offer
    fn release_market(&self, txn: &EscrowTransaction, now: i64) {
        self.retire_offer(txn, now);
        self.release_listing(txn, now);
    }

    fn release_listing(&self, txn: &EscrowTransaction, now: i64) {
        let listing = self.store.update_listing(&txn.listing_id, |l| {
            if l.status == ListingStatus::RESERVED {
                l.release(now);
            }
            Ok(())
        });
        if let Err(err) = listing {
            warn!(listing_id = %txn.listing_id, error = %err, "listing release skipped");
        }
    }

    /// Settled sale or upheld dispute: the tickets are gone
    fn close_listing(&self, txn: &EscrowTransaction, now: i64) {
        let listing = self.store.update_listing(&txn.listing_id, |l| {
            if l.status == ListingStatus::RESERVED {
                l.mark_sold(now);
            }
            Ok(())
        });
        if let Err(err) = listing {
            warn!(listing_id = %txn.listing_id, error = %err, "listing close skipped");
        }
    }

    fn retire_offer(&self, txn: &EscrowTransaction, now: i64) {
        let offer = self.store.update_offer(&txn.offer_id, |o| {
            if o.status == OfferStatus::ACCEPTED {
                o.cancel(now);
            }
            Ok(())
        });
        if let Err(err) = offer {
            warn!(offer_id = %txn.offer_id, error = %err, "offer teardown skipped");
        }
    }

    // ── Notifications ───────────────────────────────────────────────

    fn notify_cancelled(&self, txn: &EscrowTransaction) {
        let body = json!({
            "transaction_id": txn.transaction_id,
            "canceled_by": txn.canceled_by,
            "reason": txn.cancel_reason,
        });
        self.sink.notify(
            txn.buyer_id,
            Notice::new(NoticeKind::TransactionCancelled, body.clone()),
        );
        self.sink.notify(
            txn.seller_id,
            Notice::new(NoticeKind::TransactionCancelled, body),
        );
    }

    fn notify_refunded(&self, txn: &EscrowTransaction) {
        let body = json!({
            "transaction_id": txn.transaction_id,
            "reason": txn.refund_reason,
        });
        self.sink.notify(
            txn.buyer_id,
            Notice::new(NoticeKind::TransactionRefunded, body.clone()),
        );
        self.sink.notify(
            txn.seller_id,
            Notice::new(NoticeKind::TransactionRefunded, body),
        );
    }
}
