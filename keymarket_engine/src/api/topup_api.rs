use std::{collections::BTreeMap, fmt::Debug};

use futures_util::future::join_all;
use km_common::Money;
use log::*;

use crate::{
    db_types::{NewTopUp, Payment},
    events::{EventProducers, TopUpCompletedEvent},
    traits::{
        BankAccountManagement,
        BankFeed,
        MarketGatewayDatabase,
        MarketGatewayError,
        ReconciliationReport,
    },
};

/// `TopUpApi` owns the wallet top-up lifecycle: issuing pending invoices, reconciling them
/// against the bank feed, and the admin manual-credit path that bypasses the bank.
pub struct TopUpApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for TopUpApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TopUpApi")
    }
}

impl<B> TopUpApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> TopUpApi<B>
where B: MarketGatewayDatabase + BankAccountManagement
{
    /// Issues a new pending top-up invoice for the seller.
    ///
    /// The returned payment carries the transfer reference the seller must quote in their bank
    /// transfer memo, the local-currency amount to transfer, the destination bank account, and
    /// the expiry deadline.
    pub async fn issue_topup(&self, topup: NewTopUp) -> Result<Payment, MarketGatewayError> {
        let seller_id = topup.seller_id;
        let payment = self.db.issue_topup(topup).await?;
        debug!(
            "💳️ Top-up [{}] issued for seller #{seller_id}: {} ({} local), expires {}",
            payment.transfer_ref, payment.amount, payment.local_amount, payment.expires_at
        );
        Ok(payment)
    }

    /// Credits a seller's wallet directly, recording an already-completed payment. Admin only;
    /// the "credit happens once" invariant holds because the payment is born settled.
    pub async fn manual_credit(
        &self,
        seller_id: i64,
        amount: Money,
        reason: &str,
    ) -> Result<Payment, MarketGatewayError> {
        let payment = self.db.manual_credit(seller_id, amount, reason).await?;
        info!("💳️ Manual credit [{}] of {amount} applied to seller #{seller_id}", payment.transfer_ref);
        self.call_topup_completed_hook(&payment).await;
        Ok(payment)
    }

    /// Runs one reconciliation pass:
    /// 1. stale pending payments are expired,
    /// 2. the remaining pending payments are matched against the bank feed of their destination
    ///    account (reference in the memo AND exact local amount),
    /// 3. each match settles the payment and credits the wallet, exactly once.
    ///
    /// A feed failure for one bank account skips that account's payments until the next pass;
    /// it never aborts the rest of the pass.
    pub async fn run_reconciliation<F: BankFeed>(&self, feed: &F) -> Result<ReconciliationReport, MarketGatewayError> {
        let expired = self.db.expire_stale_topups().await?;
        for payment in &expired {
            info!("🏦️ Top-up [{}] for seller #{} expired unmatched", payment.transfer_ref, payment.seller_id);
        }
        let pending = self.db.fetch_pending_topups().await?;
        let mut report =
            ReconciliationReport { checked: pending.len(), completed: 0, expired: expired.len() };
        if pending.is_empty() {
            return Ok(report);
        }
        let mut by_account: BTreeMap<i64, Vec<Payment>> = BTreeMap::new();
        for payment in pending {
            match payment.bank_account_id {
                Some(id) => by_account.entry(id).or_default().push(payment),
                // Manual credits are born completed, so a pending payment always has a
                // destination. Leave it for the expiry reaper if one ever shows up.
                None => warn!("🏦️ Pending payment [{}] has no destination account", payment.transfer_ref),
            }
        }
        let accounts = join_all(by_account.keys().map(|id| self.db.fetch_bank_account(*id))).await;
        for (result, (account_id, payments)) in accounts.into_iter().zip(by_account) {
            let account = match result {
                Ok(Some(account)) => account,
                Ok(None) => {
                    error!("🏦️ Bank account #{account_id} vanished with {} payments pending on it", payments.len());
                    continue;
                },
                Err(e) => {
                    error!("🏦️ Could not load bank account #{account_id}: {e}");
                    continue;
                },
            };
            let transactions = match feed.fetch_transactions(&account).await {
                Ok(txs) => txs,
                Err(e) => {
                    warn!("🏦️ Bank feed for {account} unavailable, will retry next pass: {e}");
                    continue;
                },
            };
            trace!("🏦️ {} feed transactions for {account}", transactions.len());
            for payment in payments {
                let matched =
                    transactions.iter().any(|tx| tx.matches(&payment.transfer_ref, payment.local_amount));
                if !matched {
                    continue;
                }
                match self.db.settle_topup(&payment.transfer_ref).await {
                    Ok(Some(settled)) => {
                        info!(
                            "🏦️ Top-up [{}] settled. Seller #{} credited with {}",
                            settled.transfer_ref, settled.seller_id, settled.amount
                        );
                        report.completed += 1;
                        self.call_topup_completed_hook(&settled).await;
                    },
                    Ok(None) => {
                        debug!("🏦️ Top-up [{}] was already settled. No action to take", payment.transfer_ref);
                    },
                    Err(e) => {
                        error!("🏦️ Error settling top-up [{}]: {e}", payment.transfer_ref);
                    },
                }
            }
        }
        Ok(report)
    }

    async fn call_topup_completed_hook(&self, payment: &Payment) {
        for emitter in &self.producers.topup_completed_producer {
            trace!("💳️ Notifying top-up completed hook subscribers");
            let event = TopUpCompletedEvent::new(payment.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
