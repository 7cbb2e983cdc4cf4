use std::time::Duration;

use log::*;

use crate::{
    api::topup_api::TopUpApi,
    events::EventProducers,
    traits::{BankAccountManagement, BankFeed, MarketGatewayDatabase},
};

/// How often the worker polls the bank feed by default. Expiry enforcement latency is bounded
/// by this period.
pub const DEFAULT_RECONCILIATION_PERIOD: Duration = Duration::from_secs(60);

/// Runs the reconciliation worker until its task is dropped or aborted. Spawn this onto your
/// runtime; it never returns on its own.
///
/// Each tick runs one [`TopUpApi::run_reconciliation`] pass: stale invoices are expired and
/// pending ones are matched against the bank feed and credited. A failed pass is logged and
/// retried on the next tick.
pub async fn run_reconciliation_worker<B, F>(db: B, feed: F, producers: EventProducers, period: Duration)
where
    B: MarketGatewayDatabase + BankAccountManagement,
    F: BankFeed,
{
    let mut timer = tokio::time::interval(period);
    let api = TopUpApi::new(db, producers);
    info!("🏦️ Bank reconciliation worker started (period {}s)", period.as_secs());
    loop {
        timer.tick().await;
        trace!("🏦️ Running reconciliation pass");
        match api.run_reconciliation(&feed).await {
            Ok(report) => {
                if report.checked + report.expired > 0 {
                    info!("🏦️ Reconciliation pass complete: {report}");
                }
            },
            Err(e) => {
                error!("🏦️ Error running reconciliation pass: {e}");
            },
        }
    }
}
