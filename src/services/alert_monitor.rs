use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};

use crate::error::{QuoteError, StorageError};
use crate::models::Subscription;
use crate::{AppState, templates};

/// Counters for one sweep over the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub subscriptions: usize,
    pub assets_quoted: usize,
    pub quote_failures: usize,
    pub fired: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
}

pub fn spawn_price_alert_monitor(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(state.settings.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            every_secs = state.settings.check_interval.as_secs(),
            "alert monitor started"
        );

        loop {
            interval.tick().await;

            match run_tick(&state).await {
                Ok(report) => {
                    if report.subscriptions > 0 {
                        tracing::info!(
                            subscriptions = report.subscriptions,
                            assets = report.assets_quoted,
                            quote_failures = report.quote_failures,
                            fired = report.fired,
                            delivery_failures = report.delivery_failures,
                            "alert tick finished"
                        );
                    }
                    *state.last_tick.write().await = Some(report);
                }
                Err(e) => {
                    tracing::error!(error = %e, "alert tick skipped: cannot list subscriptions");
                }
            }
        }
    })
}

/// One evaluation sweep.
///
/// Fails only when the subscriptions cannot be listed; in that case nothing
/// was evaluated. Quote and delivery failures are contained per asset and
/// per subscription and only show up in the report.
pub async fn run_tick(state: &AppState) -> Result<TickReport, StorageError> {
    let mut report = TickReport {
        started_at: Utc::now(),
        ..TickReport::default()
    };

    let subs = state.store.list_all().await?;
    report.subscriptions = subs.len();

    // Group by asset => one quote per asset per tick
    let mut by_asset: HashMap<String, Vec<Subscription>> = HashMap::new();
    for s in subs {
        by_asset.entry(s.asset().to_string()).or_default().push(s);
    }

    if by_asset.is_empty() {
        return Ok(report);
    }

    let quotes = join_all(by_asset.keys().map(|asset| async move {
        let price = quote_with_timeout(state, asset).await;
        (asset.clone(), price)
    }))
    .await;
    report.assets_quoted = quotes.len();

    for (asset, price) in quotes {
        let price = match price {
            Ok(p) => p,
            Err(e) => {
                // keep the asset's subscriptions, retry next tick
                tracing::warn!(asset = %asset, error = %e, "quote failed, skipping asset this tick");
                report.quote_failures += 1;
                continue;
            }
        };

        let Some(group) = by_asset.get(&asset) else {
            continue;
        };

        for sub in group.iter().filter(|s| s.is_triggered(price)) {
            report.fired += 1;

            if notify_and_remove(state, sub, price).await {
                report.delivered += 1;
            } else {
                report.delivery_failures += 1;
            }
        }
    }

    Ok(report)
}

async fn quote_with_timeout(state: &AppState, asset: &str) -> Result<f64, QuoteError> {
    let price = time::timeout(state.settings.quote_timeout, state.prices.quote(asset))
        .await
        .map_err(|_| QuoteError::Timeout)??;

    if !price.is_finite() || price <= 0.0 {
        return Err(QuoteError::Malformed(format!("bad price {price}")));
    }

    Ok(price)
}

/// Sends the notification and deletes the subscription only once the
/// transport confirmed delivery. Returns whether delivery succeeded.
async fn notify_and_remove(state: &AppState, sub: &Subscription, price: f64) -> bool {
    let text = templates::alert_fired(&state.hbs, sub, price);

    if let Err(e) = state.transport.send(sub.recipient(), &text).await {
        tracing::warn!(
            recipient = sub.recipient(),
            asset = %sub.asset(),
            error = %e,
            "alert delivery failed, will retry next tick"
        );
        return false;
    }

    tracing::info!(
        recipient = sub.recipient(),
        asset = %sub.asset(),
        threshold = sub.threshold(),
        price,
        "alert sent"
    );

    match state.store.remove_exact(sub).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!(
            recipient = sub.recipient(),
            asset = %sub.asset(),
            "subscription already gone or replaced, left as is"
        ),
        Err(e) => tracing::error!(
            recipient = sub.recipient(),
            asset = %sub.asset(),
            error = %e,
            "failed to delete fired alert"
        ),
    }

    true
}
