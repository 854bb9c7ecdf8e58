use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{DeliveryError, MarketError, StoreError};
use crate::messages;
use crate::models::{Alert, FiredMarker, Listing, UpdateId};
use crate::traits::{AlertStore, MarketSource, MarkerStore, Notifier};

/// What a single alert needs, judged against one market snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<'a> {
    /// Nothing on sale meets the quality floor.
    NoQualifyingListing,
    /// The best offer is still more expensive than the target.
    AboveTarget(&'a Listing),
    /// The best offer qualifies but is the event already notified.
    AlreadyNotified(&'a Listing),
    /// The best offer qualifies and has not been notified yet.
    Fresh(&'a Listing),
}

/// Cheapest listing meeting the alert's quality floor; equal prices prefer
/// the higher quality.
pub fn best_offer<'a>(alert: &Alert, listings: &'a [Listing]) -> Option<&'a Listing> {
    listings
        .iter()
        .filter(|listing| listing.price.is_finite() && alert.accepts_quality(listing.quality))
        .min_by(|a, b| {
            a.price
                .total_cmp(&b.price)
                .then_with(|| b.quality.cmp(&a.quality))
        })
}

pub fn decide<'a>(
    alert: &Alert,
    listings: &'a [Listing],
    last_fired: Option<&UpdateId>,
) -> Decision<'a> {
    let Some(best) = best_offer(alert, listings) else {
        return Decision::NoQualifyingListing;
    };
    if best.price > alert.target_price {
        return Decision::AboveTarget(best);
    }
    if last_fired == Some(&best.update_id()) {
        Decision::AlreadyNotified(best)
    } else {
        Decision::Fresh(best)
    }
}

/// Result of evaluating one alert in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    NoQualifyingListing,
    AboveTarget,
    AlreadyNotified,
    /// Fresh event held back by the optional cooldown.
    Throttled,
    Notified,
    /// Delivered, but the fired-marker could not be stored, so the same event
    /// may be sent again next cycle.
    NotifiedUnpersisted,
    DeliveryFailed,
    FetchFailed,
    StoreFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub alert_id: i64,
    pub state: AlertState,
}

impl CycleOutcome {
    pub fn notified(&self) -> bool {
        matches!(
            self.state,
            AlertState::Notified | AlertState::NotifiedUnpersisted
        )
    }
}

#[derive(Debug, Clone)]
pub struct EvaluatorSettings {
    pub fetch_timeout: Duration,
    pub send_timeout: Duration,
    /// Minimum time between two notifications of the same alert, on top of
    /// change detection. `None` disables it.
    pub cooldown: Option<Duration>,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(10),
            cooldown: None,
        }
    }
}

/// Periodic alert check: fetch, compare, notify, remember.
#[derive(Clone)]
pub struct AlertEvaluator {
    alerts: Arc<dyn AlertStore>,
    markers: Arc<dyn MarkerStore>,
    market: Arc<dyn MarketSource>,
    notifier: Arc<dyn Notifier>,
    settings: EvaluatorSettings,
    cycle_lock: Arc<Mutex<()>>,
}

type Snapshots = HashMap<i64, Result<Vec<Listing>, MarketError>>;

impl AlertEvaluator {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        markers: Arc<dyn MarkerStore>,
        market: Arc<dyn MarketSource>,
        notifier: Arc<dyn Notifier>,
        settings: EvaluatorSettings,
    ) -> Self {
        Self {
            alerts,
            markers,
            market,
            notifier,
            settings,
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs a cycle unless one is already in progress, in which case `None`.
    pub async fn try_run_cycle(&self) -> Result<Option<Vec<CycleOutcome>>, StoreError> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!("Previous alert check still running, skipping this one");
            return Ok(None);
        };
        self.evaluate_all().await.map(Some)
    }

    /// Runs a cycle, waiting for any cycle in progress to finish first.
    pub async fn run_cycle(&self) -> Result<Vec<CycleOutcome>, StoreError> {
        let _guard = self.cycle_lock.lock().await;
        self.evaluate_all().await
    }

    async fn evaluate_all(&self) -> Result<Vec<CycleOutcome>, StoreError> {
        info!("Starting alert check");
        let alerts = self.alerts.list_all().await?;
        if alerts.is_empty() {
            info!("No alerts to check");
            return Ok(Vec::new());
        }

        let snapshots = self.fetch_snapshots(&alerts).await;
        if snapshots.values().all(Result::is_err) {
            warn!("Market unreachable for every resource, retrying next cycle");
        }

        let mut outcomes = Vec::with_capacity(alerts.len());
        for alert in &alerts {
            let state = self.evaluate_alert(alert, &snapshots).await;
            outcomes.push(CycleOutcome {
                alert_id: alert.id,
                state,
            });
        }

        let notified = outcomes.iter().filter(|o| o.notified()).count();
        let unpersisted = outcomes
            .iter()
            .filter(|o| o.state == AlertState::NotifiedUnpersisted)
            .count();
        info!(
            alerts = outcomes.len(),
            notified, unpersisted, "Alert check completed"
        );
        Ok(outcomes)
    }

    /// One fetch per distinct resource, all in flight together.
    async fn fetch_snapshots(&self, alerts: &[Alert]) -> Snapshots {
        let resource_ids: BTreeSet<i64> = alerts.iter().map(|a| a.resource_id).collect();
        let fetches = resource_ids.into_iter().map(|resource_id| async move {
            let result = match timeout(
                self.settings.fetch_timeout,
                self.market.fetch_listings(resource_id),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(MarketError::Timeout),
            };
            (resource_id, result)
        });
        join_all(fetches).await.into_iter().collect()
    }

    async fn evaluate_alert(&self, alert: &Alert, snapshots: &Snapshots) -> AlertState {
        let listings = match snapshots.get(&alert.resource_id) {
            Some(Ok(listings)) => listings,
            Some(Err(e)) => {
                warn!(
                    alert_id = alert.id,
                    resource_id = alert.resource_id,
                    error = %e,
                    "Skipping alert, market data unavailable"
                );
                return AlertState::FetchFailed;
            }
            None => return AlertState::FetchFailed,
        };

        let key = alert.marker_key();
        let marker = match self.markers.get(&key).await {
            Ok(marker) => marker,
            Err(e) => {
                error!(marker = %key, error = %e, "Failed to read fired-marker");
                return AlertState::StoreFailed;
            }
        };

        let offer = match decide(alert, listings, marker.as_ref().map(|m| &m.update_id)) {
            Decision::NoQualifyingListing => return AlertState::NoQualifyingListing,
            Decision::AboveTarget(best) => {
                debug!(alert_id = alert.id, price = best.price, "Best offer above target");
                return AlertState::AboveTarget;
            }
            Decision::AlreadyNotified(best) => {
                debug!(alert_id = alert.id, update = %best.update_id(), "Offer already notified");
                return AlertState::AlreadyNotified;
            }
            Decision::Fresh(offer) => offer,
        };

        if self.in_cooldown(marker.as_ref()) {
            debug!(alert_id = alert.id, "Fresh offer held back by cooldown");
            return AlertState::Throttled;
        }

        let text = messages::notification(alert, offer);
        let delivery = match timeout(
            self.settings.send_timeout,
            self.notifier.send(&alert.owner, &text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout),
        };
        if let Err(e) = delivery {
            error!(
                alert_id = alert.id,
                owner = %alert.owner,
                error = %e,
                "Failed to deliver alert, will retry next cycle"
            );
            return AlertState::DeliveryFailed;
        }

        info!(
            alert_id = alert.id,
            owner = %alert.owner,
            resource_id = alert.resource_id,
            quality = offer.quality,
            price = offer.price,
            "Alert sent"
        );

        // Written only after a successful delivery, and only if the alert
        // was not deleted or re-targeted while the message was in flight.
        match self.markers.set_if_current(alert, &offer.update_id()).await {
            Ok(true) => AlertState::Notified,
            Ok(false) => {
                info!(alert_id = alert.id, "Alert changed during delivery, fired-marker skipped");
                AlertState::Notified
            }
            Err(e) => {
                error!(
                    alert_id = alert.id,
                    error = %e,
                    "Alert sent but fired-marker not persisted"
                );
                AlertState::NotifiedUnpersisted
            }
        }
    }

    fn in_cooldown(&self, marker: Option<&FiredMarker>) -> bool {
        let (Some(cooldown), Some(marker)) = (self.settings.cooldown, marker) else {
            return false;
        };
        (Utc::now() - marker.notified_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed < cooldown)
    }
}
