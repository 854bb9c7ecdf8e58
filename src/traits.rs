//! Traits at the seams between the alert evaluator and its collaborators

use async_trait::async_trait;

use crate::error::{DeleteRejection, DeliveryError, MarketError, StoreError};
use crate::models::{Alert, AlertEdit, FiredMarker, Listing, MarkerKey, NewAlert, PriceSummary, UpdateId};

/// Largest number of ids a single batch delete will process.
pub const DELETE_BATCH_LIMIT: usize = 5;

/// Outcome of a batch delete, reported per id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteReport {
    pub deleted: Vec<i64>,
    pub rejected: Vec<(i64, DeleteRejection)>,
}

/// Durable set of alert definitions.
///
/// Every mutating call commits before it returns and removes the fired-markers
/// of any alert it deletes.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Alert>, StoreError>;

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Alert>, StoreError>;

    /// Validates and stores a new alert, assigning the smallest free id.
    async fn insert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    /// Applies `edit` to alert `id`.
    ///
    /// # Errors
    /// * `NotFound` if `owner` does not own the alert and `elevated` is false
    /// * `Validation` if the new value breaks an invariant
    async fn update(
        &self,
        id: i64,
        owner: &str,
        elevated: bool,
        edit: AlertEdit,
    ) -> Result<Alert, StoreError>;

    /// Deletes up to [`DELETE_BATCH_LIMIT`] alerts, reporting each id.
    async fn delete_many(
        &self,
        ids: &[i64],
        requester: &str,
        elevated: bool,
    ) -> Result<DeleteReport, StoreError>;

    async fn delete_all_for_owner(&self, owner: &str) -> Result<u64, StoreError>;

    /// Wipes the whole store. Requires `elevated`.
    async fn delete_all(&self, elevated: bool) -> Result<u64, StoreError>;
}

/// Per-alert record of the last market update that was notified.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn get(&self, key: &MarkerKey) -> Result<Option<FiredMarker>, StoreError>;

    async fn set(&self, key: &MarkerKey, update_id: &UpdateId) -> Result<(), StoreError>;

    /// Records `update_id` for `alert` only while the alert still exists with
    /// the owner and condition it was evaluated under. Returns `false` when
    /// the alert was deleted or its condition edited in the meantime.
    async fn set_if_current(&self, alert: &Alert, update_id: &UpdateId) -> Result<bool, StoreError>;

    async fn delete(&self, key: &MarkerKey) -> Result<(), StoreError>;

    async fn delete_all_for_owner(&self, owner: &str) -> Result<u64, StoreError>;

    async fn delete_all_for_alert_ids(&self, ids: &[i64]) -> Result<u64, StoreError>;
}

/// Read access to the market.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Current sell offers for one resource, in no particular order.
    async fn fetch_listings(&self, resource_id: i64) -> Result<Vec<Listing>, MarketError>;

    /// Latest price of every resource and quality.
    async fn fetch_all_prices(&self) -> Result<Vec<PriceSummary>, MarketError>;
}

/// Delivers text to an alert owner.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError>;
}
