//! SimcoTools market price client

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::MarketError;
use crate::models::{Listing, PriceSummary};
use crate::traits::MarketSource;

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    prices: Vec<PriceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceEntry {
    resource_id: i64,
    quality: i64,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    datetime: Option<String>,
    #[serde(default)]
    sell_offers: Vec<SellOffer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SellOffer {
    price: f64,
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    seller: Option<serde_json::Value>,
    #[serde(default)]
    created_at: Option<String>,
}

impl SellOffer {
    /// The API has sent the seller both as a plain name and as an object.
    fn seller_name(&self) -> Option<String> {
        match self.seller.as_ref()? {
            serde_json::Value::String(name) => Some(name.clone()),
            serde_json::Value::Object(fields) => fields
                .get("company")
                .or_else(|| fields.get("name"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

impl PriceEntry {
    fn listings(&self) -> Vec<Listing> {
        if self.sell_offers.is_empty() {
            return match (self.price, &self.datetime) {
                (Some(price), Some(datetime)) => vec![Listing {
                    quality: self.quality,
                    price,
                    quantity: None,
                    seller: None,
                    posted_at: datetime.clone(),
                }],
                _ => Vec::new(),
            };
        }

        self.sell_offers
            .iter()
            .map(|offer| Listing {
                quality: self.quality,
                price: offer.price,
                quantity: offer.quantity,
                seller: offer.seller_name(),
                posted_at: offer
                    .created_at
                    .clone()
                    .or_else(|| self.datetime.clone())
                    .unwrap_or_default(),
            })
            .collect()
    }

    fn summary(&self) -> Option<PriceSummary> {
        let price = self
            .price
            .or_else(|| self.sell_offers.iter().map(|o| o.price).reduce(f64::min))?;
        Some(PriceSummary {
            resource_id: self.resource_id,
            quality: self.quality,
            price,
            updated_at: self.datetime.clone(),
        })
    }
}

struct Snapshot {
    fetched_at: Instant,
    entries: Arc<Vec<PriceEntry>>,
}

/// Client for the SimcoTools realm price endpoint.
///
/// The endpoint always returns the whole market, so one response is reused
/// for `snapshot_ttl`; concurrent callers wait for the same refresh.
#[derive(Clone)]
pub struct SimcoToolsClient {
    client: Client,
    prices_url: String,
    snapshot_ttl: Duration,
    snapshot: Arc<Mutex<Option<Snapshot>>>,
}

impl SimcoToolsClient {
    pub fn new(
        prices_url: impl Into<String>,
        timeout: Duration,
        snapshot_ttl: Duration,
    ) -> Result<Self, MarketError> {
        let client = Client::builder()
            .user_agent(concat!("simco-alert-bot/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            prices_url: prices_url.into(),
            snapshot_ttl,
            snapshot: Arc::new(Mutex::new(None)),
        })
    }

    async fn entries(&self) -> Result<Arc<Vec<PriceEntry>>, MarketError> {
        let mut snapshot = self.snapshot.lock().await;

        if let Some(cached) = snapshot.as_ref()
            && cached.fetched_at.elapsed() < self.snapshot_ttl
        {
            return Ok(Arc::clone(&cached.entries));
        }

        debug!("Fetching market prices from {}", self.prices_url);
        let response = self.client.get(&self.prices_url).send().await?;

        if !response.status().is_success() {
            return Err(MarketError::Status(response.status()));
        }

        let body: PricesResponse = response.json().await?;
        info!("Fetched {} market price entries", body.prices.len());

        let entries = Arc::new(body.prices);
        *snapshot = Some(Snapshot {
            fetched_at: Instant::now(),
            entries: Arc::clone(&entries),
        });
        Ok(entries)
    }
}

#[async_trait]
impl MarketSource for SimcoToolsClient {
    async fn fetch_listings(&self, resource_id: i64) -> Result<Vec<Listing>, MarketError> {
        let entries = self.entries().await?;
        Ok(entries
            .iter()
            .filter(|entry| entry.resource_id == resource_id)
            .flat_map(PriceEntry::listings)
            .collect())
    }

    async fn fetch_all_prices(&self) -> Result<Vec<PriceSummary>, MarketError> {
        let entries = self.entries().await?;
        Ok(entries.iter().filter_map(PriceEntry::summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "prices": [
            {
                "resourceId": 1,
                "quality": 0,
                "price": 0.31,
                "datetime": "2025-06-01T10:00:00Z",
                "sellOffers": [
                    {"price": 0.31, "quantity": 1200, "seller": {"company": "Lumber Co"}, "createdAt": "2025-06-01T09:58:00Z"},
                    {"price": 0.33, "quantity": 50, "seller": "Woodworks", "createdAt": "2025-06-01T09:40:00Z"}
                ]
            },
            {
                "resourceId": 1,
                "quality": 2,
                "price": 0.40,
                "datetime": "2025-06-01T10:01:00Z"
            },
            {
                "resourceId": 7,
                "quality": 1,
                "sellOffers": [{"price": 12.5}]
            }
        ]
    }"#;

    fn entries() -> Vec<PriceEntry> {
        serde_json::from_str::<PricesResponse>(SAMPLE).unwrap().prices
    }

    #[test]
    fn test_sell_offers_become_listings() {
        let entries = entries();
        let listings = entries[0].listings();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].quality, 0);
        assert_eq!(listings[0].quantity, Some(1200));
        assert_eq!(listings[0].seller.as_deref(), Some("Lumber Co"));
        assert_eq!(listings[0].posted_at, "2025-06-01T09:58:00Z");
        assert_eq!(listings[1].seller.as_deref(), Some("Woodworks"));
    }

    #[test]
    fn test_entry_without_offers_uses_latest_price() {
        let entries = entries();
        let listings = entries[1].listings();

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].price, 0.40);
        assert_eq!(listings[0].posted_at, "2025-06-01T10:01:00Z");
        assert_eq!(listings[0].quantity, None);
    }

    #[test]
    fn test_summary_falls_back_to_cheapest_offer() {
        let entries = entries();
        let summaries: Vec<PriceSummary> = entries.iter().filter_map(PriceEntry::summary).collect();

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[2].resource_id, 7);
        assert_eq!(summaries[2].price, 12.5);
        assert_eq!(summaries[2].updated_at, None);
    }

    #[test]
    fn test_missing_prices_key_is_empty() {
        let body: PricesResponse = serde_json::from_str("{}").unwrap();
        assert!(body.prices.is_empty());
    }
}
