//! Data models for alerts, market listings and fired-markers

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest quality grade the market exposes.
pub const MIN_QUALITY: i64 = 0;
/// Highest quality grade the market exposes.
pub const MAX_QUALITY: i64 = 12;

/// A stored request to be notified when a resource drops to or below a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    /// Chat that owns the alert and receives its notifications.
    pub owner: String,
    pub resource_id: i64,
    /// `None` accepts any quality.
    pub quality_floor: Option<i64>,
    pub target_price: f64,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// User-given label, or a placeholder derived from the id.
    pub fn display_label(&self) -> Cow<'_, str> {
        match &self.label {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(format!("Alert #{}", self.id)),
        }
    }

    /// Whether a listing of `quality` satisfies the quality floor.
    pub fn accepts_quality(&self, quality: i64) -> bool {
        self.quality_floor.is_none_or(|floor| quality >= floor)
    }

    pub fn marker_key(&self) -> MarkerKey {
        MarkerKey {
            owner: self.owner.clone(),
            alert_id: self.id,
        }
    }
}

/// An alert that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub owner: String,
    pub resource_id: i64,
    pub quality_floor: Option<i64>,
    pub target_price: f64,
    pub label: Option<String>,
}

impl NewAlert {
    /// Checks every field invariant; nothing is clamped.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_resource_id(self.resource_id)?;
        validate_target_price(self.target_price)?;
        if let Some(quality) = self.quality_floor {
            validate_quality(quality)?;
        }
        if let Some(label) = &self.label {
            validate_label(label)?;
        }
        Ok(())
    }
}

/// A single-field change to an existing alert.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEdit {
    TargetPrice(f64),
    QualityFloor(Option<i64>),
    Label(Option<String>),
}

impl AlertEdit {
    /// Parses a `field value` pair as typed by a user.
    ///
    /// Accepted fields are `price`, `quality` and `label` (plus the aliases
    /// `target` and `name`). `quality any` clears the floor and `label -`
    /// resets the label to its placeholder.
    pub fn parse(field: &str, value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        let edit = match field.to_ascii_lowercase().as_str() {
            "price" | "target" => {
                let price = value.parse::<f64>().map_err(|_| ValidationError::InvalidNumber {
                    field: "price",
                    value: value.to_string(),
                })?;
                Self::TargetPrice(price)
            }
            "quality" => {
                if value.eq_ignore_ascii_case("any") || value.eq_ignore_ascii_case("none") {
                    Self::QualityFloor(None)
                } else {
                    let quality = value.parse::<i64>().map_err(|_| ValidationError::InvalidNumber {
                        field: "quality",
                        value: value.to_string(),
                    })?;
                    Self::QualityFloor(Some(quality))
                }
            }
            "label" | "name" => {
                if value == "-" {
                    Self::Label(None)
                } else {
                    Self::Label(Some(value.to_string()))
                }
            }
            other => return Err(ValidationError::UnknownField(other.to_string())),
        };
        edit.validate()?;
        Ok(edit)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::TargetPrice(price) => validate_target_price(*price),
            Self::QualityFloor(Some(quality)) => validate_quality(*quality),
            Self::QualityFloor(None) | Self::Label(None) => Ok(()),
            Self::Label(Some(label)) => validate_label(label),
        }
    }

    /// Price and quality edits change the alert's condition, so the last
    /// fired event no longer describes it.
    pub fn changes_condition(&self) -> bool {
        !matches!(self, Self::Label(_))
    }

    pub fn apply(self, alert: &mut Alert) {
        match self {
            Self::TargetPrice(price) => alert.target_price = price,
            Self::QualityFloor(quality) => alert.quality_floor = quality,
            Self::Label(label) => alert.label = label,
        }
    }
}

fn validate_resource_id(resource_id: i64) -> Result<(), ValidationError> {
    if resource_id < 0 {
        return Err(ValidationError::NegativeResource(resource_id));
    }
    Ok(())
}

fn validate_target_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError::NonPositivePrice(price));
    }
    Ok(())
}

fn validate_quality(quality: i64) -> Result<(), ValidationError> {
    if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(ValidationError::QualityOutOfRange(quality));
    }
    Ok(())
}

fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.trim().is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    Ok(())
}

/// One sell offer on the market.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub quality: i64,
    pub price: f64,
    pub quantity: Option<i64>,
    pub seller: Option<String>,
    /// Market timestamp of the offer, as reported by the provider.
    pub posted_at: String,
}

impl Listing {
    /// Identifier that changes whenever the offer is re-posted or re-priced.
    pub fn update_id(&self) -> UpdateId {
        UpdateId(format!("{}@{}", self.posted_at, self.price))
    }
}

/// Latest price of one resource at one quality.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub resource_id: i64,
    pub quality: i64,
    pub price: f64,
    pub updated_at: Option<String>,
}

/// Opaque market update identifier stored in a fired-marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateId(pub String);

impl UpdateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite key of the fired-marker table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerKey {
    pub owner: String,
    pub alert_id: i64,
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.alert_id)
    }
}

/// Last market update that produced a notification for an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredMarker {
    pub update_id: UpdateId,
    pub notified_at: DateTime<Utc>,
}
