use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Chat id of the notification target.
pub type Recipient = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            other => Err(ValidationError::InvalidDirection(other.to_string())),
        }
    }
}

/// A one-shot price threshold subscription, keyed by `(recipient, asset)`.
///
/// Stored as `{recipient, asset, threshold, direction}`. Fields are private:
/// outside of deserializing stored rows, `new` is the only way to build one,
/// so the asset is always upper-case and the threshold finite and positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    recipient: Recipient,
    asset: String,
    threshold: f64,
    direction: Direction,
}

impl Subscription {
    /// Builds a subscription, upper-casing the ticker and rejecting
    /// non-finite or non-positive thresholds.
    pub fn new(
        recipient: Recipient,
        asset: &str,
        threshold: f64,
        direction: Direction,
    ) -> Result<Self, ValidationError> {
        let asset = normalize_asset(asset);
        if asset.is_empty() {
            return Err(ValidationError::MissingArgument("ticker"));
        }
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ValidationError::InvalidThreshold(threshold.to_string()));
        }

        Ok(Self {
            recipient,
            asset,
            threshold,
            direction,
        })
    }

    pub fn recipient(&self) -> Recipient {
        self.recipient
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Inclusive on both sides: a price exactly at the threshold fires.
    pub fn is_triggered(&self, price: f64) -> bool {
        match self.direction {
            Direction::Above => price >= self.threshold,
            Direction::Below => price <= self.threshold,
        }
    }
}

pub fn normalize_asset(asset: &str) -> String {
    asset.trim().to_uppercase()
}
