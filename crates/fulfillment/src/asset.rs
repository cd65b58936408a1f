use serde::{Deserialize, Serialize};

use rentflow_core::{AssetId, Entity};

/// How units of an asset are counted during scanning.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingMethod {
    /// Every unit carries its own code and is scanned separately.
    Individual,
    /// One code for a pool of identical units; scans carry a count.
    Batch,
}

impl TrackingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMethod::Individual => "INDIVIDUAL",
            TrackingMethod::Batch => "BATCH",
        }
    }
}

/// Physical condition grade.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    /// Ready for hire.
    Green,
    /// Usable, flagged for attention.
    Orange,
    /// Needs repair; the asset is under maintenance.
    Red,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Green => "GREEN",
            Condition::Orange => "ORANGE",
            Condition::Red => "RED",
        }
    }
}

impl core::fmt::Display for Condition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display flag derived from availability; never stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    Available,
    Booked,
    Out,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub qr_code: String,
    pub total_quantity: u32,
    pub tracking_method: TrackingMethod,
    pub condition: Condition,
    /// Expected refurbishment time while the asset is not GREEN.
    pub refurb_days_estimate: Option<u32>,
}

impl Entity for Asset {
    type Id = AssetId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Asset {
    pub fn new(
        name: impl Into<String>,
        qr_code: impl Into<String>,
        total_quantity: u32,
        tracking_method: TrackingMethod,
    ) -> Self {
        Self {
            id: AssetId::new(),
            name: name.into(),
            qr_code: qr_code.into(),
            total_quantity,
            tracking_method,
            condition: Condition::Green,
            refurb_days_estimate: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn is_under_maintenance(&self) -> bool {
        self.condition == Condition::Red
    }

    /// Apply a condition reported on return.
    ///
    /// Going back to GREEN clears the refurbishment estimate.
    pub fn apply_condition(&mut self, condition: Condition) {
        self.condition = condition;
        if condition == Condition::Green {
            self.refurb_days_estimate = None;
        }
    }
}
