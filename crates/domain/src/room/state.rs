use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Band;
use crate::channel::MeasureType;

/// Aggregated view of a room, produced by the monitoring engine.
///
/// Values are immutable once published: the engine derives a new state
/// through the `with_*` builders and publishes it as a fresh snapshot.
/// `last_updated` never moves backwards between consecutive states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    occupancy: Option<u32>,
    measures: BTreeMap<MeasureType, f64>,
    bands: BTreeMap<MeasureType, Band>,
    last_updated: Option<DateTime<Utc>>,
    confidence: f64,
    stale: bool,
    version: u64,
}

impl RoomState {
    /// State before the first valid poll. Nothing is known, so it is stale.
    pub fn initial() -> Self {
        Self {
            occupancy: None,
            measures: BTreeMap::new(),
            bands: BTreeMap::new(),
            last_updated: None,
            confidence: 0.0,
            stale: true,
            version: 0,
        }
    }

    /// A fresh, fully trusted state observed at `last_updated`
    pub fn observed(last_updated: DateTime<Utc>) -> Self {
        Self {
            last_updated: Some(last_updated),
            confidence: 1.0,
            stale: false,
            ..Self::initial()
        }
    }

    pub fn with_occupancy(mut self, occupancy: u32) -> Self {
        self.occupancy = Some(occupancy);
        self
    }

    pub fn with_measure(mut self, measure: MeasureType, value: f64) -> Self {
        if measure == MeasureType::Occupancy {
            self.occupancy = Some(value.max(0.0).round() as u32);
        } else {
            self.measures.insert(measure, value);
        }
        self
    }

    pub fn with_band(mut self, measure: MeasureType, band: Band) -> Self {
        self.bands.insert(measure, band);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Same values, flagged as no longer trustworthy
    pub fn into_stale(mut self) -> Self {
        self.stale = true;
        self
    }

    pub fn occupancy(&self) -> Option<u32> {
        self.occupancy
    }

    pub fn measure(&self, measure: MeasureType) -> Option<f64> {
        match measure {
            MeasureType::Occupancy => self.occupancy.map(f64::from),
            other => self.measures.get(&other).copied(),
        }
    }

    pub fn measures(&self) -> &BTreeMap<MeasureType, f64> {
        &self.measures
    }

    pub fn band(&self, measure: MeasureType) -> Option<Band> {
        self.bands.get(&measure).copied()
    }

    pub fn bands(&self) -> &BTreeMap<MeasureType, Band> {
        &self.bands
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Snapshot version, bumped by the writer on every publish
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether `next` may follow this state without rolling time back
    pub fn precedes(&self, next: &RoomState) -> bool {
        match (self.last_updated, next.last_updated) {
            (Some(current), Some(next)) => next >= current,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::initial()
    }
}
