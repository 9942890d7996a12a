use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, MeasureType, SensorReading};
use crate::conversion::Conversion;
use crate::error::DomainError;

/// Inclusive bounds a converted value must fall into to be trusted
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl ValidRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Binds a hardware channel to the measure it produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorBinding {
    pub channel: ChannelId,
    pub measure: MeasureType,
    #[serde(default)]
    pub range: ValidRange,
    #[serde(default)]
    pub conversion: Option<Conversion>,
}

impl SensorBinding {
    pub fn new(channel: ChannelId, measure: MeasureType) -> Self {
        Self {
            channel,
            measure,
            range: ValidRange::default(),
            conversion: None,
        }
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.range = ValidRange::new(min, max);
        self
    }

    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// Turn the outcome of a hardware read into a reading.
    ///
    /// Failures never escape: a failed read, a failed conversion or an
    /// out-of-range value yields an invalid reading plus the reason.
    pub fn to_reading(
        &self,
        raw: Result<f64, DomainError>,
        timestamp: DateTime<Utc>,
    ) -> (SensorReading, Option<DomainError>) {
        let converted = raw.and_then(|value| match &self.conversion {
            Some(conversion) => conversion.apply(value),
            None => Ok(value),
        });

        match converted {
            Ok(value) if value.is_finite() && self.range.contains(value) => (
                SensorReading::valid(self.channel.clone(), self.measure, value, timestamp),
                None,
            ),
            Ok(value) => (
                SensorReading::invalid(self.channel.clone(), self.measure, value, timestamp),
                Some(DomainError::SensorInvalid {
                    channel: self.channel.to_string(),
                    reason: format!("value {value} outside valid range"),
                }),
            ),
            Err(e) => (
                SensorReading::invalid(self.channel.clone(), self.measure, f64::NAN, timestamp),
                Some(DomainError::SensorInvalid {
                    channel: self.channel.to_string(),
                    reason: e.to_string(),
                }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hot_water() -> SensorBinding {
        SensorBinding::new(
            ChannelId::new("ntc-hot").unwrap(),
            MeasureType::HotWaterTemperature,
        )
        .with_range(Some(5.0), Some(100.0))
    }

    #[test]
    fn test_range_contains() {
        let range = ValidRange::new(Some(0.0), None);
        assert!(range.contains(0.0));
        assert!(range.contains(1e9));
        assert!(!range.contains(-0.1));
        assert!(ValidRange::default().contains(-273.0));
    }

    #[test]
    fn test_in_range_reading_is_valid() {
        let (reading, error) = hot_water().to_reading(Ok(55.0), Utc::now());
        assert!(reading.is_valid());
        assert!(error.is_none());
    }

    #[test]
    fn test_out_of_range_reading_is_invalid() {
        let (reading, error) = hot_water().to_reading(Ok(120.0), Utc::now());
        assert!(!reading.is_valid());
        assert!(matches!(error, Some(DomainError::SensorInvalid { .. })));
    }

    #[test]
    fn test_failed_read_is_invalid() {
        let (reading, error) = hot_water().to_reading(
            Err(DomainError::HardwareError("i2c nack".to_string())),
            Utc::now(),
        );
        assert!(!reading.is_valid());
        match error {
            Some(DomainError::SensorInvalid { channel, reason }) => {
                assert_eq!(channel, "ntc-hot");
                assert!(reason.contains("i2c nack"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
