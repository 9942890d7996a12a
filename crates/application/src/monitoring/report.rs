use std::collections::BTreeMap;

use domain::{MeasureType, SensorReading};

/// Running per-measure averages of the valid readings seen in one report interval
#[derive(Debug, Default)]
pub struct DetectionAccumulator {
    sums: BTreeMap<MeasureType, (f64, u32)>,
    samples: usize,
}

/// Averages collected over a closed interval
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSummary {
    pub samples: usize,
    pub averages: BTreeMap<MeasureType, f64>,
}

impl DetectionAccumulator {
    pub fn record(&mut self, reading: &SensorReading) {
        if !reading.is_valid() {
            return;
        }
        let entry = self.sums.entry(reading.measure()).or_insert((0.0, 0));
        entry.0 += reading.value();
        entry.1 += 1;
        self.samples += 1;
    }

    /// Close the interval. `None` when nothing valid was recorded.
    pub fn take(&mut self) -> Option<DetectionSummary> {
        if self.samples == 0 {
            return None;
        }
        let sums = std::mem::take(&mut self.sums);
        let samples = std::mem::take(&mut self.samples);

        let averages = sums
            .into_iter()
            .map(|(measure, (sum, count))| (measure, sum / f64::from(count)))
            .collect();
        Some(DetectionSummary { samples, averages })
    }
}
