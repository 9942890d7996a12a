use serde::{Deserialize, Serialize};

/// Where an environmental value sits relative to its comfort range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Low,
    Comfortable,
    High,
}

/// Inclusive comfort range for one measure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComfortRange {
    pub low: f64,
    pub high: f64,
}

impl ComfortRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn classify(&self, value: f64) -> Band {
        if value < self.low {
            Band::Low
        } else if value > self.high {
            Band::High
        } else {
            Band::Comfortable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let range = ComfortRange::new(20.0, 24.0);
        assert_eq!(range.classify(18.5), Band::Low);
        assert_eq!(range.classify(20.0), Band::Comfortable);
        assert_eq!(range.classify(24.0), Band::Comfortable);
        assert_eq!(range.classify(26.0), Band::High);
    }
}
