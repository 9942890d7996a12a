use serde::{Deserialize, Serialize};

use crate::channel::MeasureType;
use crate::error::{DomainError, Result};
use crate::room::{Band, RoomState};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[serde(alias = "==")]
    Equal,
    #[serde(alias = "!=")]
    NotEqual,
    #[serde(alias = "<")]
    Less,
    #[serde(alias = "<=")]
    LessOrEqual,
    #[serde(alias = ">")]
    Greater,
    #[serde(alias = ">=")]
    GreaterOrEqual,
}

impl Operator {
    pub fn compare(&self, actual: f64, expected: f64) -> bool {
        match self {
            Self::Equal => (actual - expected).abs() < f64::EPSILON,
            Self::NotEqual => (actual - expected).abs() >= f64::EPSILON,
            Self::Less => actual < expected,
            Self::LessOrEqual => actual <= expected,
            Self::Greater => actual > expected,
            Self::GreaterOrEqual => actual >= expected,
        }
    }
}

/// Room-state condition attached to a policy rule.
///
/// Evaluation is three-valued: `None` means the state does not hold the
/// data the predicate needs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatePredicate {
    #[default]
    Always,
    Occupancy {
        operator: Operator,
        value: f64,
    },
    Measure {
        measure: MeasureType,
        operator: Operator,
        value: f64,
    },
    InBand {
        measure: MeasureType,
        band: Band,
    },
    All {
        predicates: Vec<StatePredicate>,
    },
    Any {
        predicates: Vec<StatePredicate>,
    },
    Not {
        predicate: Box<StatePredicate>,
    },
}

impl StatePredicate {
    pub fn eval(&self, state: &RoomState) -> Option<bool> {
        match self {
            Self::Always => Some(true),
            Self::Occupancy { operator, value } => state
                .occupancy()
                .map(|occupancy| operator.compare(f64::from(occupancy), *value)),
            Self::Measure {
                measure,
                operator,
                value,
            } => state
                .measure(*measure)
                .map(|actual| operator.compare(actual, *value)),
            Self::InBand { measure, band } => state.band(*measure).map(|actual| actual == *band),
            Self::All { predicates } => {
                let mut unknown = false;
                for predicate in predicates {
                    match predicate.eval(state) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown { None } else { Some(true) }
            }
            Self::Any { predicates } => {
                let mut unknown = false;
                for predicate in predicates {
                    match predicate.eval(state) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown { None } else { Some(false) }
            }
            Self::Not { predicate } => predicate.eval(state).map(|v| !v),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Always | Self::InBand { .. } => Ok(()),
            Self::Occupancy { value, .. } | Self::Measure { value, .. } => {
                if value.is_finite() {
                    Ok(())
                } else {
                    Err(DomainError::InvalidPolicy(format!(
                        "predicate threshold {value} is not a finite number"
                    )))
                }
            }
            Self::All { predicates } | Self::Any { predicates } => {
                predicates.iter().try_for_each(StatePredicate::validate)
            }
            Self::Not { predicate } => predicate.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn occupancy_below(n: f64) -> StatePredicate {
        StatePredicate::Occupancy {
            operator: Operator::Less,
            value: n,
        }
    }

    #[test]
    fn test_occupancy_predicate() {
        let state = RoomState::observed(Utc::now()).with_occupancy(2);
        assert_eq!(occupancy_below(5.0).eval(&state), Some(true));
        let state = state.with_occupancy(10);
        assert_eq!(occupancy_below(5.0).eval(&state), Some(false));
    }

    #[test]
    fn test_missing_data_is_unknown() {
        let state = RoomState::observed(Utc::now());
        assert_eq!(occupancy_below(5.0).eval(&state), None);
        assert_eq!(StatePredicate::Always.eval(&state), Some(true));
    }

    #[test]
    fn test_three_valued_combinators() {
        let state = RoomState::observed(Utc::now()).with_occupancy(2);
        let unknown = StatePredicate::Measure {
            measure: MeasureType::Humidity,
            operator: Operator::Less,
            value: 60.0,
        };
        let falsy = StatePredicate::Not {
            predicate: Box::new(StatePredicate::Always),
        };

        let all = StatePredicate::All {
            predicates: vec![unknown.clone(), falsy.clone()],
        };
        assert_eq!(all.eval(&state), Some(false));

        let all = StatePredicate::All {
            predicates: vec![unknown.clone(), occupancy_below(5.0)],
        };
        assert_eq!(all.eval(&state), None);

        let any = StatePredicate::Any {
            predicates: vec![unknown.clone(), occupancy_below(5.0)],
        };
        assert_eq!(any.eval(&state), Some(true));

        let any = StatePredicate::Any {
            predicates: vec![unknown, falsy],
        };
        assert_eq!(any.eval(&state), None);
    }

    #[test]
    fn test_in_band() {
        let state = RoomState::observed(Utc::now())
            .with_band(MeasureType::RoomTemperature, Band::Comfortable);
        let predicate = StatePredicate::InBand {
            measure: MeasureType::RoomTemperature,
            band: Band::High,
        };
        assert_eq!(predicate.eval(&state), Some(false));
    }

    #[test]
    fn test_deserialize_tree() {
        let predicate: StatePredicate = serde_json::from_value(json!({
            "type": "all",
            "predicates": [
                {"type": "occupancy", "operator": "<", "value": 5},
                {"type": "not", "predicate": {"type": "in_band", "measure": "humidity", "band": "high"}}
            ]
        }))
        .unwrap();
        assert!(matches!(predicate, StatePredicate::All { ref predicates } if predicates.len() == 2));
        assert!(predicate.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let predicate = StatePredicate::Any {
            predicates: vec![occupancy_below(f64::NAN)],
        };
        assert!(predicate.validate().is_err());
    }
}
