//! Analog front-end conversions applied to raw channel values.
//!
//! Hardware channels report volts (ADC inputs) or pulse frequencies
//! (hall-effect counters). A sensor binding names the conversion that turns
//! that raw value into the engineering unit of its measure.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

const KELVIN: f64 = 273.15;

/// Conversion from a raw channel value to an engineering value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conversion {
    /// Linear scaling: y = slope * x + intercept
    Linear { slope: f64, intercept: f64 },

    /// NTC thermistor on the low side of a voltage divider (Beta equation)
    Ntc {
        #[serde(default = "default_vcc")]
        vcc: f64,
        /// Fixed divider resistor on the board (ohm)
        #[serde(default = "default_board_resistance")]
        board_resistance: f64,
        /// Thermistor resistance at the nominal temperature (ohm)
        #[serde(default = "default_nominal_resistance")]
        nominal_resistance: f64,
        #[serde(default = "default_b_value")]
        b_value: f64,
        /// Nominal temperature (°C)
        #[serde(default = "default_nominal_temperature")]
        nominal_temperature: f64,
    },

    /// ACS712 hall current sensor, peak deviation from the zero-current voltage
    Acs712 {
        zero_current_voltage: f64,
        /// Volts per ampere (0.185 for 5A, 0.1 for 20A, 0.066 for 30A parts)
        sensitivity: f64,
        /// Currents below this are reported as zero (A)
        #[serde(default = "default_noise_floor")]
        noise_floor: f64,
    },

    /// Hall-effect flow meter: pulse frequency (Hz) divided by the meter factor
    FlowPulses {
        /// Pulses per second for one litre per minute
        #[serde(default = "default_flow_factor")]
        factor: f64,
    },
}

fn default_vcc() -> f64 {
    3.3
}
fn default_board_resistance() -> f64 {
    10_000.0
}
fn default_nominal_resistance() -> f64 {
    50_000.0
}
fn default_b_value() -> f64 {
    3950.0
}
fn default_nominal_temperature() -> f64 {
    25.0
}
fn default_noise_floor() -> f64 {
    0.1
}
fn default_flow_factor() -> f64 {
    11.0
}

impl Conversion {
    pub fn apply(&self, raw: f64) -> Result<f64> {
        match *self {
            Self::Linear { slope, intercept } => Ok(raw * slope + intercept),
            Self::Ntc {
                vcc,
                board_resistance,
                nominal_resistance,
                b_value,
                nominal_temperature,
            } => {
                if raw <= 0.0 || raw >= vcc {
                    return Err(DomainError::HardwareError(format!(
                        "divider voltage {raw} outside (0, {vcc})"
                    )));
                }
                let resistance = raw * board_resistance / (vcc - raw);
                let inverse = (resistance / nominal_resistance).ln() / b_value
                    + 1.0 / (nominal_temperature + KELVIN);
                Ok(1.0 / inverse - KELVIN)
            }
            Self::Acs712 {
                zero_current_voltage,
                sensitivity,
                noise_floor,
            } => {
                if sensitivity <= 0.0 {
                    return Err(DomainError::InvalidConfiguration(
                        "ACS712 sensitivity must be positive".to_string(),
                    ));
                }
                let amps = (raw - zero_current_voltage).abs() / sensitivity;
                Ok(if amps > noise_floor { amps } else { 0.0 })
            }
            Self::FlowPulses { factor } => {
                if factor <= 0.0 {
                    return Err(DomainError::InvalidConfiguration(
                        "flow meter factor must be positive".to_string(),
                    ));
                }
                Ok(raw / factor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ntc() -> Conversion {
        Conversion::Ntc {
            vcc: 3.3,
            board_resistance: 10_000.0,
            nominal_resistance: 10_000.0,
            b_value: 3950.0,
            nominal_temperature: 25.0,
        }
    }

    #[test]
    fn test_linear() {
        let c = Conversion::Linear {
            slope: 2.0,
            intercept: 1.0,
        };
        assert_eq!(c.apply(3.0).unwrap(), 7.0);
    }

    #[test]
    fn test_ntc_at_nominal_point() {
        // Equal resistors put the divider midpoint at the nominal temperature
        let t = ntc().apply(1.65).unwrap();
        assert!((t - 25.0).abs() < 1e-9, "got {t}");
    }

    #[test]
    fn test_ntc_is_monotonic() {
        // Higher voltage on the thermistor means higher resistance, colder water
        let warm = ntc().apply(1.2).unwrap();
        let cold = ntc().apply(2.0).unwrap();
        assert!(warm > cold);
    }

    #[test]
    fn test_ntc_rejects_rail_voltages() {
        assert!(ntc().apply(0.0).is_err());
        assert!(ntc().apply(3.3).is_err());
    }

    #[test]
    fn test_acs712() {
        let c = Conversion::Acs712 {
            zero_current_voltage: 2.5,
            sensitivity: 0.1,
            noise_floor: 0.1,
        };
        assert!((c.apply(2.8).unwrap() - 3.0).abs() < 1e-9);
        assert!((c.apply(2.2).unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(c.apply(2.505).unwrap(), 0.0);
    }

    #[test]
    fn test_flow_pulses() {
        let c = Conversion::FlowPulses { factor: 11.0 };
        assert!((c.apply(22.0).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let c: Conversion = serde_json::from_value(serde_json::json!({"type": "ntc"})).unwrap();
        assert_eq!(
            c,
            Conversion::Ntc {
                vcc: 3.3,
                board_resistance: 10_000.0,
                nominal_resistance: 50_000.0,
                b_value: 3950.0,
                nominal_temperature: 25.0,
            }
        );
    }
}
