use std::time::Instant;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use domain::channel::ChannelId;
use domain::error::DomainError;
use domain::hardware::Hardware;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub channels: Vec<SimulatedChannelConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatedChannelConfig {
    pub channel: ChannelId,
    #[serde(flatten)]
    pub signal: Signal,
}

/// Value generator behind a simulated sensor channel
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    Constant {
        value: f64,
    },
    Sine {
        min: f64,
        max: f64,
        #[serde(default = "default_period")]
        period_secs: f64,
    },
}

fn default_period() -> f64 {
    10.0
}

/// In-memory hardware for development and tests.
///
/// Sensor channels follow their configured signal; writes are recorded per
/// channel. Any channel can be switched into a failing state.
pub struct SimulatedHardware {
    start_time: Instant,
    signals: DashMap<ChannelId, Signal>,
    outputs: DashMap<ChannelId, f64>,
    failing: DashSet<ChannelId>,
}

impl SimulatedHardware {
    pub fn new(config: SimulatorConfig) -> Self {
        let signals = DashMap::new();
        for channel in config.channels {
            signals.insert(channel.channel, channel.signal);
        }

        Self {
            start_time: Instant::now(),
            signals,
            outputs: DashMap::new(),
            failing: DashSet::new(),
        }
    }

    pub fn set_value(&self, channel: &ChannelId, value: f64) {
        self.signals
            .insert(channel.clone(), Signal::Constant { value });
    }

    pub fn set_failing(&self, channel: &ChannelId, failing: bool) {
        if failing {
            self.failing.insert(channel.clone());
        } else {
            self.failing.remove(channel);
        }
    }

    /// Last level written to an output channel
    pub fn output(&self, channel: &ChannelId) -> Option<f64> {
        self.outputs.get(channel).map(|v| *v)
    }

    fn generate(&self, signal: &Signal) -> f64 {
        match *signal {
            Signal::Constant { value } => value,
            Signal::Sine {
                min,
                max,
                period_secs,
            } => {
                let elapsed = self.start_time.elapsed().as_secs_f64();
                let midpoint = min + (max - min) / 2.0;
                let amplitude = (max - min) / 2.0;
                let raw = midpoint
                    + amplitude
                        * (elapsed / period_secs.max(0.001) * 2.0 * std::f64::consts::PI).sin();
                (raw * 100.0).round() / 100.0
            }
        }
    }
}

#[async_trait]
impl Hardware for SimulatedHardware {
    async fn read(&self, channel: &ChannelId) -> Result<f64, DomainError> {
        if self.failing.contains(channel) {
            return Err(DomainError::HardwareError(format!(
                "simulated failure on {channel}"
            )));
        }

        let signal = self
            .signals
            .get(channel)
            .map(|s| s.clone())
            .ok_or_else(|| DomainError::HardwareError(format!("unknown channel {channel}")))?;
        Ok(self.generate(&signal))
    }

    async fn write(&self, channel: &ChannelId, value: f64) -> Result<(), DomainError> {
        if self.failing.contains(channel) {
            return Err(DomainError::HardwareError(format!(
                "simulated failure on {channel}"
            )));
        }

        tracing::debug!(channel = %channel, value, "Simulated output written");
        self.outputs.insert(channel.clone(), value);
        Ok(())
    }
}
