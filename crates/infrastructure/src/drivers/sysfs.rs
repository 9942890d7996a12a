use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use domain::channel::ChannelId;
use domain::error::DomainError;
use domain::hardware::Hardware;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct SysfsConfig {
    pub channels: Vec<SysfsChannelConfig>,
}

/// Maps a channel onto a sysfs attribute, e.g.
/// `/sys/class/gpio/gpio17/value` or `/sys/bus/iio/devices/iio:device0/in_voltage0_raw`
#[derive(Debug, Deserialize, Clone)]
pub struct SysfsChannelConfig {
    pub channel: ChannelId,
    pub path: PathBuf,
    /// Raw counts to volts (or other unit) on read
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Linux sysfs GPIO and IIO backend
pub struct SysfsHardware {
    channels: HashMap<ChannelId, SysfsChannelConfig>,
}

impl SysfsHardware {
    pub fn new(config: SysfsConfig) -> Self {
        let channels = config
            .channels
            .into_iter()
            .map(|c| (c.channel.clone(), c))
            .collect();
        Self { channels }
    }

    fn channel(&self, channel: &ChannelId) -> Result<&SysfsChannelConfig, DomainError> {
        self.channels
            .get(channel)
            .ok_or_else(|| DomainError::HardwareError(format!("unmapped channel {channel}")))
    }
}

#[async_trait]
impl Hardware for SysfsHardware {
    async fn read(&self, channel: &ChannelId) -> Result<f64, DomainError> {
        let config = self.channel(channel)?;
        let content = tokio::fs::read_to_string(&config.path).await.map_err(|e| {
            DomainError::HardwareError(format!("read {}: {}", config.path.display(), e))
        })?;
        let raw: f64 = content.trim().parse().map_err(|e| {
            DomainError::HardwareError(format!(
                "{} is not numeric ({:?}): {}",
                config.path.display(),
                content.trim(),
                e
            ))
        })?;
        Ok(raw * config.scale + config.offset)
    }

    async fn write(&self, channel: &ChannelId, value: f64) -> Result<(), DomainError> {
        let config = self.channel(channel)?;
        // GPIO value attributes take integral levels
        let level = value.round() as i64;
        tokio::fs::write(&config.path, level.to_string())
            .await
            .map_err(|e| {
                DomainError::HardwareError(format!("write {}: {}", config.path.display(), e))
            })
    }
}
