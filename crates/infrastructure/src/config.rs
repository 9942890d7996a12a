use std::collections::{BTreeMap, HashSet};

use config::{Config, ConfigError, Environment, File};
use domain::DomainError;
use domain::channel::{MeasureType, SensorBinding};
use domain::hardware::{ActuatorBinding, HardwareType};
use domain::room::ComfortRange;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_keep_alive() -> u64 {
    20
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HardwareConfig {
    #[serde(rename = "type", default)]
    pub kind: HardwareType,
    /// Backend-specific settings, interpreted by the driver factory
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Upper bound for one hardware read; a timed-out read is invalid
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Readings older than this, relative to the newest reading of a poll, are dropped
    #[serde(default = "default_window")]
    pub window_ms: u64,
    /// Consecutive polls a new aggregate must persist before it is published
    #[serde(default = "default_debounce_cycles")]
    pub debounce_cycles: u32,
    #[serde(default = "default_stale_timeout")]
    pub stale_timeout_ms: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Per-measure dead band. Listed measures override the built-in bands.
    #[serde(default = "default_hysteresis", deserialize_with = "merge_hysteresis")]
    pub hysteresis: BTreeMap<MeasureType, f64>,
    #[serde(default = "default_comfort", deserialize_with = "merge_comfort")]
    pub comfort: BTreeMap<MeasureType, ComfortRange>,
}

fn default_poll_interval() -> u64 {
    1000
}
fn default_read_timeout() -> u64 {
    250
}
fn default_window() -> u64 {
    5000
}
fn default_debounce_cycles() -> u32 {
    3
}
fn default_stale_timeout() -> u64 {
    15_000
}
fn default_report_interval() -> u64 {
    5
}

fn default_hysteresis() -> BTreeMap<MeasureType, f64> {
    BTreeMap::from([
        (MeasureType::RoomTemperature, 0.5),
        (MeasureType::Humidity, 3.0),
        (MeasureType::Brightness, 50.0),
        (MeasureType::HotWaterTemperature, 1.0),
        (MeasureType::ColdWaterTemperature, 1.0),
        (MeasureType::HotFlowRate, 0.5),
        (MeasureType::ColdFlowRate, 0.5),
        (MeasureType::Current, 0.2),
        (MeasureType::Occupancy, 0.5),
    ])
}

fn default_comfort() -> BTreeMap<MeasureType, ComfortRange> {
    BTreeMap::from([
        (MeasureType::RoomTemperature, ComfortRange::new(20.0, 24.0)),
        (MeasureType::Humidity, ComfortRange::new(30.0, 60.0)),
        (MeasureType::Brightness, ComfortRange::new(100.0, 1000.0)),
    ])
}

fn merge_hysteresis<'de, D>(deserializer: D) -> Result<BTreeMap<MeasureType, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut merged = default_hysteresis();
    merged.extend(BTreeMap::<MeasureType, f64>::deserialize(deserializer)?);
    Ok(merged)
}

fn merge_comfort<'de, D>(deserializer: D) -> Result<BTreeMap<MeasureType, ComfortRange>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut merged = default_comfort();
    merged.extend(BTreeMap::<MeasureType, ComfortRange>::deserialize(deserializer)?);
    Ok(merged)
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            read_timeout_ms: default_read_timeout(),
            window_ms: default_window(),
            debounce_cycles: default_debounce_cycles(),
            stale_timeout_ms: default_stale_timeout(),
            report_interval_secs: default_report_interval(),
            hysteresis: default_hysteresis(),
            comfort: default_comfort(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthorizationConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_actuation_attempts")]
    pub actuation_attempts: u32,
    #[serde(default = "default_actuation_backoff")]
    pub actuation_backoff_ms: u64,
    /// Time allowed to evaluate queued requests on shutdown
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    64
}
fn default_actuation_attempts() -> u32 {
    3
}
fn default_actuation_backoff() -> u64 {
    200
}
fn default_drain_timeout() -> u64 {
    2000
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            actuation_attempts: default_actuation_attempts(),
            actuation_backoff_ms: default_actuation_backoff(),
            drain_timeout_ms: default_drain_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_buffer_path")]
    pub buffer_path: String,
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_flush_batch")]
    pub flush_batch: i64,
    /// Oldest buffered rows are dropped beyond this
    #[serde(default = "default_max_buffered")]
    pub max_buffered: i64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    /// Capacity of the in-process queue in front of the publisher
    #[serde(default = "default_sink_capacity")]
    pub sink_capacity: usize,
}

fn default_buffer_path() -> String {
    "data/telemetry_buffer.db".to_string()
}
fn default_flush_interval() -> u64 {
    5000
}
fn default_flush_batch() -> i64 {
    50
}
fn default_max_buffered() -> i64 {
    10_000
}
fn default_max_backoff() -> u64 {
    60_000
}
fn default_sink_capacity() -> usize {
    256
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            buffer_path: default_buffer_path(),
            flush_interval_ms: default_flush_interval(),
            flush_batch: default_flush_batch(),
            max_buffered: default_max_buffered(),
            max_backoff_ms: default_max_backoff(),
            sink_capacity: default_sink_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UnitConfig {
    pub unit_id: String,
    pub hotel_id: String,
    pub room_id: String,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub sensors: Vec<SensorBinding>,
    #[serde(default)]
    pub actuators: Vec<ActuatorBinding>,
    /// Ordered access policy, validated by `policy::load_policy`
    #[serde(default)]
    pub policies: Vec<serde_json::Value>,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

fn default_heartbeat_interval() -> u64 {
    30
}

impl UnitConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("mqtt.host", "localhost")?
            .set_default("mqtt.port", 1883)?
            // Required so the unit never starts without sensors and policies
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. ECOTRIP__MQTT__HOST=10.0.0.1)
            .add_source(Environment::with_prefix("ECOTRIP").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Topic prefix shared by telemetry, status and commands
    pub fn topic_base(&self) -> String {
        format!("ecotrip/{}/{}", self.hotel_id, self.room_id)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.unit_id.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "unit_id cannot be empty".to_string(),
            ));
        }

        if self.hotel_id.trim().is_empty() || self.room_id.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "hotel_id and room_id are required".to_string(),
            ));
        }

        if self.monitoring.debounce_cycles == 0 {
            return Err(DomainError::InvalidConfiguration(
                "monitoring.debounce_cycles must be at least 1".to_string(),
            ));
        }

        if self.monitoring.poll_interval_ms == 0 || self.monitoring.read_timeout_ms == 0 {
            return Err(DomainError::InvalidConfiguration(
                "monitoring intervals must be positive".to_string(),
            ));
        }

        if self.authorization.actuation_attempts == 0 || self.authorization.queue_capacity == 0 {
            return Err(DomainError::InvalidConfiguration(
                "authorization.actuation_attempts and queue_capacity must be positive"
                    .to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for actuator in &self.actuators {
            if !seen.insert(actuator.channel.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "actuator {} declared twice",
                    actuator.channel
                )));
            }
        }

        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if !seen.insert(sensor.channel.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "sensor {} declared twice",
                    sensor.channel
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "unit_id": "unit-101",
            "hotel_id": "grand",
            "room_id": "101",
            "mqtt": {"host": "localhost", "port": 1883}
        })
    }

    #[test]
    fn test_defaults_applied() {
        let config: UnitConfig = serde_json::from_value(minimal()).unwrap();
        assert_eq!(config.monitoring.debounce_cycles, 3);
        assert_eq!(config.monitoring.stale_timeout_ms, 15_000);
        assert_eq!(config.authorization.queue_capacity, 64);
        assert_eq!(config.telemetry.flush_batch, 50);
        assert_eq!(config.hardware.kind, HardwareType::Simulated);
        assert_eq!(config.heartbeat_interval_secs, 30);
        assert_eq!(
            config.monitoring.hysteresis.get(&MeasureType::RoomTemperature),
            Some(&0.5)
        );
        assert_eq!(config.topic_base(), "ecotrip/grand/101");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_monitoring_maps_keep_defaults() {
        let mut value = minimal();
        value["monitoring"] = json!({
            "hysteresis": {"room_temperature": 1.5},
            "comfort": {"humidity": {"low": 35.0, "high": 55.0}}
        });
        let config: UnitConfig = serde_json::from_value(value).unwrap();
        let monitoring = &config.monitoring;

        assert_eq!(monitoring.hysteresis.get(&MeasureType::RoomTemperature), Some(&1.5));
        assert_eq!(monitoring.hysteresis.get(&MeasureType::Humidity), Some(&3.0));
        assert_eq!(monitoring.hysteresis.len(), default_hysteresis().len());

        assert_eq!(
            monitoring.comfort.get(&MeasureType::Humidity),
            Some(&ComfortRange::new(35.0, 55.0))
        );
        assert_eq!(
            monitoring.comfort.get(&MeasureType::RoomTemperature),
            Some(&ComfortRange::new(20.0, 24.0))
        );
    }

    #[test]
    fn test_partial_hysteresis_from_file_keeps_defaults() {
        let dir = std::env::temp_dir().join(format!("ecotrip-bands-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            r#"
unit_id = "unit-101"
hotel_id = "grand"
room_id = "101"

[monitoring.hysteresis]
humidity = 5.0
"#,
        )
        .unwrap();

        let config = UnitConfig::load(dir.to_str().unwrap()).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        let hysteresis = &config.monitoring.hysteresis;
        assert_eq!(hysteresis.get(&MeasureType::Humidity), Some(&5.0));
        assert_eq!(hysteresis.get(&MeasureType::RoomTemperature), Some(&0.5));
        assert_eq!(hysteresis.get(&MeasureType::Occupancy), Some(&0.5));
    }

    #[test]
    fn test_sensors_and_actuators() {
        let mut value = minimal();
        value["sensors"] = json!([
            {"channel": "ntc-hot", "measure": "hot_water_temperature",
             "range": {"min": 5.0, "max": 100.0}, "conversion": {"type": "ntc"}},
            {"channel": "pir", "measure": "occupancy"}
        ]);
        value["actuators"] = json!([{"channel": "frontDoor", "kind": "lock"}]);

        let config: UnitConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors[0].measure, MeasureType::HotWaterTemperature);
        assert!(config.sensors[0].conversion.is_some());
        assert_eq!(config.actuators[0].channel.as_str(), "frontDoor");
    }

    #[test]
    fn test_validate_rejects_duplicates_and_zero_debounce() {
        let mut value = minimal();
        value["actuators"] = json!([
            {"channel": "frontDoor", "kind": "lock"},
            {"channel": "frontDoor", "kind": "relay"}
        ]);
        let config: UnitConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            config.validate(),
            Err(DomainError::InvalidConfiguration(_))
        ));

        let mut config: UnitConfig = serde_json::from_value(minimal()).unwrap();
        config.monitoring.debounce_cycles = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_layers_files_and_env() {
        let dir = std::env::temp_dir().join(format!("ecotrip-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.json"),
            serde_json::to_string(&minimal()).unwrap(),
        )
        .unwrap();

        let config = UnitConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.unit_id, "unit-101");
        assert_eq!(config.mqtt.port, 1883);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_requires_default_file() {
        let dir = std::env::temp_dir().join(format!("ecotrip-missing-{}", uuid::Uuid::new_v4()));
        assert!(UnitConfig::load(dir.to_str().unwrap()).is_err());
    }
}
