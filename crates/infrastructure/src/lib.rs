//! Infrastructure layer - External integrations

pub mod config;
pub mod database;
pub mod drivers;
pub mod messaging;
pub mod policy;

pub use database::SQLiteBuffer;
pub use drivers::DriverFactory;
pub use messaging::buffered_publisher::BufferedTelemetryPublisher;
pub use messaging::mqtt_client::{MqttClient, MqttMessage, MqttPublisherClient};
pub use messaging::{TelemetryEnvelope, Topics};
