pub mod buffered_publisher;
pub mod envelope;
pub mod mqtt_client;

pub use buffered_publisher::{BufferedTelemetryPublisher, FlushOutcome, FlushSettings};
pub use envelope::{TelemetryEnvelope, Topics};
