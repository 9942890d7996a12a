//! Application layer - Room monitoring and access control workflows

pub mod authorization;
pub mod local_input;
pub mod messaging;
pub mod monitoring;
pub mod snapshot;
pub mod telemetry;
pub mod token;

pub use authorization::{AccessIngress, AuthorizationExecutor};
pub use local_input::LocalInput;
pub use messaging::{CommandDispatcher, CommandListener};
pub use monitoring::{MonitoringService, RoomMonitor};
pub use snapshot::{SnapshotReader, SnapshotWriter};
pub use telemetry::{TelemetryForwarder, TelemetrySink};
pub use token::TokenService;
