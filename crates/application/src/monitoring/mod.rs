//! Room Monitoring Engine and its polling loop

pub mod engine;
pub mod report;
pub mod service;

pub use engine::RoomMonitor;
pub use report::{DetectionAccumulator, DetectionSummary};
pub use service::MonitoringService;
