//! Process-level pieces of the control unit: presence and heartbeat

pub mod heartbeat;
pub mod presence;
