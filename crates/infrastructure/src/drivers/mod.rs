mod simulator;
mod sysfs;

pub use simulator::{SimulatedChannelConfig, SimulatedHardware, Signal, SimulatorConfig};
pub use sysfs::{SysfsChannelConfig, SysfsConfig, SysfsHardware};

use std::sync::Arc;

use domain::DomainError;
use domain::hardware::{Hardware, HardwareType};

/// Factory for hardware backends
pub struct DriverFactory;

impl DriverFactory {
    /// Create a hardware backend from type and configuration
    pub fn create_hardware(
        kind: HardwareType,
        config: serde_json::Value,
    ) -> Result<Arc<dyn Hardware>, DomainError> {
        // An absent section means "no channels"
        let config = if config.is_null() {
            serde_json::json!({})
        } else {
            config
        };

        match kind {
            HardwareType::Simulated => {
                let sim_config: SimulatorConfig = serde_json::from_value(config).map_err(|e| {
                    DomainError::InvalidConfiguration(format!("Invalid simulator config: {}", e))
                })?;
                Ok(Arc::new(SimulatedHardware::new(sim_config)) as Arc<dyn Hardware>)
            }
            HardwareType::Sysfs => {
                let sysfs_config: SysfsConfig = serde_json::from_value(config).map_err(|e| {
                    DomainError::InvalidConfiguration(format!("Invalid sysfs config: {}", e))
                })?;
                Ok(Arc::new(SysfsHardware::new(sysfs_config)) as Arc<dyn Hardware>)
            }
        }
    }
}
