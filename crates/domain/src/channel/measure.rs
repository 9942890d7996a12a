use serde::{Deserialize, Serialize};

/// Every quantity a room sensor can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureType {
    RoomTemperature,
    Humidity,
    Brightness,
    HotWaterTemperature,
    ColdWaterTemperature,
    HotFlowRate,
    ColdFlowRate,
    Current,
    Occupancy,
}

impl MeasureType {
    pub const ALL: [MeasureType; 9] = [
        Self::RoomTemperature,
        Self::Humidity,
        Self::Brightness,
        Self::HotWaterTemperature,
        Self::ColdWaterTemperature,
        Self::HotFlowRate,
        Self::ColdFlowRate,
        Self::Current,
        Self::Occupancy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoomTemperature => "room_temperature",
            Self::Humidity => "humidity",
            Self::Brightness => "brightness",
            Self::HotWaterTemperature => "hot_water_temperature",
            Self::ColdWaterTemperature => "cold_water_temperature",
            Self::HotFlowRate => "hot_flow_rate",
            Self::ColdFlowRate => "cold_flow_rate",
            Self::Current => "current",
            Self::Occupancy => "occupancy",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::RoomTemperature | Self::HotWaterTemperature | Self::ColdWaterTemperature => "°C",
            Self::Humidity => "%",
            Self::Brightness => "lx",
            Self::HotFlowRate | Self::ColdFlowRate => "L/min",
            Self::Current => "A",
            Self::Occupancy => "people",
        }
    }

    /// Consumption measures are summed over a report interval and averaged
    pub fn is_consumption(&self) -> bool {
        matches!(self, Self::HotFlowRate | Self::ColdFlowRate | Self::Current)
    }
}

impl std::fmt::Display for MeasureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
