mod binding;
mod channel_id;
mod measure;
mod reading;

pub use binding::{SensorBinding, ValidRange};
pub use channel_id::ChannelId;
pub use measure::MeasureType;
pub use reading::SensorReading;
