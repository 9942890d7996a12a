use anyhow::Result;
use infrastructure::MqttPublisherClient;
use rumqttc::{LastWill, QoS};

/// Retained status of the unit on its status topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online,
    Offline,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
        }
    }

    pub fn payload(&self, unit_id: &str) -> String {
        serde_json::json!({
            "status": self.as_str(),
            "unit_id": unit_id,
            "ts": chrono::Utc::now().timestamp_millis(),
        })
        .to_string()
    }
}

/// Broker-side OFFLINE notice for an unclean disconnect
pub fn last_will(status_topic: &str, unit_id: &str) -> LastWill {
    LastWill::new(
        status_topic,
        Presence::Offline.payload(unit_id),
        QoS::AtLeastOnce,
        true,
    )
}

pub async fn announce(
    client: &dyn MqttPublisherClient,
    status_topic: &str,
    unit_id: &str,
    presence: Presence,
) -> Result<()> {
    client
        .publish_bytes(
            status_topic,
            presence.payload(unit_id).as_bytes(),
            QoS::AtLeastOnce,
            true,
        )
        .await
}
