use anyhow::{Result, anyhow};
use rumqttc::{AsyncClient, ConnAck, Event, EventLoop, LastWill, MqttOptions, Packet, Publish, QoS};
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;

const RECONNECT_MIN: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Inbound publish, handed to listeners before it is acked
#[derive(Clone, Debug)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub pkid: u16,
}

/// Publishing side of the broker connection, split out so publishers can be
/// tested without a broker
#[async_trait::async_trait]
pub trait MqttPublisherClient: Send + Sync {
    async fn publish_bytes(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<()>;
    fn is_connected(&self) -> bool;
}

/// Connection state shared with the event loop task
#[derive(Default)]
struct Link {
    connected: AtomicBool,
    subscriptions: RwLock<Vec<String>>,
}

impl Link {
    fn subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn remember(&self, topic: &str) {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !subs.iter().any(|s| s == topic) {
            subs.push(topic.to_string());
        }
    }
}

/// Broker connection of the unit.
///
/// The session is persistent and acks are manual: a command is only acked
/// once it was handed to the dispatcher, so the broker redelivers commands
/// that were in flight when the unit went down.
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    inbound: broadcast::Sender<MqttMessage>,
    link: Arc<Link>,
}

impl MqttClient {
    pub async fn new(
        config: &MqttConfig,
        client_id: &str,
        last_will: Option<LastWill>,
    ) -> Result<Self> {
        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
        options.set_clean_session(false);
        options.set_manual_acks(true);
        if let Some(will) = last_will {
            options.set_last_will(will);
        }

        let (client, eventloop) = AsyncClient::new(options, 100);
        let (inbound, _) = broadcast::channel(250);
        let link = Arc::new(Link::default());

        tokio::spawn(drive(eventloop, client.clone(), inbound.clone(), link.clone()));

        Ok(Self {
            client,
            inbound,
            link,
        })
    }

    pub fn subscribe_messages(&self) -> broadcast::Receiver<MqttMessage> {
        self.inbound.subscribe()
    }

    /// Subscribe now and again after every reconnect that lost the session
    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        self.link.remember(topic);
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| anyhow!("Failed to subscribe to topic {}: {}", topic, e))
    }

    pub async fn ack(&self, topic: &str, pkid: u16) -> Result<()> {
        let mut publish = Publish::new(topic, QoS::AtLeastOnce, Vec::new());
        publish.pkid = pkid;

        self.client
            .ack(&publish)
            .await
            .map_err(|e| anyhow!("Failed to ack packet {}: {}", pkid, e))
    }
}

async fn drive(
    mut eventloop: EventLoop,
    client: AsyncClient,
    inbound: broadcast::Sender<MqttMessage>,
    link: Arc<Link>,
) {
    let mut backoff = RECONNECT_MIN;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = MqttMessage {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                    pkid: publish.pkid,
                };
                if let Err(broadcast::error::SendError(dropped)) = inbound.send(message) {
                    debug!(topic = %dropped.topic, "No listener for inbound message");
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                backoff = RECONNECT_MIN;
                link.connected.store(true, Ordering::Relaxed);
                on_connected(&client, &link, &ack).await;
            }
            Ok(Event::Incoming(Packet::Disconnect))
            | Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                link.connected.store(false, Ordering::Relaxed);
            }
            Ok(_) => {}
            Err(e) => {
                if link.connected.swap(false, Ordering::Relaxed) {
                    warn!(error = %e, "🔌 MQTT connection lost");
                } else {
                    error!(error = %e, retry_ms = backoff.as_millis() as u64, "MQTT connection error");
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_MAX);
            }
        }
    }
}

async fn on_connected(client: &AsyncClient, link: &Link, ack: &ConnAck) {
    info!(session_present = ack.session_present, "📡 MQTT Connected");
    if ack.session_present {
        return;
    }

    let subs = link.subscriptions();
    if subs.is_empty() {
        return;
    }
    info!("Re-subscribing to {} topics...", subs.len());
    for topic in subs {
        if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
            error!("Failed to re-subscribe to {}: {}", topic, e);
        }
    }
}

#[async_trait::async_trait]
impl MqttPublisherClient for MqttClient {
    async fn publish_bytes(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<()> {
        self.client
            .publish(topic, qos, retain, payload.to_vec())
            .await
            .map_err(|e| anyhow!("Failed to publish to {}: {}", topic, e))
    }

    fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::Relaxed)
    }
}
