use anyhow::{Result, anyhow};
use async_trait::async_trait;
use domain::access::{AccessRequest, Action, AuthorizationDecision, ReasonCode, RequestSource};
use domain::{ChannelId, DomainEvent, EventPublisher, SubjectId};
use infrastructure::SQLiteBuffer;
use infrastructure::messaging::mqtt_client::MqttPublisherClient;
use infrastructure::messaging::{
    BufferedTelemetryPublisher, FlushOutcome, FlushSettings, TelemetryEnvelope, Topics,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct MockMqttClient {
    published_messages: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    connected: Arc<AtomicBool>,
    should_fail_publish: Arc<AtomicBool>,
}

impl MockMqttClient {
    fn new() -> Self {
        Self {
            published_messages: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
            should_fail_publish: Arc::new(AtomicBool::new(false)),
        }
    }

    fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MqttPublisherClient for MockMqttClient {
    async fn publish_bytes(
        &self,
        topic: &str,
        payload: &[u8],
        _qos: rumqttc::QoS,
        _retain: bool,
    ) -> Result<()> {
        if self.should_fail_publish.load(Ordering::Relaxed) {
            return Err(anyhow!("Simulated Publish Failure"));
        }
        self.published_messages
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

fn decision_event(subject: &str) -> DomainEvent {
    let request = AccessRequest::new(
        SubjectId::new(subject).unwrap(),
        ChannelId::new("frontDoor").unwrap(),
        Action::Unlock,
        RequestSource::Remote,
    );
    let decision = AuthorizationDecision::denied(request.id, ReasonCode::NoMatchingPolicy);
    DomainEvent::access_decided(&request, &decision)
}

struct Fixture {
    publisher: BufferedTelemetryPublisher,
    buffer: SQLiteBuffer,
    client: MockMqttClient,
    db_file: std::path::PathBuf,
}

async fn fixture(max_buffered: i64) -> Result<Fixture> {
    let db_file =
        std::env::temp_dir().join(format!("test_buffer_{}.db", uuid::Uuid::new_v4()));
    let db_url = format!("sqlite://{}?mode=rwc", db_file.display());

    let buffer = SQLiteBuffer::new(&db_url, max_buffered).await?;
    let client = MockMqttClient::new();
    let client_arc: Arc<dyn MqttPublisherClient> = Arc::new(client.clone());

    let publisher = BufferedTelemetryPublisher::new(
        client_arc,
        buffer.clone(),
        "unit-101".to_string(),
        Topics::new("ecotrip/grand/101"),
        FlushSettings {
            interval: Duration::from_millis(50),
            batch: 50,
            max_backoff: Duration::from_millis(200),
        },
    );

    Ok(Fixture {
        publisher,
        buffer,
        client,
        db_file,
    })
}

#[tokio::test]
async fn test_offline_buffering_and_recovery() -> Result<()> {
    let f = fixture(100).await?;
    let cancel = CancellationToken::new();
    let flusher = f.publisher.start_flusher(cancel.clone());

    // Online: published immediately
    f.publisher
        .publish(decision_event("guard"))
        .await
        .map_err(|e| anyhow!(e))?;
    assert_eq!(f.client.published().len(), 1, "Should publish immediately when online");

    // Offline: buffered, not published
    f.client.connected.store(false, Ordering::Relaxed);
    f.publisher
        .publish(decision_event("guest"))
        .await
        .map_err(|e| anyhow!(e))?;
    assert_eq!(f.client.published().len(), 1, "Should NOT publish when offline");
    assert_eq!(f.buffer.count().await?, 1, "Should have 1 buffered event");
    assert_eq!(f.publisher.buffered().await, 1);

    // Recovery: flusher drains the buffer
    f.client.connected.store(true, Ordering::Relaxed);
    sleep(Duration::from_millis(400)).await;

    assert_eq!(f.buffer.count().await?, 0, "Buffer should be empty after flush");
    let msgs = f.client.published();
    assert_eq!(msgs.len(), 2, "Should have received buffered message");
    assert_eq!(msgs[1].0, "ecotrip/grand/101/decision");

    let envelope: TelemetryEnvelope = serde_json::from_slice(&msgs[1].1)?;
    assert_eq!(envelope.event_type, "AccessDecided");
    assert_eq!(envelope.payload["subject"], "guest");

    cancel.cancel();
    flusher.await?;
    let _ = std::fs::remove_file(&f.db_file);
    Ok(())
}

#[tokio::test]
async fn test_failed_publish_is_buffered() -> Result<()> {
    let f = fixture(100).await?;

    f.client.should_fail_publish.store(true, Ordering::Relaxed);
    f.publisher
        .publish(decision_event("guard"))
        .await
        .map_err(|e| anyhow!(e))?;
    assert_eq!(f.buffer.count().await?, 1);

    // Still failing: the flush stalls and keeps the row
    assert_eq!(f.publisher.flush().await?, FlushOutcome::Stalled { published: 0 });
    assert_eq!(f.buffer.count().await?, 1);

    f.client.should_fail_publish.store(false, Ordering::Relaxed);
    assert_eq!(f.publisher.flush().await?, FlushOutcome::Flushed(1));
    assert_eq!(f.buffer.count().await?, 0);

    let _ = std::fs::remove_file(&f.db_file);
    Ok(())
}

#[tokio::test]
async fn test_heartbeat_is_never_buffered() -> Result<()> {
    let f = fixture(100).await?;

    f.client.connected.store(false, Ordering::Relaxed);
    f.client.should_fail_publish.store(true, Ordering::Relaxed);
    f.publisher
        .publish(DomainEvent::heartbeat("unit-101", 10, 1, false, 0))
        .await
        .map_err(|e| anyhow!(e))?;

    assert_eq!(f.buffer.count().await?, 0);

    let _ = std::fs::remove_file(&f.db_file);
    Ok(())
}

#[tokio::test]
async fn test_buffer_is_bounded() -> Result<()> {
    let f = fixture(3).await?;
    f.client.connected.store(false, Ordering::Relaxed);

    for subject in ["a1", "a2", "a3", "a4", "a5"] {
        f.publisher
            .publish(decision_event(subject))
            .await
            .map_err(|e| anyhow!(e))?;
    }
    assert_eq!(f.buffer.count().await?, 3);

    // Oldest were dropped
    f.client.connected.store(true, Ordering::Relaxed);
    f.publisher.flush().await?;
    let subjects: Vec<String> = f
        .client
        .published()
        .iter()
        .map(|(_, payload)| {
            let envelope: TelemetryEnvelope = serde_json::from_slice(payload).unwrap();
            envelope.payload["subject"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(subjects, vec!["a3", "a4", "a5"]);

    let _ = std::fs::remove_file(&f.db_file);
    Ok(())
}

#[tokio::test]
async fn test_flusher_stops_on_cancel() -> Result<()> {
    let f = fixture(100).await?;
    let cancel = CancellationToken::new();
    let flusher = f.publisher.start_flusher(cancel.clone());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), flusher).await??;

    let _ = std::fs::remove_file(&f.db_file);
    Ok(())
}
