use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::{
    AuthorizationExecutor, CommandDispatcher, CommandListener, LocalInput, MonitoringService,
    TelemetrySink, TokenService, snapshot,
};
use control_unit::heartbeat::Heartbeat;
use control_unit::presence::{self, Presence};
use domain::RoomState;
use infrastructure::config::UnitConfig;
use infrastructure::messaging::FlushSettings;
use infrastructure::policy::load_policy;
use infrastructure::{
    BufferedTelemetryPublisher, DriverFactory, MqttClient, MqttPublisherClient, SQLiteBuffer,
    Topics,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory (defaults to the unit's own config/)
    #[arg(long)]
    config_dir: Option<String>,

    /// Override Unit ID
    #[arg(long)]
    unit_id: Option<String>,

    /// Override MQTT Host
    #[arg(long)]
    mqtt_host: Option<String>,

    /// Override MQTT Port
    #[arg(long)]
    mqtt_port: Option<u16>,

    /// Read local access requests (JSON lines) from stdin
    #[arg(long)]
    local_input: bool,
}

async fn run() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,control_unit=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🏨 EcoTrip Control Unit Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    // Run from the workspace root during development
    let dev_base = "crates/control-unit";
    let base_dir = if Path::new(dev_base).exists() {
        dev_base
    } else {
        "."
    };
    let config_dir = args
        .config_dir
        .unwrap_or_else(|| format!("{}/config", base_dir));
    info!("📂 Config directory: {}", config_dir);

    // 1. Load Configuration
    let mut config = UnitConfig::load(&config_dir)
        .with_context(|| format!("Failed to load configuration from {}", config_dir))?;

    if let Some(id) = args.unit_id {
        config.unit_id = id;
    }
    if let Some(host) = args.mqtt_host {
        config.mqtt.host = host;
    }
    if let Some(port) = args.mqtt_port {
        config.mqtt.port = port;
    }
    config.validate()?;

    let unit_id = config.unit_id.clone();
    let topics = Topics::new(config.topic_base());
    info!(unit_id = %unit_id, hotel = %config.hotel_id, room = %config.room_id, "✅ Configuration loaded");

    // 2. Policy (fatal when missing or invalid)
    let policy = Arc::new(load_policy(&config.policies).context("Refusing to start")?);

    // 3. MQTT
    info!(host = %config.mqtt.host, port = %config.mqtt.port, "Connecting to MQTT Broker...");
    let client_id = config
        .mqtt
        .client_id
        .clone()
        .unwrap_or_else(|| format!("unit-{}", unit_id));
    let mqtt_client = MqttClient::new(
        &config.mqtt,
        &client_id,
        Some(presence::last_will(&topics.status(), &unit_id)),
    )
    .await
    .context("Failed to set up MQTT client")?;

    // 4. Store-and-forward telemetry
    let buffer_file = Path::new(base_dir).join(&config.telemetry.buffer_path);
    if let Some(parent) = buffer_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let buffer_url = format!("sqlite://{}?mode=rwc", buffer_file.display());
    let buffer = SQLiteBuffer::new(&buffer_url, config.telemetry.max_buffered)
        .await
        .with_context(|| format!("Failed to open telemetry buffer {}", buffer_url))?;
    info!("💾 Initialized SQLite Buffer (Store & Forward) at {}", buffer_url);

    let client_arc: Arc<dyn MqttPublisherClient> = Arc::new(mqtt_client.clone());
    let publisher = BufferedTelemetryPublisher::new(
        client_arc.clone(),
        buffer,
        unit_id.clone(),
        topics.clone(),
        FlushSettings::from(&config.telemetry),
    );

    // Control loops stop on `cancel`, telemetry later so their last events get out
    let cancel = CancellationToken::new();
    let telemetry_cancel = CancellationToken::new();

    let flusher = publisher.start_flusher(telemetry_cancel.clone());
    let (sink, forwarder) = TelemetrySink::new(config.telemetry.sink_capacity);
    let forwarder_handle = tokio::spawn(
        forwarder.run(Arc::new(publisher.clone()), telemetry_cancel.clone()),
    );

    // 5. Hardware
    let hardware =
        DriverFactory::create_hardware(config.hardware.kind, config.hardware.config.clone())?;
    info!(
        kind = config.hardware.kind.as_str(),
        sensors = config.sensors.len(),
        actuators = config.actuators.len(),
        "🔌 Hardware ready"
    );

    // 6. Monitoring and authorization
    let (writer, reader) = snapshot::channel(RoomState::initial());
    let tokens = TokenService::new();

    let monitoring = MonitoringService::new(
        hardware.clone(),
        config.sensors.clone(),
        &config.monitoring,
        writer,
        sink.clone(),
        tokens.clone(),
    );
    let monitoring_handle = tokio::spawn(monitoring.run(cancel.clone()));

    let (executor, ingress) = AuthorizationExecutor::new(
        policy,
        reader.clone(),
        hardware,
        config.actuators.clone(),
        sink,
        &config.authorization,
    );
    let executor_handle = tokio::spawn(executor.run(cancel.clone()));

    // 7. Request sources
    let dispatcher = Arc::new(CommandDispatcher::new(ingress.clone(), tokens.clone()));
    let command_listener = CommandListener::new(mqtt_client.clone(), topics.commands(), dispatcher);
    let listener_cancel = cancel.clone();
    tokio::spawn(async move {
        command_listener.start(listener_cancel).await;
    });

    if args.local_input {
        let local = LocalInput::new(
            tokio::io::BufReader::new(tokio::io::stdin()),
            ingress,
            tokens,
        );
        tokio::spawn(local.run(cancel.clone()));
    }

    // 8. Publish ONLINE status
    info!("✅ Unit Initialized. Publishing ONLINE status...");
    if let Err(e) =
        presence::announce(client_arc.as_ref(), &topics.status(), &unit_id, Presence::Online).await
    {
        warn!("Failed to publish ONLINE status: {}", e);
    }

    // 9. Heartbeat
    let heartbeat = Heartbeat::new(
        unit_id.clone(),
        Duration::from_secs(config.heartbeat_interval_secs),
        reader,
        publisher,
    );
    let heartbeat_handle = tokio::spawn(heartbeat.run(cancel.clone()));

    // 10. Shutdown Signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutting down..."),
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }

    cancel.cancel();
    // Queued access requests are decided or denied before telemetry stops
    if let Err(e) = executor_handle.await {
        warn!(error = %e, "Authorization executor ended abnormally");
    }
    if let Err(e) = monitoring_handle.await {
        warn!(error = %e, "Monitoring loop ended abnormally");
    }
    let _ = heartbeat_handle.await;

    telemetry_cancel.cancel();
    let _ = forwarder_handle.await;
    let _ = flusher.await;

    // Publish OFFLINE before exit (Best effort)
    let _ = presence::announce(
        client_arc.as_ref(),
        &topics.status(),
        &unit_id,
        Presence::Offline,
    )
    .await;

    info!("👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = rt.block_on(run());
    // A blocked stdin read must not hold up exit
    rt.shutdown_timeout(Duration::from_secs(1));

    if let Err(e) = result {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
