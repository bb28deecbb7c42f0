//! eventq CLI: run the worker, enqueue and inspect events, generate load.

use eventq::config::Config;
use eventq::db::Db;
use eventq::handler::HandlerRegistry;
use eventq::model::{EventId, EventStatus, EventType, Payload, QueueEvent};
use eventq::producer::Producer;
use eventq::telemetry::{TelemetryConfig, TelemetryGuard, init_telemetry};
use eventq::worker::Worker;
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "eventq", about = "Durable Postgres-backed event queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the queue worker until Ctrl-C
    Serve {
        /// Attempts before an event is marked FAILED
        #[arg(long)]
        max_retries: Option<u32>,
        /// Milliseconds to wait between polls
        #[arg(long)]
        poll_interval_ms: Option<u64>,
        /// Only sleep between polls when no event was found
        #[arg(long)]
        drain: bool,
    },
    /// Event operations
    Event {
        #[command(subcommand)]
        action: EventAction,
    },
    /// Enqueue synthetic NEW_TOKEN events at a fixed rate
    Generate {
        /// Milliseconds between events
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Stop after this many events (default: run until Ctrl-C)
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Subcommand)]
enum EventAction {
    /// Add an event to the queue
    Add {
        /// Event type (e.g. NEW_TOKEN)
        event_type: String,
        /// JSON object payload
        #[arg(long)]
        data: Option<String>,
    },
    /// List events, oldest first
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
        /// Maximum events to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show one event
    Show {
        /// Event ID (UUID)
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve {
            max_retries,
            poll_interval_ms,
            drain,
        } => cmd_serve(config, max_retries, poll_interval_ms, drain).await,
        Command::Generate { interval_ms, count } => cmd_generate(config, interval_ms, count).await,
        Command::Event { action } => {
            let db = connect(&config).await?;
            match action {
                EventAction::Add { event_type, data } => cmd_event_add(db, event_type, data).await,
                EventAction::List { status, limit } => cmd_event_list(&db, status, limit).await,
                EventAction::Show { id } => cmd_event_show(&db, id).await,
            }
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<Db> {
    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    Ok(db)
}

fn telemetry(config: &Config) -> anyhow::Result<TelemetryGuard> {
    Ok(init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "eventq".to_string(),
        log_level: config.log_level.clone(),
    })?)
}

async fn cmd_serve(
    config: Config,
    max_retries: Option<u32>,
    poll_interval_ms: Option<u64>,
    drain: bool,
) -> anyhow::Result<()> {
    let _guard = telemetry(&config)?;

    let mut worker_config = config.worker.clone();
    if let Some(n) = max_retries {
        anyhow::ensure!(n > 0, "--max-retries must be at least 1");
        worker_config.max_retries = n;
    }
    if let Some(ms) = poll_interval_ms {
        worker_config.poll_interval = Duration::from_millis(ms);
    }
    if drain {
        worker_config.sleep_when_busy = false;
    }

    let db = connect(&config).await?;
    let worker = Worker::new(
        Arc::new(db),
        Arc::new(HandlerRegistry::with_defaults()),
        worker_config,
    );

    let shutdown = worker.shutdown_token();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        shutdown.cancel();
    });

    worker.start().await;
    Ok(())
}

async fn cmd_generate(config: Config, interval_ms: u64, count: Option<u64>) -> anyhow::Result<()> {
    let _guard = telemetry(&config)?;
    let producer = Producer::new(Arc::new(connect(&config).await?));

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let mut sent = 0u64;
    while count.is_none_or(|n| sent < n) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {}
        }

        let event_type = EventType::ALL[(sent as usize) % EventType::ALL.len()];
        let data = synthetic_payload(event_type);
        // One bad insert should not stop the generator.
        if let Err(e) = producer.add_event(event_type, data).await {
            tracing::warn!(error = %e, "generate: insert failed");
        }
        sent += 1;
    }

    println!("{sent} event(s) generated");
    Ok(())
}

fn synthetic_payload(event_type: EventType) -> Payload {
    let value = match event_type {
        EventType::NewToken => serde_json::json!({
            "tokenId": "123",
            "name": "MyToken",
            "eventType": event_type.as_str(),
        }),
    };
    value.as_object().cloned().unwrap_or_default()
}

async fn cmd_event_add(db: Db, event_type: String, data: Option<String>) -> anyhow::Result<()> {
    let event_type: EventType = event_type.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let data: Payload = match data {
        Some(json) => match serde_json::from_str(&json)? {
            serde_json::Value::Object(map) => map,
            other => anyhow::bail!("--data must be a JSON object, got {other}"),
        },
        None => Payload::new(),
    };

    Producer::new(Arc::new(db)).add_event(event_type, data).await?;
    println!("Queued: {event_type}");
    Ok(())
}

async fn cmd_event_list(db: &Db, status: Option<String>, limit: i64) -> anyhow::Result<()> {
    let status: Option<EventStatus> = match status {
        Some(s) => Some(s.parse().map_err(|e: String| anyhow::anyhow!(e))?),
        None => None,
    };

    let events = db.list_events(status, limit).await?;
    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<12}  {:<10}  {:<7}  CREATED",
        "ID", "TYPE", "STATUS", "RETRIES"
    );
    println!("{}", "-".repeat(90));
    for event in &events {
        println!(
            "{:<36}  {:<12}  {:<10}  {:<7}  {}",
            event.id,
            event.event_type,
            event.status,
            event.retries,
            event.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!("\n{} event(s)", events.len());
    Ok(())
}

async fn cmd_event_show(db: &Db, id: String) -> anyhow::Result<()> {
    let id: EventId = id.parse()?;
    let event = db.get_event(id).await?;
    print_event(&event)
}

fn print_event(event: &QueueEvent) -> anyhow::Result<()> {
    println!("ID:       {}", event.id);
    println!("Type:     {}", event.event_type);
    println!("Status:   {}", event.status);
    println!("Retries:  {}", event.retries);
    println!("Data:     {}", serde_json::to_string_pretty(&event.data)?);
    println!("Created:  {}", event.created_at);
    println!("Updated:  {}", event.updated_at);
    Ok(())
}
