//! waitlist-daemon: the waitlist admission service.
//!
//! Single OS process running a Tokio async runtime. The signup, referral and
//! share collaborators talk to it via JSON-RPC over a Unix socket.

mod commands;
mod config;
mod events;
mod rpc;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};
use waitlist_core::Waitlist;
use waitlist_types::events::{Event, EventType};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Admission and tier logic over the database.
    pub waitlist: Arc<Waitlist>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

/// Current Unix time in seconds.
pub(crate) fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("waitlist={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("Waitlist daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("waitlist.db");
    let conn = waitlist_db::open(&db_path)?;
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    // 3. Create event bus
    let event_bus = EventBus::new(config.advanced.event_buffer).with_subscription_limits(
        config.advanced.max_subscriptions,
        config.advanced.subscription_idle(),
    );

    // 4. Build the waitlist
    let schedule = config.tiers.schedule()?;
    let waitlist = Arc::new(Waitlist::new(
        db,
        schedule,
        config.rewards.clone(),
        Arc::new(event_bus.clone()),
    ));

    // 5. Create shutdown channel
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    let state = Arc::new(DaemonState {
        waitlist,
        config,
        event_bus,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 6. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    state.event_bus.emit(Event {
        event_type: EventType::DaemonStatus,
        timestamp: now(),
        payload: serde_json::json!({
            "status": "started",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    });

    // 7. Run the RPC server until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Daemon shutting down gracefully");

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
