//! Adapter runtime integration.
//!
//! Bridges the sync game loop with the async TCP server. The game loop
//! publishes a snapshot after every action; the server fans it out to
//! subscribed clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::core::snapshot::SessionSnapshot;
use crate::server::{build_observation, run_server, OutboundMessage, ServerConfig};

/// Running sync service instance owned by the game loop.
pub struct Adapter {
    _rt: Runtime,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    client_count: Arc<AtomicUsize>,
    seq: u64,
}

impl Adapter {
    /// Start the service from environment variables.
    ///
    /// Returns `None` when `ESTATES_SYNC_DISABLED` is set or the runtime
    /// cannot be created.
    pub fn start_from_env() -> Option<Self> {
        if ServerConfig::is_disabled() {
            log::info!("sync service disabled via ESTATES_SYNC_DISABLED");
            return None;
        }

        let config = ServerConfig::from_env();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let client_count = Arc::new(AtomicUsize::new(0));

        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("failed to create tokio runtime: {}", e);
                return None;
            }
        };

        let counter = Arc::clone(&client_count);
        rt.spawn(async move {
            if let Err(e) = run_server(config, out_rx, counter, None).await {
                log::error!("sync service stopped: {}", e);
            }
        });

        Some(Self {
            _rt: rt,
            out_tx,
            client_count,
            seq: 0,
        })
    }

    /// Broadcast the session snapshot to subscribed clients.
    pub fn publish(&mut self, snap: &SessionSnapshot) {
        self.seq += 1;
        let obs = build_observation(snap, self.seq);
        let _ = self.out_tx.send(OutboundMessage::Broadcast(Box::new(obs)));
    }

    /// Number of currently connected clients, for the status panel.
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }
}
