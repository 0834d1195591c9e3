//! TCP server for the session sync service.
//!
//! Accepts line-delimited JSON clients, enforces the handshake and
//! per-client monotonic `seq`, stores uploaded session blobs per user id
//! and streams observations to subscribed clients.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::protocol::*;
use crate::core::campaign;
use crate::core::snapshot::SessionSnapshot;

/// Upper bound on distinct user ids held in the save store.
const MAX_SAVED_USERS: usize = 256;

/// Stable 64-bit FNV-1a hasher for deterministic `state_hash`.
///
/// We avoid `DefaultHasher` here since its output is not guaranteed stable
/// across Rust versions/platforms.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl std::hash::Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let mut end = 0usize;
    for b in rest.as_bytes() {
        if b.is_ascii_digit() {
            end += 1;
        } else {
            break;
        }
    }
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending: 16,
        }
    }
}

impl ServerConfig {
    /// Read settings from `ESTATES_SYNC_*` environment variables.
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("ESTATES_SYNC_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("ESTATES_SYNC_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7878);
        let max_pending = env::var("ESTATES_SYNC_MAX_PENDING")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(16);

        Self {
            host,
            port,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending,
        }
    }

    /// Check if the service is disabled via environment.
    pub fn is_disabled() -> bool {
        std::env::var("ESTATES_SYNC_DISABLED")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Shared server state
struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    saves: RwLock<HashMap<String, SessionBlob>>,
    client_count: Arc<AtomicUsize>,
}

impl ServerState {
    fn new(config: ServerConfig, client_count: Arc<AtomicUsize>) -> Self {
        Self {
            config,
            clients: RwLock::new(Vec::new()),
            saves: RwLock::new(HashMap::new()),
            client_count,
        }
    }
}

async fn is_handshaken(state: &Arc<ServerState>, client_id: u64) -> bool {
    let clients = state.clients.read().await;
    clients
        .iter()
        .find(|c| c.id == client_id)
        .map(|c| c.handshaken)
        .unwrap_or(false)
}

async fn check_and_update_seq(state: &Arc<ServerState>, client_id: u64, seq: u64) -> bool {
    let mut clients = state.clients.write().await;
    let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
        return true;
    };

    match client.last_seq {
        None => {
            client.last_seq = Some(seq);
            true
        }
        Some(prev) => {
            if seq <= prev {
                false
            } else {
                client.last_seq = Some(seq);
                true
            }
        }
    }
}

/// Handle to a connected client
struct ClientHandle {
    id: u64,
    stream_observations: bool,
    handshaken: bool,
    last_seq: Option<u64>,
    tx: mpsc::Sender<ClientOutbound>,
}

#[derive(Debug, Clone)]
enum ClientOutbound {
    Welcome(WelcomeMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
    Save(Box<SaveMessage>),
    Observation(Box<ObservationMessage>),
}

/// Message published by the game loop for delivery to clients.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Broadcast(Box<ObservationMessage>),
}

/// Start the TCP server.
///
/// `ready_tx`, when present, receives the bound address once the listener
/// is up; tests use it to discover an ephemeral port.
pub async fn run_server(
    config: ServerConfig,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    client_count: Arc<AtomicUsize>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr).await?;
    let bound = listener.local_addr()?;
    log::info!("sync service listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config, client_count));
    let mut client_id_counter = 0u64;

    // Observation dispatcher. Slow clients drop observations rather than
    // stalling the publisher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                match msg {
                    OutboundMessage::Broadcast(obs) => {
                        let clients = state.clients.read().await;
                        for c in clients.iter() {
                            if !c.stream_observations {
                                continue;
                            }
                            if c.tx
                                .try_send(ClientOutbound::Observation(obs.clone()))
                                .is_err()
                            {
                                log::debug!("client {} lagging, observation dropped", c.id);
                            }
                        }
                    }
                }
            }
        });
    }

    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        log::info!("client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, addr, client_id, Arc::clone(&state)).await {
                log::warn!("client {} error: {}", client_id, e);
            }
            log::info!("client {} disconnected", client_id);
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: u64,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::channel::<ClientOutbound>(state.config.max_pending);

    {
        let mut clients = state.clients.write().await;
        clients.push(ClientHandle {
            id: client_id,
            stream_observations: false,
            handshaken: false,
            last_seq: None,
            tx: tx.clone(),
        });
        state.client_count.store(clients.len(), Ordering::Relaxed);
    }
    log::debug!("client {} registered ({})", client_id, addr);

    // Writer task serializes outbound messages onto the socket, one JSON
    // object per line.
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            let encoded = match &msg {
                ClientOutbound::Welcome(v) => serde_json::to_writer(&mut buf, v),
                ClientOutbound::Ack(v) => serde_json::to_writer(&mut buf, v),
                ClientOutbound::Error(v) => serde_json::to_writer(&mut buf, v),
                ClientOutbound::Save(v) => serde_json::to_writer(&mut buf, v.as_ref()),
                ClientOutbound::Observation(v) => serde_json::to_writer(&mut buf, v.as_ref()),
            };
            if encoded.is_err() {
                continue;
            }
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    // Direct replies wait for queue room; only observations are lossy.
    let reply_tx = tx.clone();
    let reply = move |msg: ClientOutbound| {
        let tx = reply_tx.clone();
        async move {
            let _ = tx.send(msg).await;
        }
    };

    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                // A repeated hello is subject to seq enforcement like any
                // other message.
                if is_handshaken(&state, client_id).await
                    && !check_and_update_seq(&state, client_id, hello.seq).await
                {
                    reply(ClientOutbound::Error(create_error(
                        hello.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    )))
                    .await;
                    continue;
                }

                if !hello.protocol_version.starts_with("1.") {
                    reply(ClientOutbound::Error(create_error(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("protocol version {} not supported", hello.protocol_version),
                    )))
                    .await;
                    break;
                }

                {
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                        client.stream_observations = hello.requested.stream_observations;
                    }
                }
                log::info!(
                    "client {} handshake complete ({} v{})",
                    client_id,
                    hello.client.name,
                    hello.client.version
                );

                reply(ClientOutbound::Welcome(create_welcome(
                    hello.seq,
                    &state.config.protocol_version,
                    client_id,
                )))
                .await;
            }

            Ok(ParsedMessage::Sync(sync)) => {
                if !is_handshaken(&state, client_id).await {
                    reply(ClientOutbound::Error(create_error(
                        sync.seq,
                        ErrorCode::HandshakeRequired,
                        "send hello before sync",
                    )))
                    .await;
                    continue;
                }
                if !check_and_update_seq(&state, client_id, sync.seq).await {
                    reply(ClientOutbound::Error(create_error(
                        sync.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    )))
                    .await;
                    continue;
                }

                // Reject blobs the engine could not be rebuilt from.
                let valid = sync.session.to_snapshot().is_some()
                    && campaign::level(sync.session.level).is_some();
                if !valid {
                    reply(ClientOutbound::Error(create_error(
                        sync.seq,
                        ErrorCode::InvalidSession,
                        "session blob is not restorable",
                    )))
                    .await;
                    continue;
                }

                {
                    let mut saves = state.saves.write().await;
                    if saves.len() >= MAX_SAVED_USERS && !saves.contains_key(&sync.user) {
                        drop(saves);
                        reply(ClientOutbound::Error(create_error(
                            sync.seq,
                            ErrorCode::Backpressure,
                            "save store is full",
                        )))
                        .await;
                        continue;
                    }
                    saves.insert(sync.user.clone(), sync.session.clone());
                }
                log::info!(
                    "client {} saved session for user {} (level {}, score {})",
                    client_id,
                    sync.user,
                    sync.session.level,
                    sync.session.score
                );

                reply(ClientOutbound::Ack(create_ack(sync.seq))).await;
            }

            Ok(ParsedMessage::Restore(restore)) => {
                if !is_handshaken(&state, client_id).await {
                    reply(ClientOutbound::Error(create_error(
                        restore.seq,
                        ErrorCode::HandshakeRequired,
                        "send hello before restore",
                    )))
                    .await;
                    continue;
                }
                if !check_and_update_seq(&state, client_id, restore.seq).await {
                    reply(ClientOutbound::Error(create_error(
                        restore.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    )))
                    .await;
                    continue;
                }

                let blob = {
                    let saves = state.saves.read().await;
                    saves.get(&restore.user).cloned()
                };

                match blob {
                    Some(session) => {
                        log::info!(
                            "client {} restored session for user {}",
                            client_id,
                            restore.user
                        );
                        reply(ClientOutbound::Save(Box::new(create_save(
                            restore.seq,
                            &restore.user,
                            session,
                        ))))
                        .await;
                    }
                    None => {
                        reply(ClientOutbound::Error(create_error(
                            restore.seq,
                            ErrorCode::UnknownUser,
                            &format!("no save stored for user {}", restore.user),
                        )))
                        .await;
                    }
                }
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                if is_handshaken(&state, client_id).await
                    && !check_and_update_seq(&state, client_id, unknown.seq).await
                {
                    reply(ClientOutbound::Error(create_error(
                        unknown.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    )))
                    .await;
                    continue;
                }
                reply(ClientOutbound::Error(create_error(
                    unknown.seq,
                    ErrorCode::InvalidCommand,
                    "unknown message type",
                )))
                .await;
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                reply(ClientOutbound::Error(create_error(
                    seq,
                    ErrorCode::InvalidCommand,
                    &format!("JSON parse error: {}", e),
                )))
                .await;
            }
        }
    }

    {
        let mut clients = state.clients.write().await;
        clients.retain(|c| c.id != client_id);
        state.client_count.store(clients.len(), Ordering::Relaxed);
    }

    drop(reply);
    drop(tx);
    let _ = write_task.await;

    Ok(())
}

/// Build an observation message from a session snapshot.
pub fn build_observation(snap: &SessionSnapshot, seq: u64) -> ObservationMessage {
    use std::hash::{Hash, Hasher};

    let mut hasher = Fnv1aHasher::new();
    for cell in snap.cells.iter() {
        cell.hash(&mut hasher);
    }
    snap.level.hash(&mut hasher);
    snap.score.hash(&mut hasher);
    snap.target_score.hash(&mut hasher);
    snap.moves_remaining.hash(&mut hasher);
    (snap.status as u8).hash(&mut hasher);
    (snap.gravity as u8).hash(&mut hasher);
    snap.resources.hash(&mut hasher);
    snap.rng_state.hash(&mut hasher);
    let state_hash = StateHash(hasher.finish());

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        playable: snap.status == crate::types::GameStatus::Playing,
        session: SessionBlob::from(snap),
        state_hash,
    }
}
