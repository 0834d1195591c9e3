//! Wire protocol for the session sync service.
//!
//! Line-delimited JSON messages over TCP. Clients handshake with `hello`,
//! then upload their session under a user id with `sync` and fetch it back
//! with `restore`. The server answers with `welcome`, `ack`, `save` and
//! `error`, and streams `observation` messages to subscribed clients after
//! every action.

use arrayvec::ArrayVec;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::core::snapshot::{CellSnapshot, SessionSnapshot};
use crate::types::{
    GameStatus, GravityDirection, ObstacleKind, SpecialKind, TileKind, UpgradeFlags, GRID_CELLS,
    RESOURCE_KINDS,
};

/// Protocol version spoken by this build. Major version must match.
pub const PROTOCOL_VERSION: &str = "1.0.0";

// ============== String-named enum fields ==============

// Domain enums cross the wire by their canonical lowercase names so that
// blobs stay readable and the core types stay serde-free.
macro_rules! name_codec {
    ($wrapper:ident, $inner:ty, $what:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $wrapper(pub $inner);

        impl Serialize for $wrapper {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.0.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct V;

                impl<'de> Visitor<'de> for V {
                    type Value = $wrapper;

                    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                        f.write_str($what)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        <$inner>::from_str(v).map($wrapper).ok_or_else(|| {
                            E::custom(format!("unknown {}: {}", $what, v))
                        })
                    }
                }

                deserializer.deserialize_str(V)
            }
        }
    };
}

name_codec!(TileName, TileKind, "tile kind");
name_codec!(SpecialName, SpecialKind, "special kind");
name_codec!(ObstacleName, ObstacleKind, "obstacle kind");
name_codec!(StatusName, GameStatus, "game status");
name_codec!(GravityName, GravityDirection, "gravity direction");

// ============== Session blob ==============

/// One grid cell on the wire. Tiles carry `k` (and `s` for specials),
/// obstacles carry `o` (and `c` for their remaining counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WireCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<TileName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<SpecialName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o: Option<ObstacleName>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub c: u8,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

impl From<&CellSnapshot> for WireCell {
    fn from(snap: &CellSnapshot) -> Self {
        Self {
            k: snap.kind.map(TileName),
            s: snap.special.map(SpecialName),
            o: snap.obstacle.map(ObstacleName),
            c: snap.counter,
        }
    }
}

impl WireCell {
    fn to_cell_snapshot(self) -> CellSnapshot {
        CellSnapshot {
            kind: self.k.map(|n| n.0),
            special: self.s.map(|n| n.0),
            obstacle: self.o.map(|n| n.0),
            counter: self.c,
            fresh: false,
        }
    }
}

/// Fixed-capacity cell list. Inputs longer than the grid are rejected
/// during deserialization instead of allocating.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellList(pub ArrayVec<WireCell, GRID_CELLS>);

impl Serialize for CellList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for CellList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;

        impl<'de> Visitor<'de> for V {
            type Value = CellList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a list of at most {} cells", GRID_CELLS)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut cells = ArrayVec::new();
                while let Some(cell) = seq.next_element::<WireCell>()? {
                    cells
                        .try_push(cell)
                        .map_err(|_| de::Error::custom("too many cells"))?;
                }
                Ok(CellList(cells))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireFlags {
    #[serde(default)]
    pub extra_moves: bool,
    #[serde(default)]
    pub score_boost: bool,
    #[serde(default)]
    pub resource_yield: bool,
    #[serde(default)]
    pub special_threshold: bool,
    #[serde(default)]
    pub special_chance: bool,
}

impl From<UpgradeFlags> for WireFlags {
    fn from(flags: UpgradeFlags) -> Self {
        Self {
            extra_moves: flags.extra_moves,
            score_boost: flags.score_boost,
            resource_yield: flags.resource_yield,
            special_threshold: flags.special_threshold,
            special_chance: flags.special_chance,
        }
    }
}

impl From<WireFlags> for UpgradeFlags {
    fn from(flags: WireFlags) -> Self {
        Self {
            extra_moves: flags.extra_moves,
            score_boost: flags.score_boost,
            resource_yield: flags.resource_yield,
            special_threshold: flags.special_threshold,
            special_chance: flags.special_chance,
        }
    }
}

/// Full session state as stored and shipped by the sync service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBlob {
    pub level: u32,
    pub score: u32,
    #[serde(rename = "target_score")]
    pub target_score: u32,
    #[serde(rename = "moves_remaining")]
    pub moves_remaining: u32,
    pub status: StatusName,
    pub gravity: GravityName,
    pub resources: [u32; RESOURCE_KINDS],
    #[serde(rename = "rng_state")]
    pub rng_state: u32,
    #[serde(default)]
    pub flags: WireFlags,
    pub cells: CellList,
}

impl From<&SessionSnapshot> for SessionBlob {
    fn from(snap: &SessionSnapshot) -> Self {
        let mut cells = ArrayVec::new();
        for cell in snap.cells.iter() {
            // Capacity matches GRID_CELLS exactly.
            let _ = cells.try_push(WireCell::from(cell));
        }
        Self {
            level: snap.level,
            score: snap.score,
            target_score: snap.target_score,
            moves_remaining: snap.moves_remaining,
            status: StatusName(snap.status),
            gravity: GravityName(snap.gravity),
            resources: snap.resources,
            rng_state: snap.rng_state,
            flags: WireFlags::from(snap.flags),
            cells: CellList(cells),
        }
    }
}

impl SessionBlob {
    /// Rebuild a snapshot; `None` when the cell list has the wrong length
    /// or any cell is inconsistent.
    pub fn to_snapshot(&self) -> Option<SessionSnapshot> {
        if self.cells.0.len() != GRID_CELLS {
            return None;
        }
        let mut snap = SessionSnapshot {
            level: self.level,
            score: self.score,
            target_score: self.target_score,
            moves_remaining: self.moves_remaining,
            status: self.status.0,
            gravity: self.gravity.0,
            resources: self.resources,
            rng_state: self.rng_state,
            flags: UpgradeFlags::from(self.flags),
            ..SessionSnapshot::default()
        };
        for (slot, cell) in snap.cells.iter_mut().zip(self.cells.0.iter()) {
            let restored = cell.to_cell_snapshot();
            restored.to_cell()?;
            *slot = restored;
        }
        Some(snap)
    }
}

// ============== State hash ==============

/// Stable 64-bit state digest, hex-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // 16 hex digits, no heap.
        let mut buf = [0u8; 16];
        let mut v = self.0;
        for slot in buf.iter_mut().rev() {
            let digit = (v & 0xf) as u8;
            *slot = if digit < 10 {
                b'0' + digit
            } else {
                b'a' + (digit - 10)
            };
            v >>= 4;
        }
        match std::str::from_utf8(&buf) {
            Ok(s) => serializer.serialize_str(s),
            Err(_) => Err(serde::ser::Error::custom("invalid hash encoding")),
        }
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;

        impl<'de> Visitor<'de> for V {
            type Value = StateHash;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a hex-encoded 64-bit hash")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                u64::from_str_radix(v, 16)
                    .map(StateHash)
                    .map_err(|_| E::custom(format!("invalid state hash: {}", v)))
            }
        }

        deserializer.deserialize_str(V)
    }
}

// ============== Message envelopes ==============

// The parse enum in [`parse_message`] is internally tagged, which strips
// the `type` field before the payload struct sees it; the payload's
// `msg_type` therefore needs a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HelloType {
    #[serde(rename = "hello")]
    Hello,
}

impl Default for HelloType {
    fn default() -> Self {
        Self::Hello
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncType {
    #[serde(rename = "sync")]
    Sync,
}

impl Default for SyncType {
    fn default() -> Self {
        Self::Sync
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestoreType {
    #[serde(rename = "restore")]
    Restore,
}

impl Default for RestoreType {
    fn default() -> Self {
        Self::Restore
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveType {
    #[serde(rename = "save")]
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    #[serde(rename = "stream_observations", default)]
    pub stream_observations: bool,
}

/// Client handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type", default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    #[serde(rename = "protocol_version")]
    pub protocol_version: String,
    #[serde(default)]
    pub requested: RequestedCapabilities,
}

/// Server handshake reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    #[serde(rename = "protocol_version")]
    pub protocol_version: String,
    #[serde(rename = "client_id")]
    pub client_id: u64,
    #[serde(rename = "game_id")]
    pub game_id: String,
}

/// Client uploads its session under a user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMessage {
    #[serde(rename = "type", default)]
    pub msg_type: SyncType,
    pub seq: u64,
    pub ts: u64,
    pub user: String,
    pub session: SessionBlob,
}

/// Client asks for the blob stored under a user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreMessage {
    #[serde(rename = "type", default)]
    pub msg_type: RestoreType,
    pub seq: u64,
    pub ts: u64,
    pub user: String,
}

/// Server returns a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMessage {
    #[serde(rename = "type")]
    pub msg_type: SaveType,
    pub seq: u64,
    pub ts: u64,
    pub user: String,
    pub session: SessionBlob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "invalid_command")]
    InvalidCommand,
    #[serde(rename = "invalid_session")]
    InvalidSession,
    #[serde(rename = "unknown_user")]
    UnknownUser,
    #[serde(rename = "backpressure")]
    Backpressure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// Session snapshot streamed to subscribed clients after every action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub playable: bool,
    pub session: SessionBlob,
    #[serde(rename = "state_hash")]
    pub state_hash: StateHash,
}

// ============== Message parsing ==============

/// Parse one inbound line.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "sync")]
        Sync(Box<SyncMessage>),
        #[serde(rename = "restore")]
        Restore(RestoreMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Sync(m)) => Ok(ParsedMessage::Sync(m)),
        Ok(InboundMessage::Restore(m)) => Ok(ParsedMessage::Restore(m)),
        Err(e) => {
            // An unrecognized message type is not a hard parse error.
            #[derive(Debug, Deserialize)]
            struct TypeOnly<'a> {
                #[serde(rename = "type")]
                msg_type: Option<&'a str>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(json)?
                .msg_type
                .unwrap_or("unknown");
            if msg_type != "hello" && msg_type != "sync" && msg_type != "restore" {
                #[derive(Debug, Deserialize)]
                struct SeqOnly {
                    seq: Option<u64>,
                }
                let seq = serde_json::from_str::<SeqOnly>(json)?.seq.unwrap_or(0);
                return Ok(ParsedMessage::Unknown(UnknownMessage { seq }));
            }
            Err(e)
        }
    }
}

/// Parsed inbound message.
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Sync(Box<SyncMessage>),
    Restore(RestoreMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

// ============== Construction helpers ==============

pub fn create_hello(seq: u64, client_name: &str, stream_observations: bool) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: PROTOCOL_VERSION.to_string(),
        requested: RequestedCapabilities {
            stream_observations,
        },
    }
}

pub fn create_welcome(seq: u64, protocol_version: &str, client_id: u64) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id,
        game_id: "tui-estates".to_string(),
    }
}

pub fn create_sync(seq: u64, user: &str, session: SessionBlob) -> SyncMessage {
    SyncMessage {
        msg_type: SyncType::Sync,
        seq,
        ts: current_timestamp_ms(),
        user: user.to_string(),
        session,
    }
}

pub fn create_restore(seq: u64, user: &str) -> RestoreMessage {
    RestoreMessage {
        msg_type: RestoreType::Restore,
        seq,
        ts: current_timestamp_ms(),
        user: user.to_string(),
    }
}

pub fn create_save(seq: u64, user: &str, session: SessionBlob) -> SaveMessage {
    SaveMessage {
        msg_type: SaveType::Save,
        seq,
        ts: current_timestamp_ms(),
        user: user.to_string(),
        session,
    }
}

pub fn create_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
