//! Session sync service over TCP with a line-delimited JSON protocol.
//!
//! The running game embeds a small TCP server that lets external clients
//! save and restore sessions per user id and watch the board live:
//!
//! 1. **Connection**: client connects to the TCP socket (default
//!    127.0.0.1:7878)
//! 2. **Handshake**: client sends `hello`, server replies `welcome` after
//!    checking the protocol version
//! 3. **Save**: `sync` uploads the client's session blob under a user id,
//!    answered with `ack`
//! 4. **Restore**: `restore` fetches the stored blob back as a `save`
//!    message
//! 5. **Observation streaming**: subscribed clients receive an
//!    `observation` with the full session snapshot after every action
//!
//! Every inbound message carries a per-client strictly increasing `seq`;
//! violations are answered with an `error` envelope. Saved blobs live in
//! an in-memory per-user map owned by the service.
//!
//! # Environment variables
//!
//! - `ESTATES_SYNC_HOST`: bind address (default "127.0.0.1")
//! - `ESTATES_SYNC_PORT`: port number (default 7878)
//! - `ESTATES_SYNC_MAX_PENDING`: per-client outbound queue depth (default 16)
//! - `ESTATES_SYNC_DISABLED`: set to "1" or "true" to disable the service
//!
//! # Manual testing
//!
//! ```bash
//! nc 127.0.0.1 7878
//! {"type":"hello","seq":1,"ts":0,"client":{"name":"probe","version":"0.1.0"},"protocol_version":"1.0.0","requested":{"stream_observations":true}}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use tui_estates_core as core;
pub use tui_estates_types as types;

pub use protocol::*;
pub use runtime::Adapter;
pub use server::{build_observation, run_server, OutboundMessage, ServerConfig};
