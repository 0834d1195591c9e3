//! Blocking observer client for the session sync service.
//!
//! `tui-estates observe` attaches to a running game, subscribes to
//! observation broadcasts and renders them read-only.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::adapter::protocol::{create_hello, ObservationMessage};
use crate::core::snapshot::SessionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserveConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub enum ObserveEvent {
    Welcome,
    Observation(Box<ObservationMessage>),
    Error(String),
    Closed,
}

pub fn parse_observe_args(args: &[String]) -> Result<Option<ObserveConfig>> {
    if args.is_empty() || args[0] != "observe" {
        return Ok(None);
    }

    let mut host = String::from("127.0.0.1");
    let mut port: u16 = 7878;
    let mut i = 1usize;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| anyhow!("observe: missing value for --host"))?;
                host = v.clone();
            }
            "--port" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| anyhow!("observe: missing value for --port"))?;
                port = v
                    .parse::<u16>()
                    .map_err(|_| anyhow!("observe: invalid --port value: {}", v))?;
            }
            other => {
                return Err(anyhow!("observe: unknown argument: {}", other));
            }
        }
        i += 1;
    }

    Ok(Some(ObserveConfig { host, port }))
}

pub fn connect_observer(config: &ObserveConfig) -> Result<mpsc::Receiver<ObserveEvent>> {
    let mut stream = TcpStream::connect((config.host.as_str(), config.port)).map_err(|e| {
        anyhow!(
            "observe: connect {}:{} failed: {}",
            config.host,
            config.port,
            e
        )
    })?;
    stream
        .set_nodelay(true)
        .map_err(|e| anyhow!("observe: set_nodelay failed: {}", e))?;

    let hello = create_hello(1, "tui-estates-observe", true);
    let line = serde_json::to_string(&hello)?;
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let (tx, rx) = mpsc::channel::<ObserveEvent>();
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    let _ = tx.send(ObserveEvent::Error(format!("observe: read error: {}", e)));
                    let _ = tx.send(ObserveEvent::Closed);
                    return;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Some(event) = parse_server_line(&line) {
                let _ = tx.send(event);
            }
        }
        let _ = tx.send(ObserveEvent::Closed);
    });

    Ok(rx)
}

pub fn observe_status_lines(
    config: &ObserveConfig,
    obs: Option<&ObservationMessage>,
) -> [String; 5] {
    let (state, level, score, hash) = match obs {
        Some(o) => {
            let state = if o.playable { "PLAY" } else { "STOPPED" };
            (
                state.to_string(),
                o.session.level.to_string(),
                format!("{}/{}", o.session.score, o.session.target_score),
                format!("{:016x}", o.state_hash.0),
            )
        }
        None => (
            "WAITING".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
        ),
    };

    [
        "MODE OBSERVE".to_string(),
        format!("TARGET {}:{}", config.host, config.port),
        format!("STATE {}", state),
        format!("LEVEL {} SCORE {}", level, score),
        format!("HASH {}", hash),
    ]
}

/// Rebuild a renderable snapshot; `None` when the blob is inconsistent.
pub fn snapshot_from_observation(obs: &ObservationMessage) -> Option<SessionSnapshot> {
    obs.session.to_snapshot()
}

pub fn wait_for_welcome(
    rx: &mpsc::Receiver<ObserveEvent>,
    timeout: Duration,
) -> Result<Option<Box<ObservationMessage>>> {
    let deadline = std::time::Instant::now() + timeout;
    let mut first_obs: Option<Box<ObservationMessage>> = None;

    loop {
        if std::time::Instant::now() >= deadline {
            return Err(anyhow!("observe: did not receive welcome"));
        }
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(ObserveEvent::Welcome) => break,
            Ok(ObserveEvent::Observation(obs)) => first_obs = Some(obs),
            Ok(ObserveEvent::Error(msg)) => return Err(anyhow!(msg)),
            Ok(ObserveEvent::Closed) => return Err(anyhow!("observe: connection closed")),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("observe: event channel disconnected"));
            }
        }
    }

    // Grab an observation the server may have queued right behind the
    // welcome, without blocking on one.
    while let Ok(event) = rx.try_recv() {
        match event {
            ObserveEvent::Observation(obs) => {
                first_obs = Some(obs);
                break;
            }
            ObserveEvent::Welcome => {}
            ObserveEvent::Error(msg) => return Err(anyhow!(msg)),
            ObserveEvent::Closed => return Err(anyhow!("observe: connection closed")),
        }
    }
    Ok(first_obs)
}

fn parse_server_line(line: &str) -> Option<ObserveEvent> {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(ObserveEvent::Error(format!("observe: invalid json: {}", e))),
    };
    let msg_type = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match msg_type {
        "welcome" => Some(ObserveEvent::Welcome),
        "observation" => match serde_json::from_str::<ObservationMessage>(line) {
            Ok(obs) => Some(ObserveEvent::Observation(Box::new(obs))),
            Err(e) => Some(ObserveEvent::Error(format!(
                "observe: invalid observation: {}",
                e
            ))),
        },
        "error" => {
            let code = value
                .get("code")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let msg = value.get("message").and_then(|v| v.as_str()).unwrap_or("");
            Some(ObserveEvent::Error(format!(
                "observe: server error {} {}",
                code, msg
            )))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::server::build_observation;
    use crate::types::TileKind;

    fn sample_snapshot() -> SessionSnapshot {
        let mut snap = SessionSnapshot::default();
        snap.level = 2;
        snap.score = 60;
        snap.target_score = 150;
        snap.moves_remaining = 12;
        snap.rng_state = 3;
        for cell in snap.cells.iter_mut() {
            cell.kind = Some(TileKind::House);
        }
        snap
    }

    #[test]
    fn test_parse_observe_args_host_port() {
        let args = vec![
            "observe".to_string(),
            "--host".to_string(),
            "0.0.0.0".to_string(),
            "--port".to_string(),
            "9001".to_string(),
        ];
        let cfg = parse_observe_args(&args).unwrap().unwrap();
        assert_eq!(
            cfg,
            ObserveConfig {
                host: "0.0.0.0".to_string(),
                port: 9001
            }
        );
    }

    #[test]
    fn test_parse_observe_args_defaults_and_rejects() {
        let cfg = parse_observe_args(&["observe".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(cfg.port, 7878);
        assert!(parse_observe_args(&[]).unwrap().is_none());
        assert!(parse_observe_args(&["observe".to_string(), "--speed".to_string()]).is_err());
    }

    #[test]
    fn test_parse_server_line_dispatch() {
        let welcome = r#"{"type":"welcome","seq":1,"ts":0,"protocol_version":"1.0.0","client_id":1,"game_id":"tui-estates"}"#;
        assert!(matches!(
            parse_server_line(welcome),
            Some(ObserveEvent::Welcome)
        ));

        let err = r#"{"type":"error","seq":2,"ts":0,"code":"unknown_user","message":"no save"}"#;
        match parse_server_line(err) {
            Some(ObserveEvent::Error(msg)) => assert!(msg.contains("unknown_user")),
            other => panic!("expected error event, got {:?}", other),
        }

        assert!(parse_server_line(r#"{"type":"ack","seq":3,"ts":0,"status":"ok"}"#).is_none());
    }

    #[test]
    fn test_observation_round_trips_to_snapshot() {
        let snap = sample_snapshot();
        let obs = build_observation(&snap, 4);
        let json = serde_json::to_string(&obs).unwrap();
        match parse_server_line(&json) {
            Some(ObserveEvent::Observation(parsed)) => {
                let restored = snapshot_from_observation(&parsed).unwrap();
                assert_eq!(restored.level, snap.level);
                assert_eq!(restored.score, snap.score);
                assert_eq!(restored.cells[0].kind, Some(TileKind::House));
            }
            other => panic!("expected observation, got {:?}", other),
        }
    }

    #[test]
    fn test_status_lines() {
        let cfg = ObserveConfig {
            host: "127.0.0.1".to_string(),
            port: 7878,
        };
        let lines = observe_status_lines(&cfg, None);
        assert_eq!(lines[0], "MODE OBSERVE");
        assert_eq!(lines[2], "STATE WAITING");

        let obs = build_observation(&sample_snapshot(), 1);
        let lines = observe_status_lines(&cfg, Some(&obs));
        assert_eq!(lines[2], "STATE PLAY");
        assert_eq!(lines[3], "LEVEL 2 SCORE 60/150");
    }
}
