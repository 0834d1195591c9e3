//! Terminal property-puzzle runner (default binary).
//!
//! Cursor-driven crossterm front end over the match-3 engine, with the
//! session sync service running alongside. `tui-estates observe` attaches
//! to a running game instead and renders its observation stream.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};

use tui_estates::adapter::Adapter;
use tui_estates::core::Session;
use tui_estates::input::{handle_key_event, should_quit};
use tui_estates::observe::{
    connect_observer, observe_status_lines, parse_observe_args, snapshot_from_observation,
    wait_for_welcome, ObserveConfig, ObserveEvent,
};
use tui_estates::term::{
    AdapterStatusView, Cell, CellStyle, FrameBuffer, GameView, Rgb, TerminalRenderer, UiState,
    Viewport,
};
use tui_estates::types::{GameAction, GameStatus, UpgradeFlags, GRID_SIZE};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(config) = parse_observe_args(&args)? {
        return run_observe_mode(&config);
    }

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term);

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

fn time_seed() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos()
}

fn run(term: &mut TerminalRenderer) -> Result<()> {
    let mut session = Session::new(1, UpgradeFlags::default(), time_seed())?;
    let mut adapter = Adapter::start_from_env();

    let view = GameView::new(2, 1);
    let mut ui = UiState::default();
    let mut snap = tui_estates::core::SessionSnapshot::default();
    let mut fb = FrameBuffer::new(0, 0);

    if let Some(adapter) = adapter.as_mut() {
        session.snapshot_into(&mut snap);
        adapter.publish(&snap);
    }

    loop {
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        session.snapshot_into(&mut snap);
        let status = adapter.as_ref().map(|a| AdapterStatusView {
            enabled: true,
            client_count: a.client_count().min(u16::MAX as usize) as u16,
        });
        view.render_into_full(
            &snap,
            Some(&ui),
            status.as_ref(),
            Viewport::new(w, h),
            &mut fb,
        );
        term.draw_swap(&mut fb)?;

        // Turn-based game, so block on input; wake periodically to refresh
        // the client count in the side panel.
        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if should_quit(key) {
            return Ok(());
        }
        let Some(action) = handle_key_event(key) else {
            continue;
        };

        let acted = apply_action(&mut session, &mut ui, action);
        if acted {
            if let Some(adapter) = adapter.as_mut() {
                session.snapshot_into(&mut snap);
                adapter.publish(&snap);
            }
        }
    }
}

/// Apply one mapped action. Returns true when the session state changed.
fn apply_action(session: &mut Session, ui: &mut UiState, action: GameAction) -> bool {
    match action {
        GameAction::CursorUp => {
            ui.cursor.y = ui.cursor.y.saturating_sub(1);
            false
        }
        GameAction::CursorDown => {
            ui.cursor.y = (ui.cursor.y + 1).min(GRID_SIZE - 1);
            false
        }
        GameAction::CursorLeft => {
            ui.cursor.x = ui.cursor.x.saturating_sub(1);
            false
        }
        GameAction::CursorRight => {
            ui.cursor.x = (ui.cursor.x + 1).min(GRID_SIZE - 1);
            false
        }
        GameAction::Select => select(session, ui),
        GameAction::Activate => {
            ui.selected = None;
            match session.activate(ui.cursor) {
                Ok(report) => {
                    log::debug!("activation scored {}", report.score_delta);
                    true
                }
                Err(e) => {
                    log::debug!("activation rejected: {}", e);
                    false
                }
            }
        }
        GameAction::Restart => {
            ui.selected = None;
            match session.restart() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("restart failed: {}", e);
                    false
                }
            }
        }
        GameAction::NextLevel => {
            if session.status() != GameStatus::LevelComplete {
                return false;
            }
            ui.selected = None;
            match session.next_level() {
                Ok(()) => true,
                Err(e) => {
                    // Past the last campaign level.
                    log::info!("next level unavailable: {}", e);
                    false
                }
            }
        }
    }
}

fn select(session: &mut Session, ui: &mut UiState) -> bool {
    let cursor = ui.cursor;
    match ui.selected {
        Some(selected) if selected == cursor => {
            ui.selected = None;
            false
        }
        Some(selected) if selected.is_adjacent(cursor) => {
            ui.selected = None;
            match session.swap(selected, cursor) {
                Ok(report) => {
                    log::debug!("swap scored {}", report.score_delta);
                    true
                }
                Err(e) => {
                    log::debug!("swap rejected: {}", e);
                    false
                }
            }
        }
        Some(_) | None => {
            ui.selected = Some(cursor);
            false
        }
    }
}

fn run_observe_mode(config: &ObserveConfig) -> Result<()> {
    let rx = connect_observer(config)?;
    // Fail on stderr before raw mode if the handshake never completes.
    let first = wait_for_welcome(&rx, Duration::from_secs(5))?;

    let mut term = TerminalRenderer::new();
    term.enter()?;
    let result = observe_loop(config, &rx, first, &mut term);
    let _ = term.exit();
    result
}

fn observe_loop(
    config: &ObserveConfig,
    rx: &std::sync::mpsc::Receiver<ObserveEvent>,
    first: Option<Box<tui_estates::adapter::ObservationMessage>>,
    term: &mut TerminalRenderer,
) -> Result<()> {
    let view = GameView::new(2, 1);
    let mut fb = FrameBuffer::new(0, 0);
    let mut latest = first;

    loop {
        // Drain pending events so rendering keeps up with the stream.
        loop {
            match rx.try_recv() {
                Ok(ObserveEvent::Observation(obs)) => latest = Some(obs),
                Ok(ObserveEvent::Welcome) => {}
                Ok(ObserveEvent::Error(msg)) => log::warn!("{}", msg),
                Ok(ObserveEvent::Closed) => return Ok(()),
                Err(std::sync::mpsc::TryRecvError::Empty) => break,
                Err(std::sync::mpsc::TryRecvError::Disconnected) => return Ok(()),
            }
        }

        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        let obs = latest.as_deref();
        match obs.and_then(snapshot_from_observation) {
            Some(snap) => {
                view.render_into_full(&snap, None, None, Viewport::new(w, h), &mut fb);
            }
            None => {
                fb.resize(w, h);
                fb.clear(Cell::default());
            }
        }

        let style = CellStyle {
            fg: Rgb::new(200, 200, 200),
            bg: Rgb::new(0, 0, 0),
            bold: false,
            dim: false,
        };
        for (row, text) in observe_status_lines(config, obs).iter().enumerate() {
            fb.put_str(0, row as u16, text, style);
        }
        term.draw_swap(&mut fb)?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && should_quit(key) {
                    return Ok(());
                }
            }
        }
    }
}
