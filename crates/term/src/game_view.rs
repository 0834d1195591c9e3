//! GameView: maps a [`SessionSnapshot`] into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::core::campaign;
use crate::core::{CellSnapshot, SessionSnapshot};
use crate::fb::{CellStyle, FrameBuffer, Rgb};
use crate::types::{
    Coord, GameStatus, ObstacleKind, ResourceKind, SpecialKind, TileKind, GRID_SIZE,
};

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Player-side state the engine does not track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiState {
    pub cursor: Coord,
    pub selected: Option<Coord>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: Coord::new(3, 3),
            selected: None,
        }
    }
}

/// Sync-service status shown in the side panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatusView {
    pub enabled: bool,
    pub client_count: u16,
}

/// A lightweight terminal renderer for the puzzle board.
pub struct GameView {
    /// Board cell width in terminal columns.
    cell_w: u16,
    /// Board cell height in terminal rows.
    cell_h: u16,
    anchor_y: AnchorY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorY {
    Center,
    Top,
}

impl Default for GameView {
    fn default() -> Self {
        // 2x1 helps compensate for typical terminal glyph aspect ratio.
        Self {
            cell_w: 2,
            cell_h: 1,
            anchor_y: AnchorY::Center,
        }
    }
}

impl GameView {
    pub fn new(cell_w: u16, cell_h: u16) -> Self {
        Self {
            cell_w,
            cell_h,
            anchor_y: AnchorY::Center,
        }
    }

    pub fn with_anchor_y(mut self, anchor_y: AnchorY) -> Self {
        self.anchor_y = anchor_y;
        self
    }

    /// Render a snapshot into an existing framebuffer.
    ///
    /// This is the allocation-free hot path. Callers can reuse a framebuffer
    /// across frames and only resize when the terminal size changes.
    pub fn render_into(&self, snap: &SessionSnapshot, viewport: Viewport, fb: &mut FrameBuffer) {
        self.render_into_full(snap, None, None, viewport, fb);
    }

    pub fn render_into_full(
        &self,
        snap: &SessionSnapshot,
        ui: Option<&UiState>,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::default().into_cell(' '));

        let board_px_w = (GRID_SIZE as u16) * self.cell_w;
        let board_px_h = (GRID_SIZE as u16) * self.cell_h;
        let frame_w = board_px_w + 2;
        let frame_h = board_px_h + 2;

        let start_x = viewport.width.saturating_sub(frame_w) / 2;
        let start_y = match self.anchor_y {
            AnchorY::Center => viewport.height.saturating_sub(frame_h) / 2,
            AnchorY::Top => 0,
        };

        let border = CellStyle {
            fg: Rgb::new(200, 200, 200),
            bg: Rgb::new(0, 0, 0),
            bold: false,
            dim: false,
        };
        self.draw_border(fb, start_x, start_y, frame_w, frame_h, border);

        for y in 0..GRID_SIZE as u16 {
            for x in 0..GRID_SIZE as u16 {
                let cell = &snap.cells[(y as usize) * (GRID_SIZE as usize) + x as usize];
                let coord = Coord::new(x as u8, y as u8);
                let highlight = ui.map(|u| {
                    if u.cursor == coord {
                        Highlight::Cursor
                    } else if u.selected == Some(coord) {
                        Highlight::Selected
                    } else {
                        Highlight::None
                    }
                });
                self.draw_grid_cell(
                    fb,
                    start_x,
                    start_y,
                    x,
                    y,
                    cell,
                    highlight.unwrap_or(Highlight::None),
                );
            }
        }

        self.draw_side_panel(fb, snap, adapter, viewport, start_x, start_y, frame_w);

        match snap.status {
            GameStatus::LevelComplete => {
                let result =
                    campaign::level_result(snap.score, snap.target_score, snap.moves_remaining);
                let text = match result.stars {
                    3 => "LEVEL COMPLETE ***",
                    2 => "LEVEL COMPLETE **",
                    _ => "LEVEL COMPLETE *",
                };
                self.draw_overlay_text(fb, start_x, start_y, frame_w, frame_h, text);
            }
            GameStatus::GameOver => {
                self.draw_overlay_text(fb, start_x, start_y, frame_w, frame_h, "GAME OVER");
            }
            GameStatus::Playing => {}
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, snap: &SessionSnapshot, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(snap, viewport, &mut fb);
        fb
    }

    fn draw_border(&self, fb: &mut FrameBuffer, x: u16, y: u16, w: u16, h: u16, style: CellStyle) {
        if w < 2 || h < 2 {
            return;
        }

        fb.put_char(x, y, '┌', style);
        fb.put_char(x + w - 1, y, '┐', style);
        fb.put_char(x, y + h - 1, '└', style);
        fb.put_char(x + w - 1, y + h - 1, '┘', style);

        for dx in 1..w - 1 {
            fb.put_char(x + dx, y, '─', style);
            fb.put_char(x + dx, y + h - 1, '─', style);
        }
        for dy in 1..h - 1 {
            fb.put_char(x, y + dy, '│', style);
            fb.put_char(x + w - 1, y + dy, '│', style);
        }
    }

    fn draw_grid_cell(
        &self,
        fb: &mut FrameBuffer,
        start_x: u16,
        start_y: u16,
        x: u16,
        y: u16,
        cell: &CellSnapshot,
        highlight: Highlight,
    ) {
        let bg = match highlight {
            Highlight::Cursor => Rgb::new(90, 90, 130),
            Highlight::Selected => Rgb::new(110, 100, 40),
            Highlight::None => Rgb::new(30, 30, 40),
        };

        let px = start_x + 1 + x * self.cell_w;
        let py = start_y + 1 + y * self.cell_h;

        if let Some(obstacle) = cell.obstacle {
            let (fg, ch) = match obstacle {
                ObstacleKind::LockedGate => (Rgb::new(130, 130, 140), '▓'),
                ObstacleKind::FoundationBlock => (Rgb::new(160, 120, 90), '▒'),
                ObstacleKind::LockedCard => (Rgb::new(180, 160, 200), '?'),
            };
            let style = CellStyle {
                fg,
                bg,
                bold: false,
                dim: false,
            };
            fb.fill_rect(px, py, self.cell_w, self.cell_h, ch, style);
            if cell.counter > 0 && self.cell_w > 1 {
                fb.put_char(px + 1, py, (b'0' + cell.counter.min(9)) as char, style);
            }
            return;
        }

        let Some(kind) = cell.kind else {
            return;
        };
        let fg = tile_color(kind);
        let style = CellStyle {
            fg,
            bg,
            bold: highlight == Highlight::Cursor,
            dim: cell.fresh,
        };
        fb.fill_rect(px, py, self.cell_w, self.cell_h, '█', style);

        if let Some(special) = cell.special {
            let marker = match special {
                SpecialKind::RenovationBomb => '*',
                SpecialKind::MarketMixer => '%',
                SpecialKind::SkyscraperLeveller => '|',
                SpecialKind::UrbanRedevelopment => '+',
            };
            let marker_style = CellStyle {
                fg: Rgb::new(255, 255, 255),
                bg: fg,
                bold: true,
                dim: false,
            };
            fb.put_char(px, py, marker, marker_style);
        }
    }

    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        snap: &SessionSnapshot,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        start_x: u16,
        start_y: u16,
        frame_w: u16,
    ) {
        let panel_x = start_x.saturating_add(frame_w).saturating_add(2);
        if panel_x >= viewport.width {
            return;
        }
        let panel_w = viewport.width - panel_x;
        if panel_w < 12 {
            return;
        }

        let label = CellStyle {
            fg: Rgb::new(220, 220, 220),
            bg: Rgb::new(0, 0, 0),
            bold: true,
            dim: false,
        };
        let value = CellStyle {
            fg: Rgb::new(200, 200, 200),
            bg: Rgb::new(0, 0, 0),
            bold: false,
            dim: false,
        };
        let dim = CellStyle { dim: true, ..value };

        let mut y = start_y;
        fb.put_str(panel_x, y, "LEVEL", label);
        fb.put_u32(panel_x + 6, y, snap.level, value);
        y = y.saturating_add(1);
        if let Some(config) = campaign::level(snap.level) {
            fb.put_str(panel_x, y, config.name, dim);
        }
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "SCORE", label);
        y = y.saturating_add(1);
        fb.put_u32(panel_x, y, snap.score, value);
        fb.put_str(panel_x + 6, y, "/", dim);
        fb.put_u32(panel_x + 8, y, snap.target_score, dim);
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "MOVES", label);
        y = y.saturating_add(1);
        fb.put_u32(panel_x, y, snap.moves_remaining, value);
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "GRAVITY", label);
        y = y.saturating_add(1);
        fb.put_str(panel_x, y, snap.gravity.as_str(), value);
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "RESOURCES", label);
        y = y.saturating_add(1);
        for kind in [
            ResourceKind::Lumber,
            ResourceKind::Brick,
            ResourceKind::Steel,
            ResourceKind::Cash,
            ResourceKind::Glass,
            ResourceKind::Concrete,
        ] {
            if y >= viewport.height {
                break;
            }
            fb.put_str(panel_x, y, resource_label(kind), dim);
            fb.put_u32(panel_x + 4, y, snap.resources[kind.index()], value);
            y = y.saturating_add(1);
        }

        y = y.saturating_add(1);
        fb.put_str(panel_x, y, "SYNC", label);
        y = y.saturating_add(1);
        match adapter {
            Some(st) if st.enabled => {
                fb.put_str(panel_x, y, "ON", value);
                if panel_w >= 16 {
                    fb.put_str(panel_x + 3, y, "clients", dim);
                    fb.put_u32(panel_x + 11, y, st.client_count as u32, value);
                }
            }
            _ => {
                fb.put_str(panel_x, y, "OFF", value);
            }
        }
    }

    fn draw_overlay_text(
        &self,
        fb: &mut FrameBuffer,
        start_x: u16,
        start_y: u16,
        frame_w: u16,
        frame_h: u16,
        text: &str,
    ) {
        let mid_y = start_y.saturating_add(frame_h / 2);
        let text_w = text.chars().count() as u16;
        let x = start_x.saturating_add(frame_w.saturating_sub(text_w) / 2);
        let style = CellStyle {
            fg: Rgb::new(255, 255, 255),
            bg: Rgb::new(0, 0, 0),
            bold: true,
            dim: false,
        };
        fb.put_str(x, mid_y, text, style);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Highlight {
    None,
    Cursor,
    Selected,
}

fn tile_color(kind: TileKind) -> Rgb {
    match kind {
        TileKind::House => Rgb::new(100, 220, 120),
        TileKind::Apartment => Rgb::new(80, 120, 220),
        TileKind::Condo => Rgb::new(240, 220, 80),
        TileKind::Townhouse => Rgb::new(220, 80, 80),
        TileKind::Villa => Rgb::new(200, 120, 220),
        TileKind::Commercial => Rgb::new(80, 220, 220),
    }
}

fn resource_label(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Lumber => "LUM",
        ResourceKind::Brick => "BRK",
        ResourceKind::Steel => "STL",
        ResourceKind::Cash => "CSH",
        ResourceKind::Glass => "GLS",
        ResourceKind::Concrete => "CNC",
        ResourceKind::Marble => "MRB",
        ResourceKind::Copper => "CPR",
        ResourceKind::Gold => "GLD",
    }
}

trait IntoCell {
    fn into_cell(self, ch: char) -> crate::fb::Cell;
}

impl IntoCell for CellStyle {
    fn into_cell(self, ch: char) -> crate::fb::Cell {
        crate::fb::Cell { ch, style: self }
    }
}
