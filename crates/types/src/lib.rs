//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the application.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (core logic, UI rendering, sync protocol).
//!
//! # Grid Dimensions
//!
//! The playfield is a fixed 8x8 grid, row-major, origin top-left:
//!
//! - **Width/Height**: 8 cells (indexed 0-7)
//! - **Coordinates**: `(x, y)` with x growing right and y growing down
//!
//! # Gameplay Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `MIN_RUN` | 3 | Minimum run length that counts as a match |
//! | `FOUNDATION_HIT_POINTS` | 2 | Adjacent matches needed to break a foundation block |
//! | `CARD_UNLOCK_MIN`/`MAX` | 2/4 | Range for a locked card's move counter |
//! | `SPECIAL_BONUS_PERCENT` | 15 | Bonus-special chance from a plain 3-run (upgrade) |
//! | `EXTRA_MOVES_BONUS` | 2 | Additional moves from the extra-moves upgrade |
//! | `MOVE_BONUS_SCORE` | 50 | Completion bonus per unspent move |
//!
//! # Examples
//!
//! ```
//! use tui_estates_types::{Coord, TileKind, GravityDirection, GRID_SIZE};
//!
//! let kind = TileKind::from_str("house").unwrap();
//! assert_eq!(kind, TileKind::House);
//! assert_eq!(kind.as_str(), "house");
//!
//! let a = Coord::new(3, 4);
//! let b = Coord::new(3, 5);
//! assert!(a.is_adjacent(b));
//!
//! assert_eq!(GravityDirection::Down.as_str(), "down");
//! assert_eq!(GRID_SIZE, 8);
//! ```

/// Grid width and height in cells (the board is square)
pub const GRID_SIZE: u8 = 8;

/// Total number of cells on the grid
pub const GRID_CELLS: usize = (GRID_SIZE as usize) * (GRID_SIZE as usize);

/// Minimum run length that counts as a match
pub const MIN_RUN: u8 = 3;

/// Hit points of a freshly placed foundation block
pub const FOUNDATION_HIT_POINTS: u8 = 2;

/// Smallest starting value for a locked card's move counter
pub const CARD_UNLOCK_MIN: u8 = 2;

/// Largest starting value for a locked card's move counter
pub const CARD_UNLOCK_MAX: u8 = 4;

/// Chance (percent) that a plain 3-run spawns a renovation bomb when the
/// special-chance upgrade is active
pub const SPECIAL_BONUS_PERCENT: u32 = 15;

/// Extra moves granted by the extra-moves upgrade
pub const EXTRA_MOVES_BONUS: u32 = 2;

/// Score credited per unspent move on level completion
pub const MOVE_BONUS_SCORE: u32 = 50;

/// A grid coordinate.
///
/// Always in-bounds when produced by the engine; construction does not
/// validate so probes can describe out-of-range positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Row-major flat index, or `None` when out of bounds.
    #[inline(always)]
    pub fn index(self) -> Option<usize> {
        if self.x >= GRID_SIZE || self.y >= GRID_SIZE {
            return None;
        }
        Some((self.y as usize) * (GRID_SIZE as usize) + (self.x as usize))
    }

    /// Whether `other` is exactly one step away orthogonally.
    pub fn is_adjacent(self, other: Coord) -> bool {
        let dx = (self.x as i16 - other.x as i16).abs();
        let dy = (self.y as i16 - other.y as i16).abs();
        dx + dy == 1
    }
}

/// The six property tile kinds
///
/// Each kind yields a distinct resource when matched:
/// - **House**: lumber
/// - **Apartment**: steel
/// - **Condo**: cash
/// - **Townhouse**: brick
/// - **Villa**: glass
/// - **Commercial**: concrete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    House,
    Apartment,
    Condo,
    Townhouse,
    Villa,
    Commercial,
}

impl TileKind {
    pub const ALL: [TileKind; 6] = [
        TileKind::House,
        TileKind::Apartment,
        TileKind::Condo,
        TileKind::Townhouse,
        TileKind::Villa,
        TileKind::Commercial,
    ];

    /// Parse tile kind from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "house" => Some(TileKind::House),
            "apartment" => Some(TileKind::Apartment),
            "condo" => Some(TileKind::Condo),
            "townhouse" => Some(TileKind::Townhouse),
            "villa" => Some(TileKind::Villa),
            "commercial" => Some(TileKind::Commercial),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TileKind::House => "house",
            TileKind::Apartment => "apartment",
            TileKind::Condo => "condo",
            TileKind::Townhouse => "townhouse",
            TileKind::Villa => "villa",
            TileKind::Commercial => "commercial",
        }
    }

    /// The resource a matched tile of this kind yields.
    pub fn resource(&self) -> ResourceKind {
        match self {
            TileKind::House => ResourceKind::Lumber,
            TileKind::Apartment => ResourceKind::Steel,
            TileKind::Condo => ResourceKind::Cash,
            TileKind::Townhouse => ResourceKind::Brick,
            TileKind::Villa => ResourceKind::Glass,
            TileKind::Commercial => ResourceKind::Concrete,
        }
    }
}

/// Special tile kinds created by large or shaped matches
///
/// - **RenovationBomb**: clears its entire row (4-straight)
/// - **MarketMixer**: clears the 3x3 block around it (T/L cluster)
/// - **SkyscraperLeveller**: clears its entire column (5-straight)
/// - **UrbanRedevelopment**: clears its row and column (cross cluster)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKind {
    RenovationBomb,
    MarketMixer,
    SkyscraperLeveller,
    UrbanRedevelopment,
}

impl SpecialKind {
    pub const ALL: [SpecialKind; 4] = [
        SpecialKind::RenovationBomb,
        SpecialKind::MarketMixer,
        SpecialKind::SkyscraperLeveller,
        SpecialKind::UrbanRedevelopment,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "renovation-bomb" => Some(SpecialKind::RenovationBomb),
            "market-mixer" => Some(SpecialKind::MarketMixer),
            "skyscraper-leveller" => Some(SpecialKind::SkyscraperLeveller),
            "urban-redevelopment" => Some(SpecialKind::UrbanRedevelopment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialKind::RenovationBomb => "renovation-bomb",
            SpecialKind::MarketMixer => "market-mixer",
            SpecialKind::SkyscraperLeveller => "skyscraper-leveller",
            SpecialKind::UrbanRedevelopment => "urban-redevelopment",
        }
    }
}

/// Obstacle kinds
///
/// Obstacles never match and never move; adjacent matches weaken them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    LockedGate,
    FoundationBlock,
    LockedCard,
}

impl ObstacleKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "locked-gate" => Some(ObstacleKind::LockedGate),
            "foundation-block" => Some(ObstacleKind::FoundationBlock),
            "locked-card" => Some(ObstacleKind::LockedCard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObstacleKind::LockedGate => "locked-gate",
            ObstacleKind::FoundationBlock => "foundation-block",
            ObstacleKind::LockedCard => "locked-card",
        }
    }
}

/// Direction tiles compact toward when vacancies fill
///
/// Drawn once per player move and held through that move's cascades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GravityDirection {
    Down,
    Up,
    Left,
    Right,
}

impl GravityDirection {
    pub const ALL: [GravityDirection; 4] = [
        GravityDirection::Down,
        GravityDirection::Up,
        GravityDirection::Left,
        GravityDirection::Right,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "down" => Some(GravityDirection::Down),
            "up" => Some(GravityDirection::Up),
            "left" => Some(GravityDirection::Left),
            "right" => Some(GravityDirection::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GravityDirection::Down => "down",
            GravityDirection::Up => "up",
            GravityDirection::Left => "left",
            GravityDirection::Right => "right",
        }
    }
}

/// Resource kinds credited by resolved matches
///
/// Marble, copper and gold are reserved for future content; the six property
/// kinds map onto the first six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Lumber,
    Brick,
    Steel,
    Cash,
    Glass,
    Concrete,
    Marble,
    Copper,
    Gold,
}

/// Number of resource kinds tracked by a [`Resources`] bag
pub const RESOURCE_KINDS: usize = 9;

impl ResourceKind {
    pub const ALL: [ResourceKind; RESOURCE_KINDS] = [
        ResourceKind::Lumber,
        ResourceKind::Brick,
        ResourceKind::Steel,
        ResourceKind::Cash,
        ResourceKind::Glass,
        ResourceKind::Concrete,
        ResourceKind::Marble,
        ResourceKind::Copper,
        ResourceKind::Gold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Lumber => "lumber",
            ResourceKind::Brick => "brick",
            ResourceKind::Steel => "steel",
            ResourceKind::Cash => "cash",
            ResourceKind::Glass => "glass",
            ResourceKind::Concrete => "concrete",
            ResourceKind::Marble => "marble",
            ResourceKind::Copper => "copper",
            ResourceKind::Gold => "gold",
        }
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            ResourceKind::Lumber => 0,
            ResourceKind::Brick => 1,
            ResourceKind::Steel => 2,
            ResourceKind::Cash => 3,
            ResourceKind::Glass => 4,
            ResourceKind::Concrete => 5,
            ResourceKind::Marble => 6,
            ResourceKind::Copper => 7,
            ResourceKind::Gold => 8,
        }
    }
}

/// A counter bag of resources that only ever increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resources {
    totals: [u32; RESOURCE_KINDS],
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&mut self, kind: ResourceKind, amount: u32) {
        let slot = &mut self.totals[kind.index()];
        *slot = slot.saturating_add(amount);
    }

    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.totals[kind.index()]
    }

    pub fn totals(&self) -> &[u32; RESOURCE_KINDS] {
        &self.totals
    }

    pub fn from_totals(totals: [u32; RESOURCE_KINDS]) -> Self {
        Self { totals }
    }
}

/// Upgrade flags consumed by the engine; progression owns them, the engine
/// only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpgradeFlags {
    /// +2 moves per level attempt
    pub extra_moves: bool,
    /// 1.1x multiplier on match and activation scores
    pub score_boost: bool,
    /// Doubles the per-tile resource unit (1 -> 2)
    pub resource_yield: bool,
    /// Lowers every special-creation length threshold by 1
    pub special_threshold: bool,
    /// Flat 15% bomb chance from a plain 3-run
    pub special_chance: bool,
}

/// Terminal state of a level attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Playing,
    LevelComplete,
    GameOver,
}

impl GameStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "playing" => Some(GameStatus::Playing),
            "level_complete" => Some(GameStatus::LevelComplete),
            "game_over" => Some(GameStatus::GameOver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Playing => "playing",
            GameStatus::LevelComplete => "level_complete",
            GameStatus::GameOver => "game_over",
        }
    }
}

/// Player actions that drive the game
///
/// Both keyboard input and tests use these; `Select` marks a cell or commits
/// a swap with the previously marked cell, `Activate` triggers the special
/// under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    Select,
    Activate,
    Restart,
    NextLevel,
}

impl GameAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cursorup" => Some(GameAction::CursorUp),
            "cursordown" => Some(GameAction::CursorDown),
            "cursorleft" => Some(GameAction::CursorLeft),
            "cursorright" => Some(GameAction::CursorRight),
            "select" => Some(GameAction::Select),
            "activate" => Some(GameAction::Activate),
            "restart" => Some(GameAction::Restart),
            "nextlevel" => Some(GameAction::NextLevel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::CursorUp => "cursorUp",
            GameAction::CursorDown => "cursorDown",
            GameAction::CursorLeft => "cursorLeft",
            GameAction::CursorRight => "cursorRight",
            GameAction::Select => "select",
            GameAction::Activate => "activate",
            GameAction::Restart => "restart",
            GameAction::NextLevel => "nextLevel",
        }
    }
}
